use ridebook_catalog::PricingError;
use ridebook_core::{PaymentStatus, ProcessorError, StoreError};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Vehicle cannot be priced: {0}")]
    Catalog(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Booking not found: {0}")]
    NotFound(String),

    #[error("Booking {0} is already paid")]
    AlreadyPaid(Uuid),

    #[error("Checkout session {session_ref} for booking {booking_id} already completed")]
    SessionCompleted { booking_id: Uuid, session_ref: String },

    #[error("Booking {booking_id} is not paid yet ({payment_status:?})")]
    NotYetPaid {
        booking_id: Uuid,
        payment_status: PaymentStatus,
    },

    #[error("Payment state for booking {0} kept changing during reconciliation")]
    Contention(Uuid),

    #[error(transparent)]
    ExternalProcessor(#[from] ProcessorError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        BookingError::Validation {
            field,
            message: message.into(),
        }
    }
}
