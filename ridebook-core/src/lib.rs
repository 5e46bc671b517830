pub mod booking;
pub mod notify;
pub mod payment;
pub mod repository;

pub use booking::{
    Booking, BookingStatus, Customer, LedgerEntry, PaymentChange, PaymentSession, PaymentStatus,
};
pub use notify::NotificationDispatcher;
pub use payment::{
    AmountPolicy, CheckoutRequest, CheckoutSession, OutcomeStatus, PaymentOutcome, PaymentProcessor,
    ProcessorError, SessionPaymentState, SessionSnapshot, SessionState,
};
pub use repository::{BookingRepository, StoreError, VehicleCatalog};
