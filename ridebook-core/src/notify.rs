use async_trait::async_trait;
use ridebook_shared::models::events::{BookingConfirmedEvent, PaymentAnomalyEvent};

/// Fire-and-forget delivery of booking notifications. A failure here never
/// undoes a reconciliation that already committed.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn booking_confirmed(
        &self,
        event: &BookingConfirmedEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn payment_anomaly(
        &self,
        event: &PaymentAnomalyEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
