use uuid::Uuid;

/// Published once per booking, by whichever reconciliation path won the PAID transition.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub vehicle_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub pickup_at: String,
    pub total: i64,
    pub amount_paid: i64,
    pub currency: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentAnomalyKind {
    AmountMismatch,
    FailedAfterPaid,
    SupersededSession,
}

/// Internal-only record of a payment that did not line up with what was requested.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct PaymentAnomalyEvent {
    pub booking_id: Uuid,
    pub kind: PaymentAnomalyKind,
    pub session_ref: String,
    pub expected: Option<i64>,
    pub captured: Option<i64>,
    pub timestamp: i64,
}
