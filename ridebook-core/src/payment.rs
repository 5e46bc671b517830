use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How much of the quoted total a checkout session collects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmountPolicy {
    Full,
    Deposit { percent: u8 },
}

impl AmountPolicy {
    pub fn is_valid(&self) -> bool {
        match self {
            AmountPolicy::Full => true,
            AmountPolicy::Deposit { percent } => (1..=100).contains(percent),
        }
    }

    /// Amount to collect for `total`, rounded half-up to the minor unit.
    /// `None` when the arithmetic does not fit in an `i64`.
    pub fn amount_for(&self, total: i64) -> Option<i64> {
        match self {
            AmountPolicy::Full => Some(total),
            AmountPolicy::Deposit { percent } => total
                .checked_mul(i64::from(*percent))?
                .checked_add(50)
                .map(|scaled| scaled / 100),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub booking_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub customer_email: String,
    /// Same key for the same booking and session generation, so a retried
    /// create after a timeout returns the session the processor already made.
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutSession {
    pub session_ref: String,
    pub redirect_url: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Open,
    Complete,
    Expired,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPaymentState {
    Unpaid,
    Paid,
    Failed,
}

/// What the processor currently says about a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_ref: String,
    pub booking_id: Option<Uuid>,
    pub state: SessionState,
    pub payment_state: SessionPaymentState,
    pub amount_captured: Option<i64>,
    pub currency: Option<String>,
    pub payment_reference: Option<String>,
    pub payment_method_summary: Option<String>,
}

impl SessionSnapshot {
    /// The final outcome, if the processor has one yet.
    ///
    /// A paid session that does not say how much was captured is unreadable,
    /// not a zero capture.
    pub fn outcome(&self) -> Result<Option<PaymentOutcome>, ProcessorError> {
        let (result, amount_captured) = match (self.state, self.payment_state) {
            (SessionState::Complete, SessionPaymentState::Paid) => {
                let captured = self.amount_captured.ok_or_else(|| {
                    ProcessorError::Decode(format!("paid session {} has no captured amount", self.session_ref))
                })?;
                (OutcomeStatus::Succeeded, captured)
            }
            (_, SessionPaymentState::Failed) => (OutcomeStatus::Failed, 0),
            _ => return Ok(None),
        };

        Ok(Some(PaymentOutcome {
            booking_id: self.booking_id,
            session_ref: self.session_ref.clone(),
            result,
            amount_captured,
            currency: self.currency.clone(),
            payment_method_summary: self.payment_method_summary.clone(),
            event_id: None,
            payment_reference: self.payment_reference.clone(),
        }))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

/// The authoritative result of a payment, from a webhook or from a session lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub booking_id: Option<Uuid>,
    pub session_ref: String,
    pub result: OutcomeStatus,
    pub amount_captured: i64,
    pub currency: Option<String>,
    pub payment_method_summary: Option<String>,
    pub event_id: Option<String>,
    pub payment_reference: Option<String>,
}

impl PaymentOutcome {
    /// Both delivery paths see the same processor payment reference, so the
    /// ledger keys on it. Sessions without one fall back to the session ref.
    pub fn ledger_key(&self) -> String {
        self.payment_reference
            .clone()
            .unwrap_or_else(|| self.session_ref.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessorError {
    #[error("Payment processor timed out")]
    Timeout,

    #[error("Payment processor unreachable: {0}")]
    Transport(String),

    #[error("Payment processor rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unreadable payment processor response: {0}")]
    Decode(String),

    #[error("Unknown checkout session: {0}")]
    UnknownSession(String),
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a hosted checkout session for exactly one booking and amount
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ProcessorError>;

    /// Retrieve the current state of a session
    async fn retrieve_session(&self, session_ref: &str) -> Result<SessionSnapshot, ProcessorError>;

    /// Expire an open session so it can no longer collect funds.
    /// Returns the session as it stands afterwards (it may already be complete).
    async fn expire_session(&self, session_ref: &str) -> Result<SessionSnapshot, ProcessorError>;
}
