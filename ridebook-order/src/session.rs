use chrono::Utc;
use ridebook_core::{
    AmountPolicy, Booking, BookingRepository, CheckoutRequest, PaymentProcessor, PaymentSession,
    PaymentStatus, SessionPaymentState, SessionSnapshot, SessionState,
};
use ridebook_shared::Masked;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::BookingError;

/// Where to send the customer to pay.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentRedirect {
    pub booking_id: Uuid,
    pub session_ref: String,
    pub redirect_url: String,
    pub amount: i64,
    pub currency: String,
    pub policy: AmountPolicy,
    /// The session already existed and was handed out again.
    pub reused: bool,
}

impl PaymentRedirect {
    fn from_session(booking: &Booking, session: &PaymentSession, reused: bool) -> Self {
        Self {
            booking_id: booking.id,
            session_ref: session.session_ref.clone(),
            redirect_url: session.redirect_url.clone(),
            amount: session.amount_requested,
            currency: booking.quote.currency.clone(),
            policy: session.policy,
            reused,
        }
    }
}

pub struct PaymentSessionBridge {
    repo: Arc<dyn BookingRepository>,
    processor: Arc<dyn PaymentProcessor>,
}

impl PaymentSessionBridge {
    pub fn new(repo: Arc<dyn BookingRepository>, processor: Arc<dyn PaymentProcessor>) -> Self {
        Self { repo, processor }
    }

    /// Hand out a checkout session for the booking, creating one only when
    /// no usable session exists. At most one session per booking can be open.
    pub async fn start_payment(
        &self,
        booking_id: Uuid,
        policy: AmountPolicy,
    ) -> Result<PaymentRedirect, BookingError> {
        if !policy.is_valid() {
            return Err(BookingError::validation("policy", "deposit percent must be between 1 and 100"));
        }

        let booking = self.load(booking_id).await?;
        if booking.payment_status == PaymentStatus::Paid {
            return Err(BookingError::AlreadyPaid(booking_id));
        }

        let amount = policy
            .amount_for(booking.quote.total)
            .ok_or_else(|| BookingError::validation("policy", "amount to collect is out of range"))?;
        if amount <= 0 {
            return Err(BookingError::validation("policy", "nothing to collect for this booking"));
        }

        if let Some(existing) = &booking.session {
            if existing.policy == policy && existing.amount_requested == amount {
                let snapshot = self.processor.retrieve_session(&existing.session_ref).await?;
                match snapshot.state {
                    SessionState::Open => {
                        info!(booking_id = %booking_id, session_ref = %existing.session_ref, "Reusing open checkout session");
                        return Ok(PaymentRedirect::from_session(&booking, existing, true));
                    }
                    SessionState::Complete if !replaceable(&booking, &snapshot) => {
                        return Err(BookingError::SessionCompleted {
                            booking_id,
                            session_ref: existing.session_ref.clone(),
                        });
                    }
                    _ => {}
                }
            } else {
                let snapshot = self.processor.expire_session(&existing.session_ref).await?;
                if snapshot.state == SessionState::Complete && !replaceable(&booking, &snapshot) {
                    return Err(BookingError::SessionCompleted {
                        booking_id,
                        session_ref: existing.session_ref.clone(),
                    });
                }
                info!(
                    booking_id = %booking_id,
                    session_ref = %existing.session_ref,
                    old_amount = existing.amount_requested,
                    new_amount = amount,
                    "Superseded checkout session"
                );
            }
        }

        self.create_and_attach(booking, policy, amount).await
    }

    async fn create_and_attach(
        &self,
        booking: Booking,
        policy: AmountPolicy,
        amount: i64,
    ) -> Result<PaymentRedirect, BookingError> {
        let generation = booking.session_generation;
        let request = CheckoutRequest {
            booking_id: booking.id,
            amount,
            currency: booking.quote.currency.clone(),
            description: format!("{} ({})", booking.vehicle_name, booking.quote.category),
            customer_email: booking.customer.email.clone(),
            idempotency_key: idempotency_key(booking.id, generation),
        };

        let created = self.processor.create_checkout_session(&request).await?;
        let session = PaymentSession {
            session_ref: created.session_ref,
            redirect_url: created.redirect_url,
            amount_requested: amount,
            policy,
            expires_at: created.expires_at,
            created_at: Utc::now(),
        };

        if let Some(updated) = self.repo.attach_session(booking.id, generation, &session).await? {
            info!(
                booking_id = %updated.id,
                session_ref = %session.session_ref,
                amount,
                email = ?Masked(&updated.customer.email),
                "Checkout session created"
            );
            return Ok(PaymentRedirect::from_session(&updated, &session, false));
        }

        // Another request attached first; theirs stands.
        let current = self.load(booking.id).await?;
        let Some(winner) = current.session.as_ref() else {
            return Err(BookingError::Contention(booking.id));
        };

        if winner.session_ref != session.session_ref {
            if let Err(e) = self.processor.expire_session(&session.session_ref).await {
                warn!(
                    booking_id = %booking.id,
                    session_ref = %session.session_ref,
                    error = %e,
                    "Failed to expire session that lost the attach race"
                );
            }
        }

        Ok(PaymentRedirect::from_session(&current, winner, true))
    }

    async fn load(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.repo
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(booking_id.to_string()))
    }
}

/// A completed session whose payment was declined can be replaced.
/// A completed session may be replaced when its payment was declined. Some
/// processors only report a decline as an unpaid completed session, so a
/// booking already marked FAILED counts as declined too.
fn replaceable(booking: &Booking, snapshot: &SessionSnapshot) -> bool {
    match snapshot.payment_state {
        SessionPaymentState::Failed => true,
        SessionPaymentState::Paid => false,
        _ => booking.payment_status == PaymentStatus::Failed,
    }
}

pub fn idempotency_key(booking_id: Uuid, generation: u32) -> String {
    format!("booking-{}-session-{}", booking_id, generation)
}
