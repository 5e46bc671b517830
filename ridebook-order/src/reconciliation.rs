use chrono::Utc;
use ridebook_core::{
    Booking, BookingRepository, BookingStatus, LedgerEntry, NotificationDispatcher, OutcomeStatus,
    PaymentChange, PaymentOutcome, PaymentProcessor, PaymentStatus,
};
use ridebook_shared::models::events::{BookingConfirmedEvent, PaymentAnomalyEvent, PaymentAnomalyKind};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::BookingError;

/// Lost compare-and-set rounds before giving up on a booking.
const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmTarget {
    Booking(Uuid),
    Session(String),
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    /// This call moved the booking.
    Applied,
    /// The booking already reflected this outcome.
    Duplicate,
    /// A failure arrived for a booking that is already paid. Nothing changed.
    Conflict,
    /// The processor has no final outcome yet.
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountMismatch {
    pub expected: i64,
    pub captured: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub booking_id: Uuid,
    pub disposition: Disposition,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub amount_paid: i64,
    #[serde(skip)]
    pub amount_mismatch: Option<AmountMismatch>,
}

impl ReconciliationResult {
    fn of(booking: &Booking, disposition: Disposition) -> Self {
        Self {
            booking_id: booking.id,
            disposition,
            status: booking.status,
            payment_status: booking.payment_status,
            amount_paid: booking.amount_paid,
            amount_mismatch: None,
        }
    }
}

enum Decision {
    Settled(Disposition),
    Write {
        change: PaymentChange,
        mismatch: Option<AmountMismatch>,
    },
}

/// Applies authoritative payment outcomes to bookings.
///
/// Webhooks and the return-page confirm both land here; whichever gets there
/// first wins and the other becomes a duplicate.
pub struct PaymentReconciler {
    repo: Arc<dyn BookingRepository>,
    processor: Arc<dyn PaymentProcessor>,
    notifier: Option<Arc<dyn NotificationDispatcher>>,
}

impl PaymentReconciler {
    pub fn new(repo: Arc<dyn BookingRepository>, processor: Arc<dyn PaymentProcessor>) -> Self {
        Self {
            repo,
            processor,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn apply_outcome(&self, outcome: &PaymentOutcome) -> Result<ReconciliationResult, BookingError> {
        let mut booking = self.resolve(outcome).await?;

        if let Some(current) = booking.session_ref().filter(|r| *r != outcome.session_ref) {
            warn!(
                booking_id = %booking.id,
                session_ref = %outcome.session_ref,
                current_session = %current,
                result = ?outcome.result,
                "Outcome belongs to a superseded session; applying processor truth"
            );
            self.publish_anomaly(&booking, PaymentAnomalyKind::SupersededSession, outcome, None);
        }

        for attempt in 1..=MAX_ATTEMPTS {
            let (change, mismatch) = match decide(&booking, outcome) {
                Decision::Settled(disposition) => {
                    if disposition == Disposition::Conflict {
                        warn!(
                            booking_id = %booking.id,
                            session_ref = %outcome.session_ref,
                            "Payment failure reported for a booking that is already paid; keeping PAID"
                        );
                        self.publish_anomaly(&booking, PaymentAnomalyKind::FailedAfterPaid, outcome, None);
                    } else {
                        debug!(booking_id = %booking.id, ?disposition, "Outcome already reflected");
                    }
                    return Ok(ReconciliationResult::of(&booking, disposition));
                }
                Decision::Write { change, mismatch } => (change, mismatch),
            };

            match self
                .repo
                .update_payment(booking.id, booking.payment_status, &change)
                .await?
            {
                Some(updated) => {
                    self.after_write(&updated, outcome, mismatch);
                    let mut result = ReconciliationResult::of(&updated, Disposition::Applied);
                    result.amount_mismatch = mismatch;
                    return Ok(result);
                }
                None => {
                    debug!(booking_id = %booking.id, attempt, "Payment status moved underneath us; re-reading");
                    booking = self
                        .repo
                        .get_booking(booking.id)
                        .await?
                        .ok_or_else(|| BookingError::NotFound(booking.id.to_string()))?;
                }
            }
        }

        error!(booking_id = %booking.id, "Giving up on reconciliation after repeated contention");
        Err(BookingError::Contention(booking.id))
    }

    /// Synchronous fallback for when the customer lands back before the webhook.
    pub async fn confirm_payment(&self, target: ConfirmTarget) -> Result<ReconciliationResult, BookingError> {
        let booking = match &target {
            ConfirmTarget::Booking(id) => self.repo.get_booking(*id).await?,
            ConfirmTarget::Session(session_ref) => self.repo.find_by_session_ref(session_ref).await?,
        }
        .ok_or_else(|| match &target {
            ConfirmTarget::Booking(id) => BookingError::NotFound(id.to_string()),
            ConfirmTarget::Session(session_ref) => BookingError::NotFound(format!("session {}", session_ref)),
        })?;

        if booking.payment_status == PaymentStatus::Paid {
            return Ok(ReconciliationResult::of(&booking, Disposition::Duplicate));
        }

        let session_ref = match &target {
            ConfirmTarget::Session(session_ref) => session_ref.clone(),
            ConfirmTarget::Booking(_) => match booking.session_ref() {
                Some(session_ref) => session_ref.to_string(),
                None => return Ok(ReconciliationResult::of(&booking, Disposition::Pending)),
            },
        };

        let snapshot = self.processor.retrieve_session(&session_ref).await?;
        match snapshot.outcome()? {
            Some(mut outcome) => {
                outcome.booking_id = Some(booking.id);
                self.apply_outcome(&outcome).await
            }
            None => {
                debug!(booking_id = %booking.id, session_ref = %session_ref, state = ?snapshot.state, "No final outcome yet");
                Ok(ReconciliationResult::of(&booking, Disposition::Pending))
            }
        }
    }

    async fn resolve(&self, outcome: &PaymentOutcome) -> Result<Booking, BookingError> {
        let found = match outcome.booking_id {
            Some(id) => self.repo.get_booking(id).await?,
            None => self.repo.find_by_session_ref(&outcome.session_ref).await?,
        };
        found.ok_or_else(|| match outcome.booking_id {
            Some(id) => BookingError::NotFound(id.to_string()),
            None => BookingError::NotFound(format!("session {}", outcome.session_ref)),
        })
    }

    fn after_write(&self, booking: &Booking, outcome: &PaymentOutcome, mismatch: Option<AmountMismatch>) {
        if booking.payment_status != PaymentStatus::Paid {
            info!(booking_id = %booking.id, session_ref = %outcome.session_ref, "Payment failed; booking stays open for another attempt");
            return;
        }

        info!(
            booking_id = %booking.id,
            session_ref = %outcome.session_ref,
            amount_paid = booking.amount_paid,
            event_id = ?outcome.event_id,
            "Booking paid"
        );

        if let Some(m) = mismatch {
            warn!(
                booking_id = %booking.id,
                expected = m.expected,
                captured = m.captured,
                "Captured amount differs from the requested amount"
            );
            self.publish_anomaly(booking, PaymentAnomalyKind::AmountMismatch, outcome, Some(m));
        }

        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        let event = BookingConfirmedEvent {
            booking_id: booking.id,
            vehicle_id: booking.vehicle_id.clone(),
            customer_name: booking.customer.name.clone(),
            customer_email: booking.customer.email.clone(),
            pickup_location: booking.trip.pickup_location.clone(),
            dropoff_location: booking.trip.dropoff_location.clone(),
            pickup_at: booking.trip.pickup_at().to_string(),
            total: booking.quote.total,
            amount_paid: booking.amount_paid,
            currency: booking.quote.currency.clone(),
            timestamp: Utc::now().timestamp(),
        };
        tokio::spawn(async move {
            if let Err(e) = notifier.booking_confirmed(&event).await {
                warn!(booking_id = %event.booking_id, error = %e, "Failed to dispatch booking confirmation");
            }
        });
    }

    fn publish_anomaly(
        &self,
        booking: &Booking,
        kind: PaymentAnomalyKind,
        outcome: &PaymentOutcome,
        mismatch: Option<AmountMismatch>,
    ) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        let event = PaymentAnomalyEvent {
            booking_id: booking.id,
            kind,
            session_ref: outcome.session_ref.clone(),
            expected: mismatch.map(|m| m.expected),
            captured: mismatch.map(|m| m.captured),
            timestamp: Utc::now().timestamp(),
        };
        tokio::spawn(async move {
            if let Err(e) = notifier.payment_anomaly(&event).await {
                warn!(booking_id = %event.booking_id, error = %e, "Failed to dispatch payment anomaly");
            }
        });
    }
}

fn decide(booking: &Booking, outcome: &PaymentOutcome) -> Decision {
    match (booking.payment_status, outcome.result) {
        (PaymentStatus::Paid, OutcomeStatus::Succeeded) => Decision::Settled(Disposition::Duplicate),
        (PaymentStatus::Paid, OutcomeStatus::Failed) => Decision::Settled(Disposition::Conflict),
        (PaymentStatus::Failed, OutcomeStatus::Failed) => Decision::Settled(Disposition::Duplicate),
        (PaymentStatus::Pending, OutcomeStatus::Failed) => Decision::Write {
            change: PaymentChange {
                status: booking.status,
                payment_status: PaymentStatus::Failed,
                amount_paid: booking.amount_paid,
                payment_method_summary: outcome.payment_method_summary.clone(),
                amount_mismatch: booking.amount_mismatch,
                paid_at: None,
                ledger_entry: None,
            },
            mismatch: None,
        },
        (PaymentStatus::Pending | PaymentStatus::Failed, OutcomeStatus::Succeeded) => {
            let expected = booking.expected_capture();
            let captured = outcome.amount_captured;
            let mismatch = (captured != expected).then_some(AmountMismatch { expected, captured });

            // Administrative states are not ours to overwrite.
            let status = match booking.status {
                BookingStatus::Pending => BookingStatus::Confirmed,
                other => other,
            };
            let currency = outcome
                .currency
                .as_deref()
                .map(str::to_ascii_uppercase)
                .unwrap_or_else(|| booking.quote.currency.clone());

            Decision::Write {
                change: PaymentChange {
                    status,
                    payment_status: PaymentStatus::Paid,
                    amount_paid: captured,
                    payment_method_summary: outcome.payment_method_summary.clone(),
                    amount_mismatch: mismatch.is_some(),
                    paid_at: Some(Utc::now()),
                    ledger_entry: Some(LedgerEntry::new(
                        booking.id,
                        outcome.ledger_key(),
                        outcome.event_id.clone(),
                        captured,
                        currency,
                    )),
                },
                mismatch,
            }
        }
    }
}
