//! Processor stand-in for local runs and tests. Sessions live in memory and
//! are completed or failed on demand; events come out signed like real ones.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ridebook_core::{
    CheckoutRequest, CheckoutSession, PaymentProcessor, ProcessorError, SessionPaymentState, SessionSnapshot,
    SessionState,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::webhook::WebhookVerifier;

#[derive(Debug, Clone)]
struct SandboxSession {
    snapshot: SessionSnapshot,
    amount: i64,
    redirect_url: String,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SandboxProcessor {
    sessions: Arc<DashMap<String, SandboxSession>>,
    by_idempotency_key: Arc<DashMap<String, String>>,
    counter: Arc<AtomicU64>,
    checkout_base: String,
    verifier: WebhookVerifier,
}

impl SandboxProcessor {
    pub fn new(checkout_base: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            by_idempotency_key: Arc::new(DashMap::new()),
            counter: Arc::new(AtomicU64::new(0)),
            checkout_base: checkout_base.into(),
            verifier: WebhookVerifier::new(webhook_secret, 300),
        }
    }

    /// Number of sessions ever created.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Customer pays. `captured` defaults to the requested amount.
    pub fn complete(&self, session_ref: &str, captured: Option<i64>) -> Result<SessionSnapshot, ProcessorError> {
        let mut session = self
            .sessions
            .get_mut(session_ref)
            .ok_or_else(|| ProcessorError::UnknownSession(session_ref.to_string()))?;

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let amount = session.amount;
        let snap = &mut session.snapshot;
        snap.state = SessionState::Complete;
        snap.payment_state = SessionPaymentState::Paid;
        snap.amount_captured = Some(captured.unwrap_or(amount));
        snap.payment_reference = Some(format!("pi_sandbox_{:06}", n));
        snap.payment_method_summary = Some("visa 4242".to_string());
        Ok(snap.clone())
    }

    /// The payment method was declined after checkout.
    pub fn fail(&self, session_ref: &str) -> Result<SessionSnapshot, ProcessorError> {
        let mut session = self
            .sessions
            .get_mut(session_ref)
            .ok_or_else(|| ProcessorError::UnknownSession(session_ref.to_string()))?;

        let snap = &mut session.snapshot;
        snap.state = SessionState::Complete;
        snap.payment_state = SessionPaymentState::Failed;
        snap.amount_captured = None;
        Ok(snap.clone())
    }

    /// Event body and `Stripe-Signature` header for the session's current state.
    pub fn signed_event(&self, session_ref: &str, event_type: &str) -> Result<(Vec<u8>, String), ProcessorError> {
        let session = self
            .sessions
            .get(session_ref)
            .ok_or_else(|| ProcessorError::UnknownSession(session_ref.to_string()))?;
        let snap = &session.snapshot;

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let payment_intent = match (&snap.payment_reference, &snap.payment_method_summary) {
            (Some(id), Some(summary)) => {
                let (brand, last4) = summary.split_once(' ').unwrap_or((summary.as_str(), ""));
                serde_json::json!({
                    "id": id,
                    "payment_method": { "card": { "brand": brand, "last4": last4 } }
                })
            }
            (Some(id), None) => serde_json::json!(id),
            _ => serde_json::Value::Null,
        };

        let body = serde_json::json!({
            "id": format!("evt_sandbox_{:06}", n),
            "type": event_type,
            "created": Utc::now().timestamp(),
            "data": { "object": {
                "id": snap.session_ref,
                "url": session.redirect_url,
                "status": match snap.state {
                    SessionState::Open => "open",
                    SessionState::Complete => "complete",
                    SessionState::Expired => "expired",
                },
                "payment_status": match snap.payment_state {
                    SessionPaymentState::Paid => "paid",
                    _ => "unpaid",
                },
                "amount_total": snap.amount_captured.unwrap_or(session.amount),
                "currency": snap.currency.as_deref().map(str::to_ascii_lowercase),
                "client_reference_id": snap.booking_id.map(|id| id.to_string()),
                "metadata": snap.booking_id.map(|id| serde_json::json!({ "booking_id": id.to_string() }))
                    .unwrap_or_else(|| serde_json::json!({})),
                "payment_intent": payment_intent,
                "expires_at": session.expires_at.timestamp(),
            }}
        });

        let bytes = serde_json::to_vec(&body).map_err(|e| ProcessorError::Decode(e.to_string()))?;
        let header = self
            .verifier
            .header_for(&bytes, Utc::now().timestamp())
            .ok_or_else(|| ProcessorError::Decode("cannot sign sandbox event".to_string()))?;
        Ok((bytes, header))
    }
}

#[async_trait]
impl PaymentProcessor for SandboxProcessor {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, ProcessorError> {
        let session_ref = match self.by_idempotency_key.entry(request.idempotency_key.clone()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                let session_ref = format!("cs_sandbox_{:06}", n);
                let session = SandboxSession {
                    snapshot: SessionSnapshot {
                        session_ref: session_ref.clone(),
                        booking_id: Some(request.booking_id),
                        state: SessionState::Open,
                        payment_state: SessionPaymentState::Unpaid,
                        amount_captured: None,
                        currency: Some(request.currency.to_ascii_uppercase()),
                        payment_reference: None,
                        payment_method_summary: None,
                    },
                    amount: request.amount,
                    redirect_url: format!("{}/{}", self.checkout_base.trim_end_matches('/'), session_ref),
                    expires_at: Utc::now() + Duration::minutes(30),
                };
                self.sessions.insert(session_ref.clone(), session);
                slot.insert(session_ref.clone());
                debug!(booking_id = %request.booking_id, session_ref = %session_ref, "Sandbox session created");
                session_ref
            }
        };

        let session = self
            .sessions
            .get(&session_ref)
            .ok_or_else(|| ProcessorError::UnknownSession(session_ref.clone()))?;
        Ok(CheckoutSession {
            session_ref: session_ref.clone(),
            redirect_url: session.redirect_url.clone(),
            expires_at: Some(session.expires_at),
        })
    }

    async fn retrieve_session(&self, session_ref: &str) -> Result<SessionSnapshot, ProcessorError> {
        self.sessions
            .get(session_ref)
            .map(|s| s.snapshot.clone())
            .ok_or_else(|| ProcessorError::UnknownSession(session_ref.to_string()))
    }

    async fn expire_session(&self, session_ref: &str) -> Result<SessionSnapshot, ProcessorError> {
        let mut session = self
            .sessions
            .get_mut(session_ref)
            .ok_or_else(|| ProcessorError::UnknownSession(session_ref.to_string()))?;
        if session.snapshot.state == SessionState::Open {
            session.snapshot.state = SessionState::Expired;
        }
        Ok(session.snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::WebhookEvent;
    use ridebook_core::OutcomeStatus;
    use uuid::Uuid;

    fn request(key: &str) -> CheckoutRequest {
        CheckoutRequest {
            booking_id: Uuid::new_v4(),
            amount: 8000,
            currency: "SGD".to_string(),
            description: "Toyota Alphard (AIRPORT_TRANSFER)".to_string(),
            customer_email: "jane@example.com".to_string(),
            idempotency_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_same_idempotency_key_same_session() {
        let sandbox = SandboxProcessor::new("http://localhost:3000/sandbox/checkout", "whsec_test");
        let a = sandbox.create_checkout_session(&request("k1")).await.unwrap();
        let b = sandbox.create_checkout_session(&request("k1")).await.unwrap();
        let c = sandbox.create_checkout_session(&request("k2")).await.unwrap();

        assert_eq!(a.session_ref, b.session_ref);
        assert_ne!(a.session_ref, c.session_ref);
        assert_eq!(sandbox.session_count(), 2);
    }

    #[tokio::test]
    async fn test_expire_only_touches_open_sessions() {
        let sandbox = SandboxProcessor::new("http://localhost:3000/sandbox/checkout", "whsec_test");
        let open = sandbox.create_checkout_session(&request("k1")).await.unwrap();
        let paid = sandbox.create_checkout_session(&request("k2")).await.unwrap();
        sandbox.complete(&paid.session_ref, None).unwrap();

        assert_eq!(sandbox.expire_session(&open.session_ref).await.unwrap().state, SessionState::Expired);
        assert_eq!(sandbox.expire_session(&paid.session_ref).await.unwrap().state, SessionState::Complete);
        assert!(matches!(
            sandbox.retrieve_session("cs_nope").await,
            Err(ProcessorError::UnknownSession(_))
        ));
    }

    #[tokio::test]
    async fn test_signed_event_verifies_and_parses() {
        let sandbox = SandboxProcessor::new("http://localhost:3000/sandbox/checkout", "whsec_test");
        let req = request("k1");
        let session = sandbox.create_checkout_session(&req).await.unwrap();
        sandbox.complete(&session.session_ref, Some(7200)).unwrap();

        let (body, header) = sandbox
            .signed_event(&session.session_ref, "checkout.session.completed")
            .unwrap();
        WebhookVerifier::new("whsec_test", 300)
            .verify(Some(&header), &body, Utc::now().timestamp())
            .unwrap();

        let outcome = WebhookEvent::parse(&body).unwrap().outcome.unwrap();
        assert_eq!(outcome.result, OutcomeStatus::Succeeded);
        assert_eq!(outcome.booking_id, Some(req.booking_id));
        assert_eq!(outcome.amount_captured, 7200);
        assert_eq!(outcome.payment_method_summary.as_deref(), Some("visa 4242"));
    }
}
