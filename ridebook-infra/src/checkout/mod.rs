//! Hosted checkout adapter for a Stripe-compatible processor.

pub mod client;
pub mod sandbox;
pub mod webhook;

pub use client::HttpCheckoutProcessor;
pub use sandbox::SandboxProcessor;
pub use webhook::{WebhookError, WebhookEvent, WebhookVerifier};

use chrono::{DateTime, Utc};
use ridebook_core::{SessionPaymentState, SessionSnapshot, SessionState};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Checkout session object as the processor serializes it, in API responses and in event payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub url: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Either an id or, when expanded, the full payment intent.
    pub payment_intent: Option<serde_json::Value>,
    pub expires_at: Option<i64>,
}

impl CheckoutSessionObject {
    pub fn booking_id(&self) -> Option<Uuid> {
        self.metadata
            .get("booking_id")
            .or(self.client_reference_id.as_ref())
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    pub fn payment_reference(&self) -> Option<String> {
        match self.payment_intent.as_ref()? {
            serde_json::Value::String(id) => Some(id.clone()),
            serde_json::Value::Object(pi) => pi.get("id").and_then(|v| v.as_str()).map(str::to_string),
            _ => None,
        }
    }

    /// `"visa 4242"` from an expanded payment intent's card, if present.
    pub fn payment_method_summary(&self) -> Option<String> {
        let card = self
            .payment_intent
            .as_ref()?
            .get("payment_method")?
            .get("card")?;
        let brand = card.get("brand")?.as_str()?;
        let last4 = card.get("last4")?.as_str()?;
        Some(format!("{} {}", brand, last4))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }

    pub fn state(&self) -> SessionState {
        match self.status.as_deref() {
            Some("complete") => SessionState::Complete,
            Some("expired") => SessionState::Expired,
            _ => SessionState::Open,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self.payment_status.as_deref(), Some("paid") | Some("no_payment_required"))
    }

    /// Status of the expanded payment intent; `None` when it is only an id.
    pub fn payment_intent_status(&self) -> Option<&str> {
        self.payment_intent.as_ref()?.get("status")?.as_str()
    }

    /// A completed session stays `unpaid` after a decline; only the payment
    /// intent tells a decline apart from a payment still processing.
    pub fn is_declined(&self) -> bool {
        self.state() == SessionState::Complete
            && !self.is_paid()
            && matches!(self.payment_intent_status(), Some("requires_payment_method") | Some("canceled"))
    }

    pub fn to_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_ref: self.id.clone(),
            booking_id: self.booking_id(),
            state: self.state(),
            payment_state: if self.is_paid() {
                SessionPaymentState::Paid
            } else if self.is_declined() {
                SessionPaymentState::Failed
            } else {
                SessionPaymentState::Unpaid
            },
            amount_captured: if self.is_paid() { self.amount_total } else { None },
            currency: self.currency.as_deref().map(str::to_ascii_uppercase),
            payment_reference: self.payment_reference(),
            payment_method_summary: self.payment_method_summary(),
        }
    }
}
