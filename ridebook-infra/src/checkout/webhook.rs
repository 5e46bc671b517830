use hmac::{Hmac, Mac};
use ridebook_core::{OutcomeStatus, PaymentOutcome};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::CheckoutSessionObject;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Malformed signature header")]
    MalformedSignature,

    #[error("Signature does not match payload")]
    SignatureMismatch,

    #[error("Signature timestamp outside tolerance ({age}s)")]
    Stale { age: i64 },

    #[error("Unreadable event payload: {0}")]
    Payload(String),
}

/// Checks `t=<unix>,v1=<hex>` signatures over `"{t}.{body}"`.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_seconds: i64,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_seconds,
        }
    }

    pub fn verify(&self, header: Option<&str>, body: &[u8], now: i64) -> Result<(), WebhookError> {
        let header = header.ok_or(WebhookError::MissingSignature)?;

        let mut timestamp = None;
        let mut candidates = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
                Some(("v1", v)) => candidates.push(v),
                _ => {}
            }
        }
        let timestamp = timestamp.ok_or(WebhookError::MalformedSignature)?;
        if candidates.is_empty() {
            return Err(WebhookError::MalformedSignature);
        }

        let age = now - timestamp;
        if age.abs() > self.tolerance_seconds {
            return Err(WebhookError::Stale { age });
        }

        let expected = sign(&self.secret, timestamp, body).ok_or(WebhookError::MalformedSignature)?;
        let matched = candidates
            .iter()
            .any(|sig| expected.as_bytes().ct_eq(sig.as_bytes()).unwrap_u8() == 1);
        if !matched {
            return Err(WebhookError::SignatureMismatch);
        }
        Ok(())
    }

    /// Builds a header value the verifier accepts.
    pub fn header_for(&self, body: &[u8], timestamp: i64) -> Option<String> {
        sign(&self.secret, timestamp, body).map(|sig| format!("t={},v1={}", timestamp, sig))
    }
}

pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

/// A verified processor event. `outcome` is `None` for events that carry no payment result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: String,
    pub outcome: Option<PaymentOutcome>,
}

impl WebhookEvent {
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawEvent = serde_json::from_slice(body).map_err(|e| WebhookError::Payload(e.to_string()))?;

        let result = match raw.event_type.as_str() {
            "checkout.session.completed" | "checkout.session.async_payment_succeeded" => Some(OutcomeStatus::Succeeded),
            "checkout.session.async_payment_failed" => Some(OutcomeStatus::Failed),
            _ => None,
        };

        let outcome = match result {
            None => None,
            Some(result) => {
                let session: CheckoutSessionObject =
                    serde_json::from_value(raw.data.object).map_err(|e| WebhookError::Payload(e.to_string()))?;

                // A completed session can still be waiting on an async payment method.
                if raw.event_type == "checkout.session.completed" && !session.is_paid() {
                    None
                } else {
                    let amount_captured = match result {
                        OutcomeStatus::Succeeded => session.amount_total.ok_or_else(|| {
                            WebhookError::Payload(format!("paid session {} has no amount_total", session.id))
                        })?,
                        OutcomeStatus::Failed => 0,
                    };
                    Some(PaymentOutcome {
                        booking_id: session.booking_id(),
                        session_ref: session.id.clone(),
                        result,
                        amount_captured,
                        currency: session.currency.as_deref().map(str::to_ascii_uppercase),
                        payment_method_summary: session.payment_method_summary(),
                        event_id: Some(raw.id.clone()),
                        payment_reference: session.payment_reference(),
                    })
                }
            }
        };

        Ok(Self {
            id: raw.id,
            event_type: raw.event_type,
            outcome,
        })
    }
}
