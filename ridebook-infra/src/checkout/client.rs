use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use ridebook_core::{CheckoutRequest, CheckoutSession, PaymentProcessor, ProcessorError, SessionSnapshot};
use serde::Deserialize;
use tracing::{debug, warn};

use super::CheckoutSessionObject;
use crate::app_config::ProcessorConfig;

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    code: Option<String>,
}

/// Talks to the processor's REST API. One client per process; reqwest pools connections.
#[derive(Clone)]
pub struct HttpCheckoutProcessor {
    http: Client,
    base_url: String,
    secret_key: String,
    success_url: String,
    cancel_url: String,
}

impl HttpCheckoutProcessor {
    pub fn new(cfg: &ProcessorConfig) -> Result<Self, ProcessorError> {
        let timeout = std::time::Duration::from_millis(if cfg.timeout_ms > 0 { cfg.timeout_ms } else { 10_000 });
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| ProcessorError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            secret_key: cfg.secret_key.clone(),
            success_url: cfg.success_url.clone(),
            cancel_url: cfg.cancel_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Depends on the request alone: a retry under the same idempotency key
    /// must send the same body or the processor rejects it. Session expiry is
    /// left to the processor default.
    fn create_form(&self, request: &CheckoutRequest) -> Vec<(String, String)> {
        let booking_id = request.booking_id.to_string();
        let success_url = self.success_url.replace("{BOOKING_ID}", &booking_id);
        let cancel_url = self.cancel_url.replace("{BOOKING_ID}", &booking_id);

        vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), success_url),
            ("cancel_url".into(), cancel_url),
            ("client_reference_id".into(), booking_id.clone()),
            ("customer_email".into(), request.customer_email.clone()),
            ("metadata[booking_id]".into(), booking_id.clone()),
            ("payment_intent_data[metadata][booking_id]".into(), booking_id),
            ("line_items[0][quantity]".into(), "1".into()),
            ("line_items[0][price_data][currency]".into(), request.currency.to_ascii_lowercase()),
            ("line_items[0][price_data][unit_amount]".into(), request.amount.to_string()),
            ("line_items[0][price_data][product_data][name]".into(), request.description.clone()),
        ]
    }
}

fn transport(e: reqwest::Error) -> ProcessorError {
    if e.is_timeout() {
        ProcessorError::Timeout
    } else {
        ProcessorError::Transport(e.to_string())
    }
}

async fn read_session(resp: Response, session_ref: Option<&str>) -> Result<CheckoutSessionObject, ProcessorError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json::<CheckoutSessionObject>()
            .await
            .map_err(|e| if e.is_timeout() { ProcessorError::Timeout } else { ProcessorError::Decode(e.to_string()) });
    }

    let body = resp.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<ApiErrorBody>(&body).ok();

    if let (StatusCode::NOT_FOUND, Some(session_ref)) = (status, session_ref) {
        return Err(ProcessorError::UnknownSession(session_ref.to_string()));
    }

    let message = parsed
        .map(|b| match (b.error.code, b.error.message) {
            (Some(code), Some(msg)) => format!("{}: {}", code, msg),
            (_, Some(msg)) => msg,
            (Some(code), None) => code,
            (None, None) => body.clone(),
        })
        .unwrap_or(body);

    warn!(status = status.as_u16(), message = %message, "Payment processor rejected request");
    Err(ProcessorError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl PaymentProcessor for HttpCheckoutProcessor {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, ProcessorError> {
        debug!(booking_id = %request.booking_id, amount = request.amount, "Creating checkout session");

        let resp = self
            .http
            .post(self.url("/v1/checkout/sessions"))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&self.create_form(request))
            .send()
            .await
            .map_err(transport)?;

        let obj = read_session(resp, None).await?;
        let redirect_url = obj
            .url
            .clone()
            .ok_or_else(|| ProcessorError::Decode(format!("session {} has no redirect url", obj.id)))?;

        Ok(CheckoutSession {
            expires_at: obj.expires_at(),
            session_ref: obj.id,
            redirect_url,
        })
    }

    async fn retrieve_session(&self, session_ref: &str) -> Result<SessionSnapshot, ProcessorError> {
        let resp = self
            .http
            .get(self.url(&format!("/v1/checkout/sessions/{}", session_ref)))
            .bearer_auth(&self.secret_key)
            .query(&[("expand[]", "payment_intent.payment_method")])
            .send()
            .await
            .map_err(transport)?;

        Ok(read_session(resp, Some(session_ref)).await?.to_snapshot())
    }

    async fn expire_session(&self, session_ref: &str) -> Result<SessionSnapshot, ProcessorError> {
        let resp = self
            .http
            .post(self.url(&format!("/v1/checkout/sessions/{}/expire", session_ref)))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(transport)?;

        match read_session(resp, Some(session_ref)).await {
            Ok(obj) => Ok(obj.to_snapshot()),
            // Only open sessions can be expired; anything else reports where it ended up.
            Err(ProcessorError::Rejected { status: 400, .. }) => self.retrieve_session(session_ref).await,
            Err(e) => Err(e),
        }
    }
}
