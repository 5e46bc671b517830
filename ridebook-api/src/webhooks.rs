use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use ridebook_infra::checkout::webhook::SIGNATURE_HEADER;
use ridebook_infra::WebhookEvent;
use ridebook_order::BookingError;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments", post(handle_payment_webhook))
}

/// POST /v1/webhooks/payments
///
/// Any non-2xx makes the processor redeliver, so only transient failures return one.
async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    state.webhook.verify(signature, &body, Utc::now().timestamp())?;

    let event = WebhookEvent::parse(&body)?;
    info!(event_id = %event.id, event_type = %event.event_type, "Received payment webhook");

    let Some(outcome) = event.outcome else {
        return Ok((StatusCode::OK, Json(json!({ "received": true, "handled": false }))));
    };

    match state.reconciler.apply_outcome(&outcome).await {
        Ok(result) => Ok((
            StatusCode::OK,
            Json(json!({
                "received": true,
                "handled": true,
                "booking_id": result.booking_id,
                "disposition": result.disposition,
            })),
        )),
        Err(BookingError::NotFound(what)) => {
            warn!(event_id = %event.id, session_ref = %outcome.session_ref, "Webhook for unknown booking: {}", what);
            Ok((StatusCode::OK, Json(json!({ "received": true, "handled": false }))))
        }
        Err(e) => Err(e.into()),
    }
}
