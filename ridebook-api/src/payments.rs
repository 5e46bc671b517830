use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use ridebook_core::AmountPolicy;
use ridebook_order::{ConfirmTarget, PaymentRedirect, ReconciliationResult};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PolicyChoice {
    #[default]
    Full,
    Deposit,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartPaymentRequest {
    #[serde(default)]
    pub policy: PolicyChoice,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub booking_id: Option<Uuid>,
    pub session_ref: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/{id}/payment", post(start_payment))
        .route("/v1/payments/confirm", post(confirm_payment))
}

/// POST /v1/bookings/{id}/payment
async fn start_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StartPaymentRequest>,
) -> Result<Json<PaymentRedirect>, AppError> {
    let policy = match req.policy {
        PolicyChoice::Full => AmountPolicy::Full,
        PolicyChoice::Deposit => AmountPolicy::Deposit {
            percent: state.deposit_percent,
        },
    };

    Ok(Json(state.sessions.start_payment(id, policy).await?))
}

/// POST /v1/payments/confirm
///
/// Called by the return page; the webhook may or may not have landed yet.
async fn confirm_payment(
    State(state): State<AppState>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<Json<ReconciliationResult>, AppError> {
    let target = match (req.booking_id, req.session_ref) {
        (Some(id), _) => ConfirmTarget::Booking(id),
        (None, Some(session_ref)) if !session_ref.trim().is_empty() => ConfirmTarget::Session(session_ref),
        _ => {
            return Err(AppError::ValidationError {
                field: "booking_id",
                message: "booking_id or session_ref is required".to_string(),
            })
        }
    };

    Ok(Json(state.reconciler.confirm_payment(target).await?))
}
