use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use ridebook_order::Receipt;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/bookings/{id}/receipt", get(get_receipt))
}

/// GET /v1/bookings/{id}/receipt
async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Receipt>, AppError> {
    Ok(Json(state.receipts.get_receipt(id).await?))
}
