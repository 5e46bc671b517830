use axum::{extract::State, routing::post, Json, Router};
use ridebook_catalog::{Quote, TripRequest};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub vehicle_id: String,
    pub trip: TripRequest,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub vehicle_id: String,
    pub vehicle_name: String,
    pub quote: Quote,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/quotes", post(compute_quote))
}

/// POST /v1/quotes
async fn compute_quote(
    State(state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    let card = state.bookings.rate_card(&req.vehicle_id).await?;
    let quote = state.bookings.compute_quote(&req.vehicle_id, &req.trip).await?;

    Ok(Json(QuoteResponse {
        vehicle_id: card.vehicle_id,
        vehicle_name: card.vehicle_name,
        quote,
    }))
}
