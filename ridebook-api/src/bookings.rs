use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use ridebook_catalog::{BillingCategory, Quote, TripRequest};
use ridebook_core::{Booking, BookingStatus, Customer, PaymentStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub vehicle_id: String,
    pub customer: Customer,
    pub trip: TripRequest,
    /// The quote the customer agreed to, exactly as `/v1/quotes` returned it.
    pub quote: Quote,
}

#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
}

/// What the success page polls. No contact details.
#[derive(Debug, Serialize)]
pub struct BookingView {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub vehicle_id: String,
    pub vehicle_name: String,
    pub category: BillingCategory,
    pub total: i64,
    pub amount_paid: i64,
    pub balance_due: i64,
    pub currency: String,
    pub session_ref: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<Booking> for BookingView {
    fn from(b: Booking) -> Self {
        Self {
            booking_id: b.id,
            status: b.status,
            payment_status: b.payment_status,
            balance_due: b.balance_due(),
            session_ref: b.session_ref().map(str::to_string),
            vehicle_id: b.vehicle_id,
            vehicle_name: b.vehicle_name,
            category: b.quote.category,
            total: b.quote.total,
            amount_paid: b.amount_paid,
            currency: b.quote.currency,
            paid_at: b.paid_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking))
}

/// POST /v1/bookings
async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), AppError> {
    let booking_id = state
        .bookings
        .create_booking(req.customer, &req.vehicle_id, req.trip, req.quote)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            booking_id,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
        }),
    ))
}

/// GET /v1/bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    let booking = state.bookings.get_booking(id).await?;
    Ok(Json(BookingView::from(booking)))
}
