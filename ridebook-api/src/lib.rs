use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod bookings;
pub mod error;
pub mod health;
pub mod payments;
pub mod quotes;
pub mod receipts;
pub mod state;
pub mod webhooks;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .merge(health::routes())
        .merge(quotes::routes())
        .merge(bookings::routes())
        .merge(payments::routes())
        .merge(receipts::routes())
        // Processor-to-server; no browser calls this.
        .merge(webhooks::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
