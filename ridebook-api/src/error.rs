use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ridebook_core::ProcessorError;
use ridebook_infra::WebhookError;
use ridebook_order::BookingError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    ValidationError { field: &'static str, message: String },
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    ConflictError(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("Payment processor timed out")]
    GatewayTimeout,
    #[error("{0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, field) = match self {
            AppError::ValidationError { field, message } => (StatusCode::UNPROCESSABLE_ENTITY, message, Some(field)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::BadGateway(msg) => {
                tracing::warn!("Payment processor error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Payment processor unavailable".to_string(), None)
            }
            AppError::GatewayTimeout => (StatusCode::GATEWAY_TIMEOUT, "Payment processor timed out".to_string(), None),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), None)
            }
        };

        let body = match field {
            Some(field) => json!({ "error": error_message, "field": field }),
            None => json!({ "error": error_message }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation { field, message } => AppError::ValidationError { field, message },
            BookingError::Pricing(e) => AppError::BadRequest(e.to_string()),
            e @ (BookingError::Catalog(_) | BookingError::NotFound(_)) => AppError::NotFoundError(e.to_string()),
            e @ (BookingError::AlreadyPaid(_)
            | BookingError::SessionCompleted { .. }
            | BookingError::NotYetPaid { .. }
            | BookingError::Contention(_)) => AppError::ConflictError(e.to_string()),
            BookingError::ExternalProcessor(ProcessorError::Timeout) => AppError::GatewayTimeout,
            BookingError::ExternalProcessor(ProcessorError::UnknownSession(s)) => {
                AppError::NotFoundError(format!("Unknown checkout session: {}", s))
            }
            BookingError::ExternalProcessor(e) => AppError::BadGateway(e.to_string()),
            BookingError::Store(e) => AppError::InternalServerError(e.to_string()),
        }
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
