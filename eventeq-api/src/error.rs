use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eventeq_booking::request::ValidationErrors;
use eventeq_booking::BookingError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationErrors),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Invalid request",
                    "details": errors.fields(),
                }),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(errors) => AppError::Validation(errors),
            BookingError::NotFound(what) => AppError::NotFound(format!("Not found: {}", what)),
            err @ (BookingError::InvalidTransition { .. }
            | BookingError::FeedbackNotAllowed(_)
            | BookingError::Unavailable(_)) => AppError::Conflict(err.to_string()),
            err => AppError::Internal(err.to_string()),
        }
    }
}
