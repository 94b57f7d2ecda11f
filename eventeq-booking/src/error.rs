use eventeq_core::BoxError;

use crate::models::BookingStatus;
use crate::request::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid booking request: {0}")]
    Validation(ValidationErrors),

    #[error("Booking not found: {0}")]
    NotFound(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Feedback is only accepted on returned bookings, this one is {0}")]
    FeedbackNotAllowed(BookingStatus),

    #[error("Item unavailable: {0}")]
    Unavailable(String),

    #[error("Store failure: {0}")]
    Store(String),

    #[error("Payment gateway failure: {0}")]
    Gateway(String),

    #[error("{0} timed out")]
    Timeout(&'static str),
}

impl BookingError {
    pub fn store(err: BoxError) -> Self {
        BookingError::Store(err.to_string())
    }

    pub fn gateway(err: BoxError) -> Self {
        BookingError::Gateway(err.to_string())
    }

    /// Failures of a dependency rather than of the caller's input.
    pub fn is_dependency(&self) -> bool {
        matches!(
            self,
            BookingError::Store(_) | BookingError::Gateway(_) | BookingError::Timeout(_)
        )
    }
}
