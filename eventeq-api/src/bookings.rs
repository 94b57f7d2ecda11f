use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use eventeq_booking::listing::OwnerBookingView;
use eventeq_booking::request::{CreateBookingRequest, FeedbackRequest, ValidationErrors};
use eventeq_booking::Booking;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    pub status: &'static str,
    pub message: String,
    pub booking_id: Uuid,
    pub bill_code: String,
}

#[derive(Debug, Serialize)]
pub struct BookingUpdateResponse {
    pub status: &'static str,
    pub message: String,
    pub booking: Booking,
}

impl BookingUpdateResponse {
    fn new(message: &str, booking: Booking) -> Self {
        Self {
            status: "success",
            message: message.to_string(),
            booking,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/booking/create", post(create_booking))
        .route("/booking/cancel/{id}", put(cancel_booking))
        .route("/booking/active/{id}", get(get_active_booking))
        .route("/booking/active/{id}/retrieve", put(retrieve_booking))
        .route("/booking/active/{id}/return", put(return_booking))
        .route("/booking/giveRating", put(give_rating))
        .route("/booking/owner/{owner_id}/listing", get(owner_listing))
        .route("/booking/{user_id}/upcoming/listing", get(upcoming_listing))
        .route("/booking/{user_id}/active/listing", get(active_listing))
        .route("/booking/{user_id}/ended/listing", get(ended_listing))
        .route("/booking/{user_id}/stream", get(crate::stream::booking_stream))
}

/// Path ids are taken as text so a malformed id answers 400 with the usual
/// error body instead of the extractor's plain-text rejection.
pub fn parse_id(raw: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(ValidationErrors::single(field, "must be a valid UUID")))
}

fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /booking/create
pub async fn create_booking(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), AppError> {
    let body = json_body(payload)?;
    let request = CreateBookingRequest::from_json(&body).map_err(AppError::Validation)?;
    let booking = state.service.create_booking(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            status: "success",
            message: "Booking created, awaiting payment".to_string(),
            booking_id: booking.id,
            bill_code: booking.bill_code,
        }),
    ))
}

/// PUT /booking/cancel/{id}
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookingUpdateResponse>, AppError> {
    let booking = state.service.cancel(parse_id(&id, "id")?).await?;
    Ok(Json(BookingUpdateResponse::new("Booking cancelled", booking)))
}

/// PUT /booking/active/{id}/retrieve
pub async fn retrieve_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookingUpdateResponse>, AppError> {
    let booking = state.service.retrieve(parse_id(&id, "id")?).await?;
    Ok(Json(BookingUpdateResponse::new("Items retrieved", booking)))
}

/// PUT /booking/active/{id}/return
pub async fn return_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookingUpdateResponse>, AppError> {
    let booking = state.service.mark_returned(parse_id(&id, "id")?).await?;
    Ok(Json(BookingUpdateResponse::new("Items returned", booking)))
}

/// GET /booking/active/{id}
pub async fn get_active_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.service.get_booking(parse_id(&id, "id")?).await?;
    Ok(Json(booking))
}

/// PUT /booking/giveRating
pub async fn give_rating(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BookingUpdateResponse>, AppError> {
    let body = json_body(payload)?;
    let request = FeedbackRequest::from_json(&body).map_err(AppError::Validation)?;
    let booking = state.service.give_feedback(request).await?;
    Ok(Json(BookingUpdateResponse::new("Feedback saved", booking)))
}

/// GET /booking/{userId}/upcoming/listing
pub async fn upcoming_listing(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state.service.list_upcoming(parse_id(&user_id, "userId")?).await?;
    Ok(Json(bookings))
}

/// GET /booking/{userId}/active/listing
pub async fn active_listing(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state.service.list_active(parse_id(&user_id, "userId")?).await?;
    Ok(Json(bookings))
}

/// GET /booking/{userId}/ended/listing
pub async fn ended_listing(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state.service.list_ended(parse_id(&user_id, "userId")?).await?;
    Ok(Json(bookings))
}

/// GET /booking/owner/{ownerId}/listing
pub async fn owner_listing(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<Vec<OwnerBookingView>>, AppError> {
    let bookings = state.service.list_for_owner(parse_id(&owner_id, "ownerId")?).await?;
    Ok(Json(bookings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_padded_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&format!(" {} ", id), "id").unwrap(), id);
    }

    #[test]
    fn parse_id_names_the_field() {
        match parse_id("not-a-uuid", "userId") {
            Err(AppError::Validation(errors)) => assert!(errors.has("userId")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
