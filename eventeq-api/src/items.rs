use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use eventeq_booking::listing::{ItemBookingView, ItemFeedbackView};

use crate::bookings::parse_id;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/item/{item_id}/booking", get(item_bookings))
        .route("/item/{item_id}/feedback", get(item_feedback))
}

/// GET /item/{itemId}/booking
/// Returned bookings containing the item, latest start date first.
pub async fn item_bookings(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<Vec<ItemBookingView>>, AppError> {
    let views = state.service.list_by_item(parse_id(&item_id, "itemId")?).await?;
    Ok(Json(views))
}

/// GET /item/{itemId}/feedback
pub async fn item_feedback(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<Json<Vec<ItemFeedbackView>>, AppError> {
    let feedback = state.service.feedbacks_for_item(parse_id(&item_id, "itemId")?).await?;
    Ok(Json(feedback))
}
