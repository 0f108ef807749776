use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use tracing::info;
use uuid::Uuid;

use crate::error::QueueError;
use crate::models::{BookingResult, CreateBookingRequest, PositionInfo};
use crate::QueueState;

/// Create a queue booking
pub async fn create_booking(
    State(state): State<Arc<QueueState>>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<BookingResult>, QueueError> {
    info!(
        "booking request for doctor {} (emergency: {})",
        request.doctor_id, request.emergency
    );
    let result = state.estimator.create_booking(request).await?;
    Ok(Json(result))
}

/// Live queue position by booking id
pub async fn get_position(
    State(state): State<Arc<QueueState>>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<PositionInfo>, QueueError> {
    let info = state.position.position_of(booking_id).await?;
    Ok(Json(info))
}

/// Live queue position by patient-facing token
pub async fn get_position_by_token(
    State(state): State<Arc<QueueState>>,
    Path(token): Path<String>,
) -> Result<Json<PositionInfo>, QueueError> {
    let info = state.position.position_by_token(&token).await?;
    Ok(Json(info))
}
