use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Weekday;
use serde_json::json;
use thiserror::Error;

use shared_database::StoreError;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Doctor is not available on {weekday}")]
    SlotNotFound { weekday: Weekday },

    #[error("No more bookings available for this day")]
    SlotFull,

    #[error("Emergency slots full for today")]
    EmergencyCapacityExceeded,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for QueueError {
    fn into_response(self) -> Response {
        let status = match &self {
            QueueError::DoctorNotFound | QueueError::BookingNotFound => StatusCode::NOT_FOUND,
            QueueError::SlotNotFound { .. } => StatusCode::BAD_REQUEST,
            QueueError::SlotFull | QueueError::EmergencyCapacityExceeded => StatusCode::CONFLICT,
            QueueError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            QueueError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        };

        tracing::error!("Error: {}: {}", status, self);

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
