use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{create_booking, get_position, get_position_by_token};
use crate::QueueState;

pub fn create_queue_router(state: Arc<QueueState>) -> Router {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/{booking_id}/position", get(get_position))
        .route("/bookings/token/{token}/position", get(get_position_by_token))
        .with_state(state)
}
