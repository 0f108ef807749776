use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;

use queue_cell::{create_queue_router, QueueState};

pub fn create_router(state: Arc<QueueState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Queue booking API is running!" }))
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .nest("/queue", create_queue_router(state))
}
