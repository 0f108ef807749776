pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::QueueError;
pub use models::*;
pub use router::create_queue_router;
pub use services::{
    capacity::SlotCapacityTracker, estimator::BookingTimeEstimator,
    position::QueuePositionCalculator, scheduler::StatusLifecycleScheduler,
};

use std::sync::Arc;

/// Shared handler state: the two request-path services. The scheduler
/// runs on its own task and is not reachable through HTTP.
pub struct QueueState {
    pub estimator: BookingTimeEstimator,
    pub position: QueuePositionCalculator,
}

impl QueueState {
    pub fn new(estimator: BookingTimeEstimator, position: QueuePositionCalculator) -> Arc<Self> {
        Arc::new(Self {
            estimator,
            position,
        })
    }
}
