pub mod capacity;
pub mod estimator;
pub mod position;
pub mod scheduler;
