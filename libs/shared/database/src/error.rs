use thiserror::Error;

/// Failures surfaced by the store seam. Both variants are transient
/// from the caller's point of view: retryable with backoff, never a
/// crash.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("concurrent update conflict: {0}")]
    Conflict(String),
}
