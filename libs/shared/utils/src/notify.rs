use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Fire-and-forget patient messaging. Delivery is best-effort:
/// callers log failures and move on, never abort on them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, contact: &str, message: &str) -> Result<(), NotifyError>;
}

/// Log-only notifier. The real email/SMS gateway is an external
/// collaborator; this stands in for it everywhere in this repo.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, contact: &str, message: &str) -> Result<(), NotifyError> {
        info!("notify {}: {}", contact, message);
        Ok(())
    }
}
