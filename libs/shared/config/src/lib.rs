use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub scheduler_tick_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| {
                warn!("BIND_ADDR not set, using default");
                "0.0.0.0:3000".to_string()
            }),
            scheduler_tick_seconds: env::var("SCHEDULER_TICK_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("SCHEDULER_TICK_SECONDS not set or invalid, using 60");
                    60
                }),
        }
    }
}
