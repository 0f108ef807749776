use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use queue_cell::{
    BookingTimeEstimator, QueuePolicy, QueuePositionCalculator, QueueState,
    StatusLifecycleScheduler,
};
use shared_config::AppConfig;
use shared_database::{BookingStore, DoctorStore, MemoryStore};
use shared_utils::{Clock, Notifier, SystemClock, TracingNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting queue booking API server");

    let config = AppConfig::from_env();

    // Wire the store seam. The in-memory adapter stands in for the
    // external durable store.
    let store = Arc::new(MemoryStore::new());
    let doctors: Arc<dyn DoctorStore> = store.clone();
    let bookings: Arc<dyn BookingStore> = store.clone();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let policy = QueuePolicy::default();

    let estimator = BookingTimeEstimator::new(
        doctors.clone(),
        bookings.clone(),
        clock.clone(),
        policy.clone(),
    );
    let position = QueuePositionCalculator::new(
        doctors.clone(),
        bookings.clone(),
        clock.clone(),
        policy.clone(),
    );
    let state = QueueState::new(estimator, position);

    // The lifecycle sweep runs on its own task, independent of the
    // booking paths.
    let scheduler = Arc::new(StatusLifecycleScheduler::new(
        bookings, notifier, clock, policy,
    ));
    tokio::spawn(scheduler.run(Duration::from_secs(config.scheduler_tick_seconds)));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    info!("Listening on {}", config.bind_addr);
    let listener = TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
