//! Router assembly and shared application state.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::types::HeartbeatSample;
use super::{inventory, jobs, logs, metrics, stream, system, tasks};
use crate::config::Config;
use crate::events::EventChannel;
use crate::fixtures::FixtureRegistry;
use crate::generator;
use crate::logs::LogBroadcaster;
use crate::store::{Store, StoreError};

/// Number of synthetic log entries seeded into the buffer at startup.
const LOG_SEED_COUNT: usize = 100;

/// Shared application state, injected into every handler.
pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub fixtures: FixtureRegistry,
    pub logs: Arc<LogBroadcaster>,
    pub events: EventChannel,
    /// Heartbeat history snapshot built at startup.
    pub heartbeat_history: Vec<HeartbeatSample>,
    pub started_at: Instant,
    /// Cancelled at shutdown; stops the generator and any in-flight
    /// simulated work.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build the full application state: open and seed the store,
    /// seed the log buffer, snapshot the heartbeat history.
    pub fn new(config: Config) -> Result<Arc<Self>, StoreError> {
        let store = Store::open(&config.database_path)?;
        store.seed_defaults()?;

        let events = EventChannel::new();
        let logs = Arc::new(LogBroadcaster::new(store.clone(), events.clone()));
        logs.seed_history(LOG_SEED_COUNT);

        Ok(Arc::new(Self {
            config,
            store,
            fixtures: FixtureRegistry::new(),
            logs,
            events,
            heartbeat_history: metrics::heartbeat_history(),
            started_at: Instant::now(),
            shutdown: CancellationToken::new(),
        }))
    }
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(system::routes())
        .merge(tasks::routes())
        .merge(jobs::routes())
        .merge(inventory::routes())
        .merge(metrics::routes())
        .merge(logs::routes())
        .route("/events", get(stream::events_ws))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Start the HTTP server and the ambient log generator; serve until
/// ctrl-c, then cancel background work.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(config.clone())?;
    let generator = generator::spawn(state.logs.clone(), state.shutdown.clone());

    let app = build_router(state.clone());
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("OpenClaw dashboard listening on {}", addr);

    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    let _ = generator.await;
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::error!("Failed to listen for shutdown signal: {}", err);
            }
            info!("Shutdown requested");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> (Arc<AppState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: dir.path().join("api.db"),
    };
    (AppState::new(config).expect("build app state"), dir)
}
