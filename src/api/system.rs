//! Process status and quick actions.
//!
//! The restart action is simulated: it logs the request, returns
//! immediately, and a spawned task logs completion and publishes
//! `gateway_restarted` after a short delay.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use super::routes::AppState;
use super::types::{MessageResponse, StatusResponse};
use crate::events::DashboardEvent;
use crate::store::LogLevel;

/// How long the simulated gateway restart takes.
const RESTART_DELAY: Duration = Duration::from_secs(2);

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .route("/actions/restart", post(restart_gateway))
        .route("/actions/clear-cache", post(clear_cache))
}

pub(crate) async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let uptime_seconds = state.started_at.elapsed().as_secs();
    Json(StatusResponse {
        status: "online",
        version: env!("CARGO_PKG_VERSION"),
        uptime: format_uptime(uptime_seconds),
        uptime_seconds,
        timestamp: Utc::now(),
    })
}

fn format_uptime(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours}h {minutes}m {seconds}s")
}

pub(crate) async fn restart_gateway(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    state
        .logs
        .append(LogLevel::Warn, "system", "Gateway restart requested");
    spawn_restart(state.clone(), RESTART_DELAY);
    Json(MessageResponse {
        message: "Gateway restart initiated".to_string(),
    })
}

pub(crate) fn spawn_restart(state: Arc<AppState>, delay: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = state.shutdown.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        state
            .logs
            .append(LogLevel::Info, "system", "Gateway restarted successfully");
        state.events.publish(DashboardEvent::GatewayRestarted {
            timestamp: Utc::now(),
        });
    });
}

pub(crate) async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    state.logs.append(LogLevel::Info, "system", "Cache cleared");
    Json(MessageResponse {
        message: "Cache cleared successfully".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::test_state;

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(0), "0h 0m 0s");
        assert_eq!(format_uptime(3725), "1h 2m 5s");
        assert_eq!(format_uptime(90_061), "25h 1m 1s");
    }

    #[tokio::test]
    async fn status_reports_online_with_version() {
        let (state, _dir) = test_state();
        let Json(status) = get_status(State(state)).await;
        assert_eq!(status.status, "online");
        assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn restart_publishes_event_after_delay() {
        let (state, _dir) = test_state();
        let mut rx = state.events.subscribe();

        state
            .logs
            .append(LogLevel::Warn, "system", "Gateway restart requested");
        spawn_restart(state.clone(), Duration::from_millis(10));

        // First event is the new_log for the WARN append; keep reading
        // until the restart completion arrives.
        let deadline = Duration::from_secs(1);
        loop {
            let event = tokio::time::timeout(deadline, rx.recv())
                .await
                .expect("event in time")
                .expect("receive event");
            if let DashboardEvent::GatewayRestarted { .. } = event {
                break;
            }
        }

        let recent = state.logs.list(Some(5), None, None);
        assert!(recent
            .iter()
            .any(|e| e.message == "Gateway restarted successfully"));
    }

    #[tokio::test]
    async fn clear_cache_appends_log() {
        let (state, _dir) = test_state();
        let Json(response) = clear_cache(State(state.clone())).await;
        assert_eq!(response.message, "Cache cleared successfully");

        let recent = state.logs.list(Some(1), None, None);
        assert_eq!(recent[0].message, "Cache cleared");
        assert_eq!(recent[0].source, "system");
    }
}
