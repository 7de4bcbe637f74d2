//! Synthesized usage metrics and health heartbeats.
//!
//! Reference behavior: samples are regenerated randomly on every
//! request rather than read back from storage. Heartbeat history is
//! built once at startup; only the `current` sample varies per call.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use rand::Rng;

use super::routes::AppState;
use super::types::{
    HeartbeatResponse, HeartbeatSample, HeartbeatStatus, MetricSample, MetricsResponse,
    MetricsSummary,
};

const METRIC_MODELS: [&str; 3] = ["Claude 4 Sonnet", "GPT-4o", "Gemini 2.5 Pro"];
const METRIC_DAYS: i64 = 7;
const HEARTBEAT_HISTORY_HOURS: i64 = 24;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/metrics", get(get_metrics))
        .route("/heartbeat", get(get_heartbeat))
}

pub(crate) async fn get_metrics(State(_state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    Json(synthesize_metrics())
}

fn synthesize_metrics() -> MetricsResponse {
    let mut rng = rand::thread_rng();
    let today = Utc::now().date_naive();

    let mut metrics = Vec::with_capacity((METRIC_DAYS as usize) * METRIC_MODELS.len());
    for day in 0..METRIC_DAYS {
        let date = today - Duration::days(METRIC_DAYS - 1 - day);
        for model in METRIC_MODELS {
            metrics.push(MetricSample {
                date,
                model: model.to_string(),
                tokens_input: rng.gen_range(1_000..=50_000),
                tokens_output: rng.gen_range(500..=20_000),
                cost: round2(rng.gen_range(0.1..5.0)),
            });
        }
    }

    let summary = MetricsSummary {
        total_cost: round2(metrics.iter().map(|m| m.cost).sum()),
        total_tokens_input: metrics.iter().map(|m| m.tokens_input).sum(),
        total_tokens_output: metrics.iter().map(|m| m.tokens_output).sum(),
        period: "7 days",
    };

    MetricsResponse { metrics, summary }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Backdated hourly heartbeat samples, oldest first. Built once at
/// startup and served from `AppState`.
pub fn heartbeat_history() -> Vec<HeartbeatSample> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();
    (0..HEARTBEAT_HISTORY_HOURS)
        .map(|i| HeartbeatSample {
            timestamp: now - Duration::hours(HEARTBEAT_HISTORY_HOURS - 1 - i),
            status: if rng.gen_bool(0.9) {
                HeartbeatStatus::Ok
            } else {
                HeartbeatStatus::Warning
            },
            response_time: rng.gen_range(50..=500),
        })
        .collect()
}

pub(crate) async fn get_heartbeat(State(state): State<Arc<AppState>>) -> Json<HeartbeatResponse> {
    let response_time = rand::thread_rng().gen_range(50..=200);
    Json(HeartbeatResponse {
        history: state.heartbeat_history.clone(),
        current: HeartbeatSample {
            timestamp: Utc::now(),
            status: HeartbeatStatus::Ok,
            response_time,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::test_state;

    #[test]
    fn metrics_cover_seven_days_for_each_model() {
        let response = synthesize_metrics();
        assert_eq!(response.metrics.len(), 21);

        let today = Utc::now().date_naive();
        assert_eq!(response.metrics[0].date, today - Duration::days(6));
        assert_eq!(
            response.metrics.last().expect("non-empty").date,
            today
        );

        for sample in &response.metrics {
            assert!((1_000..=50_000).contains(&sample.tokens_input));
            assert!((500..=20_000).contains(&sample.tokens_output));
            assert!(sample.cost >= 0.1 && sample.cost <= 5.0);
        }
    }

    #[test]
    fn metrics_summary_totals_match_samples() {
        let response = synthesize_metrics();
        let expected_input: u64 = response.metrics.iter().map(|m| m.tokens_input).sum();
        assert_eq!(response.summary.total_tokens_input, expected_input);
        assert_eq!(response.summary.period, "7 days");

        let expected_cost = round2(response.metrics.iter().map(|m| m.cost).sum());
        assert!((response.summary.total_cost - expected_cost).abs() < f64::EPSILON);
    }

    #[test]
    fn heartbeat_history_is_hourly_and_ordered() {
        let history = heartbeat_history();
        assert_eq!(history.len(), 24);
        assert!(history
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn heartbeat_current_sample_is_ok() {
        let (state, _dir) = test_state();
        let Json(response) = get_heartbeat(State(state)).await;
        assert_eq!(response.history.len(), 24);
        assert_eq!(response.current.status, HeartbeatStatus::Ok);
        assert!((50..=200).contains(&response.current.response_time));
    }
}
