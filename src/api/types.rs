//! API request and response types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::fixtures::Model;
use crate::store::CronJob;

/// Generic confirmation response.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response for `GET /api/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Service status
    pub status: &'static str,

    /// Service version
    pub version: &'static str,

    /// Human-readable uptime, e.g. `"3h 12m 5s"`
    pub uptime: String,

    pub uptime_seconds: u64,

    pub timestamp: DateTime<Utc>,
}

/// One synthesized token-usage sample for a model on a day.
#[derive(Debug, Clone, Serialize)]
pub struct MetricSample {
    pub date: NaiveDate,
    pub model: String,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub total_cost: f64,
    pub total_tokens_input: u64,
    pub total_tokens_output: u64,
    pub period: &'static str,
}

/// Response for `GET /api/metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub metrics: Vec<MetricSample>,
    pub summary: MetricsSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartbeatStatus {
    Ok,
    Warning,
}

/// A single gateway health sample.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatSample {
    pub timestamp: DateTime<Utc>,
    pub status: HeartbeatStatus,
    /// Response time in milliseconds
    pub response_time: u64,
}

/// Response for `GET /api/heartbeat`.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatResponse {
    pub history: Vec<HeartbeatSample>,
    pub current: HeartbeatSample,
}

/// Response for job control actions that echo the updated job.
#[derive(Debug, Clone, Serialize)]
pub struct JobResponse {
    pub message: String,
    pub job: CronJob,
}

/// Response for `POST /api/models/{id}/activate`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelActivationResponse {
    pub message: String,
    pub models: Vec<Model>,
}

/// Query parameters for `GET /api/logs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
    pub level: Option<String>,
    pub source: Option<String>,
}
