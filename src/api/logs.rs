//! Recent-log query endpoint over the in-memory buffer.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use super::routes::AppState;
use super::types::LogsQuery;
use crate::store::{LogEntry, LogLevel};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/logs", get(get_logs))
}

pub(crate) async fn get_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> Json<Vec<LogEntry>> {
    let level = query.level.as_deref().map(LogLevel::parse_lossy);
    Json(state.logs.list(query.limit, level, query.source.as_deref()))
}
