//! Cron-job control endpoints.
//!
//! Jobs are never actually executed: a manual run marks the job
//! running, returns immediately, and a spawned task simulates the
//! execution before flipping the job back to idle and publishing a
//! completion event.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use super::error::ApiError;
use super::routes::AppState;
use super::types::{JobResponse, MessageResponse};
use crate::events::DashboardEvent;
use crate::store::{CronJob, JobStatus, LogLevel};

/// How long a simulated job execution takes.
const JOB_EXECUTION_DELAY: Duration = Duration::from_secs(2);

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cron-jobs", get(list_jobs))
        .route("/cron-jobs/:id", delete(delete_job))
        .route("/cron-jobs/:id/run", post(run_job))
        .route("/cron-jobs/:id/toggle", post(toggle_job))
}

async fn list_jobs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<CronJob>>, ApiError> {
    Ok(Json(state.store.list_jobs()?))
}

pub(crate) async fn run_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.store.mark_job_running(id)?;
    state.logs.append(
        LogLevel::Info,
        "scheduler",
        &format!("Cron job '{}' executed manually", job.name),
    );
    spawn_completion(state.clone(), id, JOB_EXECUTION_DELAY);

    Ok(Json(JobResponse {
        message: format!("Job {id} started"),
        job,
    }))
}

/// Simulated execution: after `delay` the job returns to idle and a
/// `job_completed` event is published. The triggering request does not
/// wait; shutdown cancels the simulation.
pub(crate) fn spawn_completion(state: Arc<AppState>, job_id: i64, delay: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = state.shutdown.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        // The job may have been deleted while "running"
        match state.store.set_job_status(job_id, JobStatus::Idle) {
            Ok(job) => state.events.publish(DashboardEvent::job_completed(&job)),
            Err(err) => {
                tracing::warn!("Simulated run of job {} could not complete: {}", job_id, err)
            }
        }
    });
}

pub(crate) async fn toggle_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = state.store.toggle_job(id)?;
    let status = if job.is_active { "enabled" } else { "disabled" };
    state.logs.append(
        LogLevel::Info,
        "scheduler",
        &format!("Cron job '{}' {}", job.name, status),
    );
    Ok(Json(JobResponse {
        message: format!("Job {id} {status}"),
        job,
    }))
}

pub(crate) async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let job = state.store.delete_job(id)?;
    state.logs.append(
        LogLevel::Info,
        "scheduler",
        &format!("Cron job '{}' deleted", job.name),
    );
    Ok(Json(MessageResponse {
        message: format!("Job {id} deleted"),
    }))
}
