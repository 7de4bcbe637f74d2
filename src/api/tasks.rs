//! Kanban task CRUD.
//!
//! Every mutation appends a log entry through the broadcaster and
//! publishes the matching task event to connected clients.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use super::error::ApiError;
use super::routes::AppState;
use super::types::MessageResponse;
use crate::events::DashboardEvent;
use crate::store::{LogLevel, NewTask, Task, TaskPatch};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
}

async fn list_tasks(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.store.list_tasks()?))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.store.get_task(id)?))
}

pub(crate) async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    if new.title.trim().is_empty() {
        return Err(ApiError::Validation("title must not be empty".to_string()));
    }

    let task = state.store.create_task(new)?;
    state.logs.append(
        LogLevel::Info,
        "system",
        &format!("Task '{}' created", task.title),
    );
    state.events.publish(DashboardEvent::TaskCreated(task.clone()));
    Ok((StatusCode::CREATED, Json(task)))
}

pub(crate) async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    let task = state.store.update_task(id, patch)?;
    state.logs.append(
        LogLevel::Info,
        "system",
        &format!("Task '{}' updated", task.title),
    );
    state.events.publish(DashboardEvent::TaskUpdated(task.clone()));
    Ok(Json(task))
}

pub(crate) async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    // NotFound propagates before anything is logged or published
    let task = state.store.delete_task(id)?;
    state.logs.append(
        LogLevel::Info,
        "system",
        &format!("Task '{}' deleted", task.title),
    );
    state.events.publish(DashboardEvent::TaskDeleted { id });
    Ok(Json(MessageResponse {
        message: format!("Task {id} deleted"),
    }))
}
