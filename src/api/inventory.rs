//! Agent, skill and model inventory endpoints, backed by the fixture
//! registry.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use super::error::ApiError;
use super::routes::AppState;
use super::types::ModelActivationResponse;
use crate::fixtures::{Agent, Model, Skill};
use crate::store::LogLevel;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/agents", get(list_agents))
        .route("/skills", get(list_skills))
        .route("/skills/:id/toggle", post(toggle_skill))
        .route("/models", get(list_models))
        .route("/models/:id/activate", post(activate_model))
}

async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Vec<Agent>> {
    Json(state.fixtures.list_agents().await)
}

async fn list_skills(State(state): State<Arc<AppState>>) -> Json<Vec<Skill>> {
    Json(state.fixtures.list_skills().await)
}

pub(crate) async fn toggle_skill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Skill>, ApiError> {
    let skill = state
        .fixtures
        .toggle_skill(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("skill {id} not found")))?;

    let status = if skill.enabled { "enabled" } else { "disabled" };
    state.logs.append(
        LogLevel::Info,
        "system",
        &format!("Skill '{}' {}", skill.name, status),
    );
    Ok(Json(skill))
}

async fn list_models(State(state): State<Arc<AppState>>) -> Json<Vec<Model>> {
    Json(state.fixtures.list_models().await)
}

pub(crate) async fn activate_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ModelActivationResponse>, ApiError> {
    let models = state
        .fixtures
        .activate_model(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("model {id} not found")))?;

    if let Some(model) = models.iter().find(|m| m.id == id) {
        state.logs.append(
            LogLevel::Info,
            "system",
            &format!("Model '{}' activated", model.name),
        );
    }

    Ok(Json(ModelActivationResponse {
        message: format!("Model {id} activated"),
        models,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::test_state;
    use crate::store::LogLevel;

    #[tokio::test]
    async fn toggle_skill_logs_the_transition() {
        let (state, _dir) = test_state();

        let Json(skill) = toggle_skill(State(state.clone()), Path("skill-3".to_string()))
            .await
            .expect("toggle seeded skill");
        // skill-3 (slack) starts disabled
        assert!(skill.enabled);

        let logged = state.logs.list(Some(1), Some(LogLevel::Info), Some("system"));
        assert_eq!(logged[0].message, "Skill 'slack' enabled");
    }

    #[tokio::test]
    async fn toggle_unknown_skill_is_not_found() {
        let (state, _dir) = test_state();
        let err = toggle_skill(State(state), Path("skill-99".to_string()))
            .await
            .expect_err("unknown skill");
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn activate_model_returns_full_collection() {
        let (state, _dir) = test_state();

        let Json(response) = activate_model(State(state.clone()), Path("gpt-4o".to_string()))
            .await
            .expect("activate seeded model");

        assert_eq!(response.models.len(), 4);
        for model in &response.models {
            assert_eq!(model.active, model.id == "gpt-4o");
        }
    }

    #[tokio::test]
    async fn activate_unknown_model_is_not_found() {
        let (state, _dir) = test_state();
        let err = activate_model(State(state), Path("bogus".to_string()))
            .await
            .expect_err("unknown model");
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
