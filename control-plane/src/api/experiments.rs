use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use error_types::ServiceError;
use flagcore::{ConfigSnapshot, TargetingRule};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{PageQuery, PaginatedResponse};
use crate::AppState;
use store::{
    repo::{audiences, audit, environments, experiments},
    Experiment, ExperimentStatus,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/experiments", post(create).get(list))
        .route(
            "/experiments/:id",
            get(get_one).patch(update).delete(delete_one),
        )
        .route("/experiments/:id/status", post(update_status))
        .route("/experiments/:id/publish", post(publish_explicit))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExperiment {
    pub environment_id: Uuid,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub salt: String,
    pub audience_id: Option<Uuid>,
    #[serde(default)]
    pub targeting_rules: Vec<TargetingRule>,
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateExperiment>,
) -> Result<Json<Experiment>> {
    environments::get(&state.pool, body.environment_id).await?;

    if let Some(audience_id) = body.audience_id {
        check_same_environment(&state, audience_id, body.environment_id).await?;
    }

    let experiment = experiments::create(
        &state.pool,
        body.environment_id,
        &body.key,
        &body.name,
        body.description.as_deref(),
        &body.salt,
        body.audience_id,
        &body.targeting_rules,
    )
    .await?;

    Ok(Json(experiment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListExperimentsQuery {
    pub environment_id: Option<Uuid>,
    pub status: Option<ExperimentStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListExperimentsQuery>,
) -> Result<Json<PaginatedResponse<Experiment>>> {
    let params = PageQuery {
        page: query.page,
        page_size: query.page_size,
    }
    .resolve()
    .map_err(AppError)?;
    let (data, total) =
        experiments::list(&state.pool, query.environment_id, query.status, params).await?;
    Ok(Json(PaginatedResponse::new(data, params, total)))
}

async fn get_one(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Experiment>> {
    let experiment = experiments::get(&state.pool, id).await?;
    Ok(Json(experiment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExperiment {
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub audience_id: Option<Option<Uuid>>,
    pub targeting_rules: Option<Vec<TargetingRule>>,
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateExperiment>,
) -> Result<(HeaderMap, Json<Experiment>)> {
    let existing = experiments::get(&state.pool, id).await?;

    if let Some(Some(audience_id)) = body.audience_id {
        check_same_environment(&state, audience_id, existing.environment_id).await?;
    }

    let targeting_changed = body.targeting_rules.is_some();

    let experiment = experiments::update_metadata(
        &state.pool,
        id,
        body.name.as_deref(),
        body.description.as_ref().map(|d| d.as_deref()),
        body.audience_id,
        body.targeting_rules.as_deref(),
    )
    .await?;

    let mut headers = HeaderMap::new();
    if targeting_changed && experiment.status == ExperimentStatus::Running {
        let environment = environments::get(&state.pool, experiment.environment_id).await?;
        let outcome = state
            .publish
            .publish_if(true, experiment.environment_id, &environment.name)
            .await;
        outcome.apply_headers(&mut headers);
    }

    Ok((headers, Json(experiment)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatus {
    pub status: ExperimentStatus,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatus>,
) -> Result<(HeaderMap, Json<Experiment>)> {
    let existing = experiments::get(&state.pool, id).await?;

    if !existing.status.can_transition_to(&body.status) {
        return Err(AppError(ServiceError::IllegalTransition(format!(
            "cannot transition experiment from {:?} to {:?}",
            existing.status, body.status
        ))));
    }

    let experiment = experiments::update_status(&state.pool, id, body.status).await?;

    audit::record(
        &state.pool,
        "control-plane",
        "experiment.status_changed",
        "experiment",
        &experiment.id.to_string(),
        Some(&serde_json::json!({"from": existing.status, "to": experiment.status})),
    )
    .await?;

    let environment = environments::get(&state.pool, experiment.environment_id).await?;
    let outcome = state
        .publish
        .publish_if(true, experiment.environment_id, &environment.name)
        .await;

    let mut headers = HeaderMap::new();
    outcome.apply_headers(&mut headers);
    Ok((headers, Json(experiment)))
}

async fn delete_one(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<HeaderMap> {
    let existing = experiments::get(&state.pool, id).await?;
    experiments::delete(&state.pool, id).await?;

    audit::record(
        &state.pool,
        "control-plane",
        "experiment.deleted",
        "experiment",
        &id.to_string(),
        None,
    )
    .await?;

    let environment = environments::get(&state.pool, existing.environment_id).await?;
    let outcome = state
        .publish
        .publish_if(true, existing.environment_id, &environment.name)
        .await;

    let mut headers = HeaderMap::new();
    outcome.apply_headers(&mut headers);
    Ok(headers)
}

async fn publish_explicit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfigSnapshot>> {
    let experiment = experiments::get(&state.pool, id).await?;
    let environment = environments::get(&state.pool, experiment.environment_id).await?;
    let snapshot = state
        .publish
        .publish_explicit(experiment.environment_id, &environment.name)
        .await?;
    Ok(Json(snapshot))
}

async fn check_same_environment(
    state: &AppState,
    audience_id: Uuid,
    environment_id: Uuid,
) -> Result<()> {
    let audience = audiences::get(&state.pool, audience_id).await?;
    if audience.environment_id != environment_id {
        return Err(AppError(ServiceError::CrossEnvironment(format!(
            "audience {audience_id} does not belong to environment {environment_id}"
        ))));
    }
    Ok(())
}
