use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::AppState;
use error_types::ServiceError;
use store::{
    repo::{
        environments, experiments,
        variants::{self, BatchCreate, BatchUpdate},
    },
    ExperimentStatus, Variant,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/experiments/:id/variants", post(create))
        .route("/experiments/:id/variants/batch", post(batch))
        .route("/variants/:id", patch(update).delete(delete_one))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVariant {
    pub key: String,
    pub name: String,
    pub payload: Option<Value>,
}

async fn create(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
    Json(body): Json<CreateVariant>,
) -> Result<(HeaderMap, Json<Variant>)> {
    let experiment = experiments::get(&state.pool, experiment_id).await?;
    let variant = variants::create(
        &state.pool,
        experiment_id,
        &body.key,
        &body.name,
        body.payload.as_ref(),
    )
    .await?;

    let headers = publish_if_running(&state, &experiment).await;
    Ok((headers, Json(variant)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVariant {
    pub name: Option<String>,
    #[serde(default)]
    pub payload: Option<Option<Value>>,
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateVariant>,
) -> Result<(HeaderMap, Json<Variant>)> {
    let variant = variants::update(
        &state.pool,
        id,
        body.name.as_deref(),
        body.payload.as_ref().map(|p| p.as_ref()),
    )
    .await?;

    let experiment = experiments::get(&state.pool, variant.experiment_id).await?;
    let headers = publish_if_running(&state, &experiment).await;
    Ok((headers, Json(variant)))
}

async fn delete_one(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<HeaderMap> {
    let variant = variants::get(&state.pool, id).await?;
    variants::delete(&state.pool, id).await?;

    let experiment = experiments::get(&state.pool, variant.experiment_id).await?;
    Ok(publish_if_running(&state, &experiment).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateInput {
    pub key: String,
    pub name: String,
    pub payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateInput {
    pub id: Uuid,
    pub name: Option<String>,
    #[serde(default)]
    pub payload: Option<Option<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchVariants {
    #[serde(default)]
    pub create: Vec<BatchCreateInput>,
    #[serde(default)]
    pub update: Vec<BatchUpdateInput>,
    #[serde(default)]
    pub delete: Vec<Uuid>,
}

async fn batch(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
    Json(body): Json<BatchVariants>,
) -> Result<(HeaderMap, Json<Vec<Variant>>)> {
    let experiment = experiments::get(&state.pool, experiment_id).await?;

    let updated_ids: std::collections::HashSet<Uuid> = body.update.iter().map(|u| u.id).collect();
    if body.delete.iter().any(|id| updated_ids.contains(id)) {
        return Err(AppError(ServiceError::validation(
            "a variant id cannot appear in both update and delete",
        )));
    }

    let creates: Vec<BatchCreate> = body
        .create
        .iter()
        .map(|c| BatchCreate {
            key: &c.key,
            name: &c.name,
            payload: c.payload.as_ref(),
        })
        .collect();

    let updates: Vec<BatchUpdate> = body
        .update
        .iter()
        .map(|u| BatchUpdate {
            id: u.id,
            name: u.name.as_deref(),
            payload: u.payload.as_ref().map(|p| p.as_ref()),
        })
        .collect();

    let result = variants::apply_batch(&state.pool, experiment_id, &creates, &updates, &body.delete)
        .await?;

    let headers = publish_if_running(&state, &experiment).await;
    Ok((headers, Json(result)))
}

async fn publish_if_running(state: &AppState, experiment: &store::Experiment) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if experiment.status == ExperimentStatus::Running {
        let environment = environments::get(&state.pool, experiment.environment_id).await;
        if let Ok(environment) = environment {
            let outcome = state
                .publish
                .publish_if(true, experiment.environment_id, &environment.name)
                .await;
            outcome.apply_headers(&mut headers);
        }
    }
    headers
}
