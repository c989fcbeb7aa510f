use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::put;
use axum::{Json, Router};
use error_types::ServiceError;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::AppState;
use store::{
    repo::{
        allocations::{self, AllocationInput},
        environments, experiments,
    },
    Allocation, ExperimentStatus,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/experiments/:id/allocations", put(replace))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationEntry {
    pub variant_id: Uuid,
    pub range_start: i32,
    pub range_end: i32,
}

async fn replace(
    State(state): State<AppState>,
    Path(experiment_id): Path<Uuid>,
    Json(body): Json<Vec<AllocationEntry>>,
) -> Result<(HeaderMap, Json<Vec<Allocation>>)> {
    let experiment = experiments::get(&state.pool, experiment_id).await?;

    let inputs: Vec<AllocationInput> = body
        .into_iter()
        .map(|entry| AllocationInput {
            variant_id: entry.variant_id,
            range_start: entry.range_start,
            range_end: entry.range_end,
        })
        .collect();

    allocations::validate_ranges(&inputs)
        .map_err(|msg| AppError(ServiceError::validation(msg)))?;

    let result = allocations::replace_all(&state.pool, experiment_id, &inputs).await?;

    let mut headers = HeaderMap::new();
    if experiment.status == ExperimentStatus::Running {
        let environment = environments::get(&state.pool, experiment.environment_id).await?;
        let outcome = state
            .publish
            .publish_if(true, experiment.environment_id, &environment.name)
            .await;
        outcome.apply_headers(&mut headers);
    }

    Ok((headers, Json(result)))
}
