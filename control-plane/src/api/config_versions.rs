use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{PageQuery, PaginatedResponse};
use crate::AppState;
use store::{repo::config_versions, repo::environments, ConfigVersion};

pub fn routes() -> Router<AppState> {
    Router::new().route("/environments/:id/config-versions", get(list))
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConfigVersionsQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

async fn list(
    State(state): State<AppState>,
    Path(environment_id): Path<Uuid>,
    Query(query): Query<ListConfigVersionsQuery>,
) -> Result<Json<PaginatedResponse<ConfigVersion>>> {
    environments::get(&state.pool, environment_id).await?;

    let params = PageQuery {
        page: query.page,
        page_size: query.page_size,
    }
    .resolve()
    .map_err(AppError)?;

    let (data, total) = config_versions::list(&state.pool, environment_id, params).await?;
    Ok(Json(PaginatedResponse::new(data, params, total)))
}
