use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use flagcore::TargetingRule;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{PageQuery, PaginatedResponse};
use crate::AppState;
use store::{repo::audiences, repo::audit, repo::environments, Audience};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/audiences", post(create).get(list))
        .route(
            "/audiences/:id",
            get(get_one).patch(update).delete(delete_one),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAudience {
    pub environment_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub rules: Vec<TargetingRule>,
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateAudience>,
) -> Result<Json<Audience>> {
    environments::get(&state.pool, body.environment_id).await?;
    let audience = audiences::create(&state.pool, body.environment_id, &body.name, &body.rules).await?;
    Ok(Json(audience))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAudiencesQuery {
    pub environment_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListAudiencesQuery>,
) -> Result<Json<PaginatedResponse<Audience>>> {
    let params = PageQuery {
        page: query.page,
        page_size: query.page_size,
    }
    .resolve()
    .map_err(AppError)?;
    let (data, total) = audiences::list(&state.pool, query.environment_id, params).await?;
    Ok(Json(PaginatedResponse::new(data, params, total)))
}

async fn get_one(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Audience>> {
    let audience = audiences::get(&state.pool, id).await?;
    Ok(Json(audience))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAudience {
    pub name: Option<String>,
    pub rules: Option<Vec<TargetingRule>>,
}

/// `name?`/`rules?` are "not provided" semantics here — audiences don't
/// support nulling a field, unlike experiments/variants.
async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAudience>,
) -> Result<(HeaderMap, Json<Audience>)> {
    let rules_changed = body.rules.is_some();
    let audience = audiences::update(
        &state.pool,
        id,
        body.name.as_deref(),
        body.rules.as_deref(),
    )
    .await?;

    let mut headers = HeaderMap::new();
    if rules_changed {
        audit::record(
            &state.pool,
            "control-plane",
            "audience.rules_changed",
            "audience",
            &audience.id.to_string(),
            None,
        )
        .await?;

        let running = audiences::running_experiment_count(&state.pool, id).await?;
        let environment = environments::get(&state.pool, audience.environment_id).await?;
        let outcome = state
            .publish
            .publish_if(running > 0, audience.environment_id, &environment.name)
            .await;
        outcome.apply_headers(&mut headers);
    }

    Ok((headers, Json(audience)))
}

async fn delete_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<HeaderMap> {
    let audience = audiences::get(&state.pool, id).await?;
    let running = audiences::running_experiment_count(&state.pool, id).await?;
    audiences::delete(&state.pool, id).await?;

    audit::record(
        &state.pool,
        "control-plane",
        "audience.deleted",
        "audience",
        &id.to_string(),
        None,
    )
    .await?;

    let environment = environments::get(&state.pool, audience.environment_id).await?;
    let outcome = state
        .publish
        .publish_if(running > 0, audience.environment_id, &environment.name)
        .await;

    let mut headers = HeaderMap::new();
    outcome.apply_headers(&mut headers);
    Ok(headers)
}
