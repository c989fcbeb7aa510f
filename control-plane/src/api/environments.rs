use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{PageQuery, PaginatedResponse};
use crate::AppState;
use store::{repo::environments, Environment};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/environments", post(create).get(list))
        .route("/environments/:id", get(get_one))
}

#[derive(Debug, Deserialize)]
pub struct CreateEnvironment {
    pub name: String,
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateEnvironment>,
) -> Result<Json<Environment>> {
    let environment = environments::create(&state.pool, &body.name).await?;
    Ok(Json(environment))
}

async fn list(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<Environment>>> {
    let params = page.resolve().map_err(AppError)?;
    let (data, total) = environments::list(&state.pool, params).await?;
    Ok(Json(PaginatedResponse::new(data, params, total)))
}

async fn get_one(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Environment>> {
    let environment = environments::get(&state.pool, id).await?;
    Ok(Json(environment))
}
