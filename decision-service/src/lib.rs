pub mod config;
pub mod config_store;
pub mod error;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use error_types::ServiceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::config_store::ConfigStore;
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct AppState {
    pub store: ConfigStore,
}

/// Builds the app's `Router` without binding a listener, so integration
/// tests can drive it in-process via `tower::ServiceExt::oneshot`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/decide", get(decide))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct DecideQuery {
    user_key: Option<String>,
    env: Option<String>,
    context: Option<String>,
}

/// Field names are snake_case, not camelCase — the decision HTTP surface
/// uses a different casing convention than the control-plane entity JSON.
#[derive(Debug, Serialize)]
struct DecideResponse {
    user_key: String,
    environment: String,
    config_version: u64,
    assignments: Vec<flagcore::Assignment>,
}

/// Parse and validate the raw query params. Pulled out of the handler so it
/// can be unit tested without a running object store.
fn parse_decide_query(query: DecideQuery) -> Result<(String, String, Value)> {
    let user_key = query
        .user_key
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError(ServiceError::validation("user_key is required")))?;
    let env = query
        .env
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError(ServiceError::validation("env is required")))?;

    let context: Value = match query.context {
        Some(raw) if !raw.is_empty() => serde_json::from_str(&raw)
            .map_err(|e| AppError(ServiceError::validation(format!("context is not valid JSON: {e}"))))?,
        _ => Value::Object(Default::default()),
    };

    Ok((user_key, env, context))
}

async fn decide(State(state): State<AppState>, Query(query): Query<DecideQuery>) -> Result<Json<DecideResponse>> {
    let (user_key, env, context) = parse_decide_query(query)?;

    let snapshot = state.store.get_or_load(&env).await?;
    let assignments = flagcore::assign(&snapshot.experiments, &user_key, &context);

    Ok(Json(DecideResponse {
        user_key,
        environment: env,
        config_version: snapshot.version,
        assignments,
    }))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    config_versions: std::collections::HashMap<String, Option<u64>>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        config_versions: state.store.versions(),
    })
}
