mod allocations;
mod audiences;
mod config_versions;
mod environments;
mod experiments;
mod variants;

use axum::Router;

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(environments::routes())
        .merge(audiences::routes())
        .merge(experiments::routes())
        .merge(variants::routes())
        .merge(allocations::routes())
        .merge(config_versions::routes())
}
