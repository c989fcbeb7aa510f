pub mod error;
pub mod models;
pub mod repo;

pub use error::{StoreError, StoreResult};
pub use models::*;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connects to Postgres and applies any pending migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("../../migrations").run(&pool).await?;

    tracing::info!("connected to control-plane database and applied migrations");

    Ok(pool)
}
