use crate::error::StoreResult;
use crate::models::{ConfigVersion, ConfigVersionRow, PageParams};
use flagcore::ConfigSnapshot;
use sqlx::PgPool;
use uuid::Uuid;

/// Next version number for an environment: `max(existing) + 1`, starting
/// at 1 when no version has been published yet.
pub async fn next_version(pool: &PgPool, environment_id: Uuid) -> StoreResult<i64> {
    let max: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(version) FROM config_versions WHERE environment_id = $1",
    )
    .bind(environment_id)
    .fetch_one(pool)
    .await?;

    Ok(max.unwrap_or(0) + 1)
}

/// Append a published snapshot as an immutable audit row. Config versions
/// are never updated or deleted once written.
pub async fn record(
    pool: &PgPool,
    environment_id: Uuid,
    version: i64,
    snapshot: &ConfigSnapshot,
) -> StoreResult<ConfigVersion> {
    let row = sqlx::query_as::<_, ConfigVersionRow>(
        r#"
        INSERT INTO config_versions (environment_id, version, snapshot)
        VALUES ($1, $2, $3)
        RETURNING id, environment_id, version, snapshot, created_at
        "#,
    )
    .bind(environment_id)
    .bind(version)
    .bind(sqlx::types::Json(snapshot))
    .fetch_one(pool)
    .await?;

    Ok(row.into())
}

/// History of published versions for an environment, most recent first.
/// Backs the supplemented `GET /environments/:id/config-versions` endpoint.
pub async fn list(
    pool: &PgPool,
    environment_id: Uuid,
    page: PageParams,
) -> StoreResult<(Vec<ConfigVersion>, i64)> {
    let rows = sqlx::query_as::<_, ConfigVersionRow>(
        r#"
        SELECT id, environment_id, version, snapshot, created_at
        FROM config_versions
        WHERE environment_id = $1
        ORDER BY version DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(environment_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM config_versions WHERE environment_id = $1",
    )
    .bind(environment_id)
    .fetch_one(pool)
    .await?;

    Ok((rows.into_iter().map(ConfigVersion::from).collect(), total))
}

pub async fn latest(pool: &PgPool, environment_id: Uuid) -> StoreResult<Option<ConfigVersion>> {
    let row = sqlx::query_as::<_, ConfigVersionRow>(
        r#"
        SELECT id, environment_id, version, snapshot, created_at
        FROM config_versions
        WHERE environment_id = $1
        ORDER BY version DESC
        LIMIT 1
        "#,
    )
    .bind(environment_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(ConfigVersion::from))
}
