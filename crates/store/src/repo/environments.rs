use crate::error::{is_unique_violation, StoreError, StoreResult};
use crate::models::{Environment, PageParams};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create(pool: &PgPool, name: &str) -> StoreResult<Environment> {
    sqlx::query_as::<_, Environment>(
        r#"
        INSERT INTO environments (name)
        VALUES ($1)
        RETURNING id, name, created_at, updated_at
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Conflict(format!("environment name already exists: {name}"))
        } else {
            StoreError::Database(e)
        }
    })
}

pub async fn get(pool: &PgPool, id: Uuid) -> StoreResult<Environment> {
    sqlx::query_as::<_, Environment>(
        "SELECT id, name, created_at, updated_at FROM environments WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound {
        resource: "environment",
        id: id.to_string(),
    })
}

pub async fn get_by_name(pool: &PgPool, name: &str) -> StoreResult<Option<Environment>> {
    Ok(sqlx::query_as::<_, Environment>(
        "SELECT id, name, created_at, updated_at FROM environments WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?)
}

pub async fn list(pool: &PgPool, page: PageParams) -> StoreResult<(Vec<Environment>, i64)> {
    let rows = sqlx::query_as::<_, Environment>(
        r#"
        SELECT id, name, created_at, updated_at
        FROM environments
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM environments")
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}
