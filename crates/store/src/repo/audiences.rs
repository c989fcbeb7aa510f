use crate::error::{is_unique_violation, StoreError, StoreResult};
use crate::models::{Audience, AudienceRow, PageParams};
use flagcore::TargetingRule;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create(
    pool: &PgPool,
    environment_id: Uuid,
    name: &str,
    rules: &[TargetingRule],
) -> StoreResult<Audience> {
    let row = sqlx::query_as::<_, AudienceRow>(
        r#"
        INSERT INTO audiences (environment_id, name, rules)
        VALUES ($1, $2, $3)
        RETURNING id, environment_id, name, rules, created_at, updated_at
        "#,
    )
    .bind(environment_id)
    .bind(name)
    .bind(sqlx::types::Json(rules))
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Conflict(format!("audience name already exists in environment: {name}"))
        } else {
            StoreError::Database(e)
        }
    })?;

    Ok(row.into())
}

pub async fn get(pool: &PgPool, id: Uuid) -> StoreResult<Audience> {
    let row = sqlx::query_as::<_, AudienceRow>(
        "SELECT id, environment_id, name, rules, created_at, updated_at FROM audiences WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound {
        resource: "audience",
        id: id.to_string(),
    })?;

    Ok(row.into())
}

pub async fn list(
    pool: &PgPool,
    environment_id: Option<Uuid>,
    page: PageParams,
) -> StoreResult<(Vec<Audience>, i64)> {
    let rows = sqlx::query_as::<_, AudienceRow>(
        r#"
        SELECT id, environment_id, name, rules, created_at, updated_at
        FROM audiences
        WHERE ($1::uuid IS NULL OR environment_id = $1)
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(environment_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM audiences WHERE ($1::uuid IS NULL OR environment_id = $1)",
    )
    .bind(environment_id)
    .fetch_one(pool)
    .await?;

    Ok((rows.into_iter().map(Audience::from).collect(), total))
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    name: Option<&str>,
    rules: Option<&[TargetingRule]>,
) -> StoreResult<Audience> {
    let row = sqlx::query_as::<_, AudienceRow>(
        r#"
        UPDATE audiences
        SET name = COALESCE($2, name),
            rules = COALESCE($3, rules),
            updated_at = now()
        WHERE id = $1
        RETURNING id, environment_id, name, rules, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(rules.map(sqlx::types::Json))
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Conflict("audience name already exists in environment".to_string())
        } else {
            StoreError::Database(e)
        }
    })?
    .ok_or(StoreError::NotFound {
        resource: "audience",
        id: id.to_string(),
    })?;

    Ok(row.into())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM audiences WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            resource: "audience",
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Environments whose `RUNNING` experiments reference this audience — used
/// to decide whether an audience mutation/deletion must trigger an implicit
/// publish.
pub async fn running_experiment_count(pool: &PgPool, audience_id: Uuid) -> StoreResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM experiments WHERE audience_id = $1 AND status = 'RUNNING'",
    )
    .bind(audience_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
