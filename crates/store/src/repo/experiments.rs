use crate::error::{is_unique_violation, StoreError, StoreResult};
use crate::models::{Experiment, ExperimentRow, ExperimentStatus, PageParams};
use flagcore::TargetingRule;
use sqlx::PgPool;
use uuid::Uuid;

#[allow(clippy::too_many_arguments)]
pub async fn create(
    pool: &PgPool,
    environment_id: Uuid,
    key: &str,
    name: &str,
    description: Option<&str>,
    salt: &str,
    audience_id: Option<Uuid>,
    targeting_rules: &[TargetingRule],
) -> StoreResult<Experiment> {
    let row = sqlx::query_as::<_, ExperimentRow>(
        r#"
        INSERT INTO experiments
            (environment_id, key, name, description, salt, status, audience_id, targeting_rules)
        VALUES ($1, $2, $3, $4, $5, 'DRAFT', $6, $7)
        RETURNING id, environment_id, key, name, description, salt, status, audience_id,
                  targeting_rules, created_at, updated_at
        "#,
    )
    .bind(environment_id)
    .bind(key)
    .bind(name)
    .bind(description)
    .bind(salt)
    .bind(audience_id)
    .bind(sqlx::types::Json(targeting_rules))
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Conflict(format!("experiment key already exists in environment: {key}"))
        } else {
            StoreError::Database(e)
        }
    })?;

    Ok(row.into())
}

pub async fn get(pool: &PgPool, id: Uuid) -> StoreResult<Experiment> {
    let row = sqlx::query_as::<_, ExperimentRow>(
        r#"
        SELECT id, environment_id, key, name, description, salt, status, audience_id,
               targeting_rules, created_at, updated_at
        FROM experiments WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound {
        resource: "experiment",
        id: id.to_string(),
    })?;

    Ok(row.into())
}

pub async fn list(
    pool: &PgPool,
    environment_id: Option<Uuid>,
    status: Option<ExperimentStatus>,
    page: PageParams,
) -> StoreResult<(Vec<Experiment>, i64)> {
    let rows = sqlx::query_as::<_, ExperimentRow>(
        r#"
        SELECT id, environment_id, key, name, description, salt, status, audience_id,
               targeting_rules, created_at, updated_at
        FROM experiments
        WHERE ($1::uuid IS NULL OR environment_id = $1)
          AND ($2::experiment_status IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(environment_id)
    .bind(status.clone())
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM experiments
        WHERE ($1::uuid IS NULL OR environment_id = $1)
          AND ($2::experiment_status IS NULL OR status = $2)
        "#,
    )
    .bind(environment_id)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok((rows.into_iter().map(Experiment::from).collect(), total))
}

pub async fn update_metadata(
    pool: &PgPool,
    id: Uuid,
    name: Option<&str>,
    description: Option<Option<&str>>,
    audience_id: Option<Option<Uuid>>,
    targeting_rules: Option<&[TargetingRule]>,
) -> StoreResult<Experiment> {
    // `description`/`audience_id` use a double Option so "not provided" can
    // be distinguished from "explicitly set to null".
    let description_set = description.is_some();
    let description_value = description.flatten();
    let audience_set = audience_id.is_some();
    let audience_value = audience_id.flatten();

    let row = sqlx::query_as::<_, ExperimentRow>(
        r#"
        UPDATE experiments
        SET name = COALESCE($2, name),
            description = CASE WHEN $3 THEN $4 ELSE description END,
            audience_id = CASE WHEN $5 THEN $6 ELSE audience_id END,
            targeting_rules = COALESCE($7, targeting_rules),
            updated_at = now()
        WHERE id = $1
        RETURNING id, environment_id, key, name, description, salt, status, audience_id,
                  targeting_rules, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(description_set)
    .bind(description_value)
    .bind(audience_set)
    .bind(audience_value)
    .bind(targeting_rules.map(sqlx::types::Json))
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound {
        resource: "experiment",
        id: id.to_string(),
    })?;

    Ok(row.into())
}

pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    status: ExperimentStatus,
) -> StoreResult<Experiment> {
    let row = sqlx::query_as::<_, ExperimentRow>(
        r#"
        UPDATE experiments
        SET status = $2, updated_at = now()
        WHERE id = $1
        RETURNING id, environment_id, key, name, description, salt, status, audience_id,
                  targeting_rules, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(status)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound {
        resource: "experiment",
        id: id.to_string(),
    })?;

    Ok(row.into())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM experiments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            resource: "experiment",
            id: id.to_string(),
        });
    }
    Ok(())
}

/// All experiments with status `RUNNING` in an environment, for snapshot
/// compilation. Children (variants/allocations/audience rules) are loaded
/// separately by the publisher via `variants::by_experiment_ids` etc.
pub async fn list_running(pool: &PgPool, environment_id: Uuid) -> StoreResult<Vec<Experiment>> {
    let rows = sqlx::query_as::<_, ExperimentRow>(
        r#"
        SELECT id, environment_id, key, name, description, salt, status, audience_id,
               targeting_rules, created_at, updated_at
        FROM experiments
        WHERE environment_id = $1 AND status = 'RUNNING'
        ORDER BY created_at ASC
        "#,
    )
    .bind(environment_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Experiment::from).collect())
}
