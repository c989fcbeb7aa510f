use crate::error::{is_unique_violation, StoreError, StoreResult};
use crate::models::{Variant, VariantRow};
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

pub async fn create(
    pool: &PgPool,
    experiment_id: Uuid,
    key: &str,
    name: &str,
    payload: Option<&Value>,
) -> StoreResult<Variant> {
    let row = sqlx::query_as::<_, VariantRow>(
        r#"
        INSERT INTO variants (experiment_id, key, name, payload)
        VALUES ($1, $2, $3, $4)
        RETURNING id, experiment_id, key, name, payload
        "#,
    )
    .bind(experiment_id)
    .bind(key)
    .bind(name)
    .bind(payload.map(sqlx::types::Json))
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::Conflict(format!("variant key already exists in experiment: {key}"))
        } else {
            StoreError::Database(e)
        }
    })?;

    Ok(row.into())
}

pub async fn get(pool: &PgPool, id: Uuid) -> StoreResult<Variant> {
    let row = sqlx::query_as::<_, VariantRow>(
        "SELECT id, experiment_id, key, name, payload FROM variants WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound {
        resource: "variant",
        id: id.to_string(),
    })?;

    Ok(row.into())
}

pub async fn by_experiment(pool: &PgPool, experiment_id: Uuid) -> StoreResult<Vec<Variant>> {
    let rows = sqlx::query_as::<_, VariantRow>(
        "SELECT id, experiment_id, key, name, payload FROM variants WHERE experiment_id = $1",
    )
    .bind(experiment_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Variant::from).collect())
}

pub async fn by_experiment_ids(pool: &PgPool, experiment_ids: &[Uuid]) -> StoreResult<Vec<Variant>> {
    let rows = sqlx::query_as::<_, VariantRow>(
        "SELECT id, experiment_id, key, name, payload FROM variants WHERE experiment_id = ANY($1)",
    )
    .bind(experiment_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Variant::from).collect())
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    name: Option<&str>,
    payload: Option<Option<&Value>>,
) -> StoreResult<Variant> {
    let payload_set = payload.is_some();
    let payload_value = payload.flatten();

    let row = sqlx::query_as::<_, VariantRow>(
        r#"
        UPDATE variants
        SET name = COALESCE($2, name),
            payload = CASE WHEN $3 THEN $4 ELSE payload END
        WHERE id = $1
        RETURNING id, experiment_id, key, name, payload
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(payload_set)
    .bind(payload_value.map(sqlx::types::Json))
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound {
        resource: "variant",
        id: id.to_string(),
    })?;

    Ok(row.into())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM variants WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            resource: "variant",
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Input for the batch variant endpoint (`{ create[], update[], delete[] }`).
pub struct BatchCreate<'a> {
    pub key: &'a str,
    pub name: &'a str,
    pub payload: Option<&'a Value>,
}

pub struct BatchUpdate<'a> {
    pub id: Uuid,
    pub name: Option<&'a str>,
    pub payload: Option<Option<&'a Value>>,
}

/// Apply a batch of variant creates/updates/deletes as one transaction.
///
/// The caller must already have rejected any id appearing in both `update`
/// and `delete` — this function assumes that validation already happened
/// and simply executes the three phases in order (delete, update, create)
/// inside one transaction.
pub async fn apply_batch(
    pool: &PgPool,
    experiment_id: Uuid,
    creates: &[BatchCreate<'_>],
    updates: &[BatchUpdate<'_>],
    deletes: &[Uuid],
) -> StoreResult<Vec<Variant>> {
    let mut tx: Transaction<'_, Postgres> = pool.begin().await?;

    for id in deletes {
        sqlx::query("DELETE FROM variants WHERE id = $1 AND experiment_id = $2")
            .bind(id)
            .bind(experiment_id)
            .execute(&mut *tx)
            .await?;
    }

    for update in updates {
        let payload_set = update.payload.is_some();
        let payload_value = update.payload.flatten();
        let result = sqlx::query(
            r#"
            UPDATE variants
            SET name = COALESCE($2, name),
                payload = CASE WHEN $3 THEN $4 ELSE payload END
            WHERE id = $1 AND experiment_id = $5
            "#,
        )
        .bind(update.id)
        .bind(update.name)
        .bind(payload_set)
        .bind(payload_value.map(sqlx::types::Json))
        .bind(experiment_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                resource: "variant",
                id: update.id.to_string(),
            });
        }
    }

    for create in creates {
        sqlx::query(
            r#"
            INSERT INTO variants (experiment_id, key, name, payload)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(experiment_id)
        .bind(create.key)
        .bind(create.name)
        .bind(create.payload.map(sqlx::types::Json))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!(
                    "variant key already exists in experiment: {}",
                    create.key
                ))
            } else {
                StoreError::Database(e)
            }
        })?;
    }

    tx.commit().await?;

    by_experiment(pool, experiment_id).await
}
