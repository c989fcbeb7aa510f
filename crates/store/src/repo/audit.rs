use crate::error::StoreResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub details: Option<sqlx::types::Json<Value>>,
    pub created_at: DateTime<Utc>,
}

/// Record an administrative action: one append-only row per mutation,
/// actor taken from the correlation-id/auth context (here, just a
/// free-form string since the platform has no auth surface of its own).
pub async fn record(
    pool: &PgPool,
    actor: &str,
    action: &str,
    resource_type: &str,
    resource_id: &str,
    details: Option<&Value>,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (actor, action, resource_type, resource_id, details)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(actor)
    .bind(action)
    .bind(resource_type)
    .bind(resource_id)
    .bind(details.map(sqlx::types::Json))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn by_resource(
    pool: &PgPool,
    resource_type: &str,
    resource_id: &str,
) -> StoreResult<Vec<AuditLogEntry>> {
    Ok(sqlx::query_as::<_, AuditLogEntry>(
        r#"
        SELECT id, actor, action, resource_type, resource_id, details, created_at
        FROM audit_log
        WHERE resource_type = $1 AND resource_id = $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(resource_type)
    .bind(resource_id)
    .fetch_all(pool)
    .await?)
}
