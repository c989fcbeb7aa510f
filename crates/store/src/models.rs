//! Row types for the control plane's relational store. These are the
//! editable, normalized shapes; [`flagcore::snapshot`] holds the compiled,
//! read-optimised projection the publisher builds from them.

use chrono::{DateTime, Utc};
use flagcore::TargetingRule;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "experiment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ExperimentStatus {
    Draft,
    Running,
    Paused,
    Archived,
}

impl ExperimentStatus {
    /// `ARCHIVED` is terminal; every other state can still move.
    pub fn can_transition_to(&self, next: &ExperimentStatus) -> bool {
        use ExperimentStatus::*;
        matches!(
            (self, next),
            (Draft, Running)
                | (Draft, Archived)
                | (Running, Paused)
                | (Running, Archived)
                | (Paused, Running)
                | (Paused, Archived)
        )
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AudienceRow {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub name: String,
    pub rules: sqlx::types::Json<Vec<TargetingRule>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Audience {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub name: String,
    pub rules: Vec<TargetingRule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AudienceRow> for Audience {
    fn from(row: AudienceRow) -> Self {
        Self {
            id: row.id,
            environment_id: row.environment_id,
            name: row.name,
            rules: row.rules.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ExperimentRow {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub salt: String,
    pub status: ExperimentStatus,
    pub audience_id: Option<Uuid>,
    pub targeting_rules: sqlx::types::Json<Vec<TargetingRule>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub salt: String,
    pub status: ExperimentStatus,
    pub audience_id: Option<Uuid>,
    pub targeting_rules: Vec<TargetingRule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ExperimentRow> for Experiment {
    fn from(row: ExperimentRow) -> Self {
        Self {
            id: row.id,
            environment_id: row.environment_id,
            key: row.key,
            name: row.name,
            description: row.description,
            salt: row.salt,
            status: row.status,
            audience_id: row.audience_id,
            targeting_rules: row.targeting_rules.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct VariantRow {
    pub id: Uuid,
    pub experiment_id: Uuid,
    pub key: String,
    pub name: String,
    pub payload: Option<sqlx::types::Json<serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: Uuid,
    pub experiment_id: Uuid,
    pub key: String,
    pub name: String,
    pub payload: Option<serde_json::Value>,
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Self {
            id: row.id,
            experiment_id: row.experiment_id,
            key: row.key,
            name: row.name,
            payload: row.payload.map(|p| p.0),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub id: Uuid,
    pub experiment_id: Uuid,
    pub variant_id: Uuid,
    pub range_start: i32,
    pub range_end: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct ConfigVersionRow {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub version: i64,
    pub snapshot: sqlx::types::Json<flagcore::ConfigSnapshot>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigVersion {
    pub id: Uuid,
    pub environment_id: Uuid,
    pub version: i64,
    pub snapshot: flagcore::ConfigSnapshot,
    pub created_at: DateTime<Utc>,
}

impl From<ConfigVersionRow> for ConfigVersion {
    fn from(row: ConfigVersionRow) -> Self {
        Self {
            id: row.id,
            environment_id: row.environment_id,
            version: row.version,
            snapshot: row.snapshot.0,
            created_at: row.created_at,
        }
    }
}

/// A fully-loaded experiment, used by the publisher to compile a
/// [`flagcore::ConfigExperiment`] without N+1 queries per field.
#[derive(Debug, Clone)]
pub struct ExperimentWithChildren {
    pub experiment: Experiment,
    pub audience_rules: Vec<TargetingRule>,
    pub variants: Vec<Variant>,
    pub allocations: Vec<Allocation>,
}

/// Page parameters shared by every list endpoint. Defaults and bounds are
/// enforced at the HTTP boundary (control-plane/src/models/pagination.rs);
/// by the time a query reaches the store, page/page_size are already valid.
#[derive(Debug, Clone, Copy)]
pub struct PageParams {
    pub page: u32,
    pub page_size: u32,
}

impl PageParams {
    pub fn offset(&self) -> i64 {
        ((self.page - 1) as i64) * self.page_size as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transition_table() {
        use ExperimentStatus::*;
        assert!(Draft.can_transition_to(&Running));
        assert!(Draft.can_transition_to(&Archived));
        assert!(Running.can_transition_to(&Paused));
        assert!(Running.can_transition_to(&Archived));
        assert!(Paused.can_transition_to(&Running));
        assert!(Paused.can_transition_to(&Archived));

        assert!(!Draft.can_transition_to(&Paused));
        assert!(!Archived.can_transition_to(&Draft));
        assert!(!Archived.can_transition_to(&Running));
        assert!(!Running.can_transition_to(&Draft));
    }

    #[test]
    fn page_params_offset_and_limit() {
        let p = PageParams {
            page: 3,
            page_size: 20,
        };
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }
}
