//! The compiled, immutable artifact the decision side evaluates against.
//!
//! Shapes here are wire-stable — the same JSON bytes feed decision nodes
//! and SDK consumers, so field names are fixed with
//! `rename_all = "camelCase"` rather than left to derive defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single condition inside a [`TargetingRule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingCondition {
    pub attribute: String,
    pub operator: Operator,
    pub value: serde_json::Value,
}

/// Comparison operators understood by the rule evaluator.
///
/// Any operator string the evaluator doesn't recognize deserializes into
/// [`Operator::Unknown`] rather than failing — the snapshot is trusted but
/// forward-compatible, and an unknown operator always evaluates to `false`
/// rather than raising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Eq,
    Neq,
    In,
    NotIn,
    Contains,
    Gt,
    Lt,
    #[serde(other)]
    Unknown,
}

/// AND of conditions. An empty `conditions` list matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetingRule {
    #[serde(default)]
    pub conditions: Vec<TargetingCondition>,
}

/// A variant as it appears inside a compiled snapshot: just enough to
/// resolve an allocation's `variant_id` into a key + payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotVariant {
    pub id: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

/// A bucket range mapped to one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotAllocation {
    pub variant_id: String,
    pub range_start: u32,
    pub range_end: u32,
}

impl SnapshotAllocation {
    pub fn contains(&self, b: u32) -> bool {
        self.range_start <= b && b <= self.range_end
    }
}

/// A pre-indexed, read-optimised projection of a running experiment.
/// Audience rules are materialised here at compile time so the decision
/// side never has to dereference an `audienceId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigExperiment {
    pub id: String,
    pub key: String,
    pub salt: String,
    #[serde(default)]
    pub audience_rules: Vec<TargetingRule>,
    #[serde(default)]
    pub targeting_rules: Vec<TargetingRule>,
    pub variants: Vec<SnapshotVariant>,
    pub allocations: Vec<SnapshotAllocation>,
}

/// The published config artifact: `{ version, environment, publishedAt, experiments }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub version: u64,
    pub environment: String,
    pub published_at: DateTime<Utc>,
    pub experiments: Vec<ConfigExperiment>,
}

/// `version.json`'s body: `{ "version": <int> }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VersionIndex {
    pub version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_operator_deserializes_without_error() {
        let json = r#"{"attribute":"a","operator":"startsWith","value":"x"}"#;
        let cond: TargetingCondition = serde_json::from_str(json).unwrap();
        assert_eq!(cond.operator, Operator::Unknown);
    }

    #[test]
    fn snapshot_round_trips_camel_case_fields() {
        let snapshot = ConfigSnapshot {
            version: 3,
            environment: "prod".into(),
            published_at: Utc::now(),
            experiments: vec![ConfigExperiment {
                id: "exp-1".into(),
                key: "exp-key".into(),
                salt: "s".into(),
                audience_rules: vec![],
                targeting_rules: vec![],
                variants: vec![SnapshotVariant {
                    id: "v1".into(),
                    key: "control".into(),
                    payload: None,
                }],
                allocations: vec![SnapshotAllocation {
                    variant_id: "v1".into(),
                    range_start: 0,
                    range_end: 9999,
                }],
            }],
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("publishedAt").is_some());
        assert!(json["experiments"][0].get("audienceRules").is_some());
        assert!(json["experiments"][0]["allocations"][0]
            .get("variantId")
            .is_some());

        let round_tripped: ConfigSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(round_tripped, snapshot);
    }
}
