//! Composes audience rules, per-experiment targeting rules, bucketing and
//! allocation lookup into the list of variant assignments for one user.

use crate::bucket::bucket;
use crate::evaluator::evaluate;
use crate::snapshot::ConfigExperiment;
use serde::Serialize;
use serde_json::Value;

/// One resolved variant assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub experiment_key: String,
    pub experiment_id: String,
    pub variant_key: String,
    pub variant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Evaluate every experiment in `experiments` against `(user_key, context)`
/// and return the assignments that survive, in snapshot order.
///
/// Per experiment:
/// 1. Audience rules must pass, else skip.
/// 2. Targeting rules must pass, else skip.
/// 3. Bucket the user with the experiment's salt.
/// 4. Find the allocation covering that bucket; a holdout (no allocation)
///    skips the experiment.
/// 5. Resolve the variant; a dangling `variantId` (data integrity issue)
///    skips the experiment silently rather than erroring.
pub fn assign(experiments: &[ConfigExperiment], user_key: &str, context: &Value) -> Vec<Assignment> {
    let mut assignments = Vec::new();

    for experiment in experiments {
        if !evaluate(&experiment.audience_rules, context) {
            continue;
        }
        if !evaluate(&experiment.targeting_rules, context) {
            continue;
        }

        let b = bucket(user_key, &experiment.salt);

        let Some(allocation) = experiment.allocations.iter().find(|a| a.contains(b)) else {
            continue;
        };

        let Some(variant) = experiment
            .variants
            .iter()
            .find(|v| v.id == allocation.variant_id)
        else {
            tracing::warn!(
                experiment_id = %experiment.id,
                variant_id = %allocation.variant_id,
                "allocation references a variant not present in the experiment; skipping"
            );
            continue;
        };

        assignments.push(Assignment {
            experiment_key: experiment.key.clone(),
            experiment_id: experiment.id.clone(),
            variant_key: variant.key.clone(),
            variant_id: variant.id.clone(),
            payload: variant.payload.clone(),
        });
    }

    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{SnapshotAllocation, SnapshotVariant, TargetingCondition, TargetingRule};
    use serde_json::json;

    fn two_arm_experiment(id: &str, salt: &str) -> ConfigExperiment {
        ConfigExperiment {
            id: id.into(),
            key: format!("{id}-key"),
            salt: salt.into(),
            audience_rules: vec![],
            targeting_rules: vec![],
            variants: vec![
                SnapshotVariant {
                    id: "v-control".into(),
                    key: "control".into(),
                    payload: Some(json!({"color": "blue"})),
                },
                SnapshotVariant {
                    id: "v-treatment".into(),
                    key: "treatment".into(),
                    payload: Some(json!({"color": "green"})),
                },
            ],
            allocations: vec![
                SnapshotAllocation {
                    variant_id: "v-control".into(),
                    range_start: 0,
                    range_end: 4999,
                },
                SnapshotAllocation {
                    variant_id: "v-treatment".into(),
                    range_start: 5000,
                    range_end: 9999,
                },
            ],
        }
    }

    #[test]
    fn empty_experiment_list_yields_empty_result() {
        assert!(assign(&[], "user-1", &json!({})).is_empty());
    }

    #[test]
    fn audience_failure_blocks_assignment_regardless_of_targeting() {
        let mut experiment = two_arm_experiment("exp-1", "salt-1");
        experiment.audience_rules = vec![TargetingRule {
            conditions: vec![TargetingCondition {
                attribute: "country".into(),
                operator: crate::snapshot::Operator::Eq,
                value: json!("US"),
            }],
        }];
        let result = assign(&[experiment], "user-1", &json!({"country": "CA"}));
        assert!(result.is_empty());
    }

    #[test]
    fn audience_pass_targeting_fail_blocks_assignment() {
        let mut experiment = two_arm_experiment("exp-1", "salt-1");
        experiment.targeting_rules = vec![TargetingRule {
            conditions: vec![TargetingCondition {
                attribute: "plan".into(),
                operator: crate::snapshot::Operator::Eq,
                value: json!("pro"),
            }],
        }];
        let result = assign(&[experiment], "user-1", &json!({"plan": "free"}));
        assert!(result.is_empty());
    }

    #[test]
    fn bucket_in_range_yields_single_assignment_with_payload() {
        let experiment = two_arm_experiment("exp-1", "salt-1");
        let b = bucket("user-1", "salt-1");
        let result = assign(&[experiment], "user-1", &json!({}));
        assert_eq!(result.len(), 1);
        let expected_key = if b <= 4999 { "control" } else { "treatment" };
        assert_eq!(result[0].variant_key, expected_key);
        assert!(result[0].payload.is_some());
    }

    #[test]
    fn holdout_yields_no_assignment() {
        let mut experiment = two_arm_experiment("exp-1", "salt-1");
        experiment.allocations = vec![SnapshotAllocation {
            variant_id: "v-control".into(),
            range_start: 0,
            range_end: 4999,
        }];

        let mut saw_holdout = false;
        for i in 0..200 {
            let user = format!("user-{i}");
            let b = bucket(&user, "salt-1");
            let result = assign(&[experiment.clone()], &user, &json!({}));
            if b > 4999 {
                saw_holdout = true;
                assert!(result.is_empty());
            } else {
                assert_eq!(result.len(), 1);
            }
        }
        assert!(saw_holdout, "test fixture should exercise a holdout bucket");
    }

    #[test]
    fn dangling_variant_reference_skips_silently() {
        let mut experiment = two_arm_experiment("exp-1", "salt-1");
        experiment.allocations = vec![SnapshotAllocation {
            variant_id: "does-not-exist".into(),
            range_start: 0,
            range_end: 9999,
        }];
        assert!(assign(&[experiment], "user-1", &json!({})).is_empty());
    }

    #[test]
    fn assignment_order_follows_snapshot_order() {
        let e1 = two_arm_experiment("exp-1", "salt-1");
        let e2 = two_arm_experiment("exp-2", "salt-2");
        let result = assign(&[e1, e2], "user-1", &json!({}));
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].experiment_id, "exp-1");
        assert_eq!(result[1].experiment_id, "exp-2");
    }
}
