//! Turns the control plane's normalized rows into the compiled,
//! read-optimised [`flagcore::ConfigSnapshot`] the decision side evaluates.

use chrono::Utc;
use flagcore::{ConfigExperiment, ConfigSnapshot, SnapshotAllocation, SnapshotVariant};
use std::collections::HashMap;
use store::{Allocation, Audience, Experiment, Variant};

/// Compile a snapshot for one environment from its `RUNNING` experiments and
/// their loaded children. Callers are responsible for having already
/// restricted `experiments` to `RUNNING` status — only running experiments
/// are compiled into a published snapshot.
pub fn compile_snapshot(
    environment_name: &str,
    version: u64,
    experiments: &[Experiment],
    audiences_by_id: &HashMap<uuid::Uuid, Audience>,
    variants_by_experiment: &HashMap<uuid::Uuid, Vec<Variant>>,
    allocations_by_experiment: &HashMap<uuid::Uuid, Vec<Allocation>>,
) -> ConfigSnapshot {
    let compiled = experiments
        .iter()
        .map(|experiment| {
            let audience_rules = experiment
                .audience_id
                .and_then(|id| audiences_by_id.get(&id))
                .map(|audience| audience.rules.clone())
                .unwrap_or_default();

            let variants = variants_by_experiment
                .get(&experiment.id)
                .cloned()
                .unwrap_or_default();

            let snapshot_variants: Vec<SnapshotVariant> = variants
                .iter()
                .map(|v| SnapshotVariant {
                    id: v.id.to_string(),
                    key: v.key.clone(),
                    payload: v.payload.clone(),
                })
                .collect();

            let known_variant_ids: std::collections::HashSet<String> =
                variants.iter().map(|v| v.id.to_string()).collect();

            let allocations: Vec<SnapshotAllocation> = allocations_by_experiment
                .get(&experiment.id)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .filter(|a| {
                    let variant_id = a.variant_id.to_string();
                    if !known_variant_ids.contains(&variant_id) {
                        tracing::warn!(
                            experiment_id = %experiment.id,
                            variant_id = %variant_id,
                            "dropping allocation referencing unknown variant during publish"
                        );
                        return false;
                    }
                    true
                })
                .map(|a| SnapshotAllocation {
                    variant_id: a.variant_id.to_string(),
                    range_start: a.range_start as u32,
                    range_end: a.range_end as u32,
                })
                .collect();

            ConfigExperiment {
                id: experiment.id.to_string(),
                key: experiment.key.clone(),
                salt: experiment.salt.clone(),
                audience_rules,
                targeting_rules: experiment.targeting_rules.clone(),
                variants: snapshot_variants,
                allocations,
            }
        })
        .collect();

    ConfigSnapshot {
        version,
        environment: environment_name.to_string(),
        published_at: Utc::now(),
        experiments: compiled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flagcore::TargetingRule;
    use store::ExperimentStatus;
    use uuid::Uuid;

    fn experiment(id: Uuid) -> Experiment {
        Experiment {
            id,
            environment_id: Uuid::new_v4(),
            key: "exp-key".into(),
            name: "Exp".into(),
            description: None,
            salt: "salt".into(),
            status: ExperimentStatus::Running,
            audience_id: None,
            targeting_rules: vec![TargetingRule::default()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn dangling_allocation_is_dropped_not_fatal() {
        let exp_id = Uuid::new_v4();
        let exp = experiment(exp_id);
        let variant_id = Uuid::new_v4();
        let dangling_id = Uuid::new_v4();

        let variants = vec![Variant {
            id: variant_id,
            experiment_id: exp_id,
            key: "control".into(),
            name: "Control".into(),
            payload: None,
        }];

        let allocations = vec![
            Allocation {
                id: Uuid::new_v4(),
                experiment_id: exp_id,
                variant_id,
                range_start: 0,
                range_end: 4999,
            },
            Allocation {
                id: Uuid::new_v4(),
                experiment_id: exp_id,
                variant_id: dangling_id,
                range_start: 5000,
                range_end: 9999,
            },
        ];

        let mut variants_by_experiment = HashMap::new();
        variants_by_experiment.insert(exp_id, variants);
        let mut allocations_by_experiment = HashMap::new();
        allocations_by_experiment.insert(exp_id, allocations);

        let snapshot = compile_snapshot(
            "prod",
            1,
            &[exp],
            &HashMap::new(),
            &variants_by_experiment,
            &allocations_by_experiment,
        );

        assert_eq!(snapshot.experiments[0].allocations.len(), 1);
        assert_eq!(snapshot.experiments[0].allocations[0].variant_id, variant_id.to_string());
    }
}
