use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flagcore::{assign, ConfigExperiment, SnapshotAllocation, SnapshotVariant};
use serde_json::json;

fn two_arm_experiment(i: usize) -> ConfigExperiment {
    ConfigExperiment {
        id: format!("exp-{i}"),
        key: format!("exp-{i}-key"),
        salt: format!("salt-{i}"),
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

fn bench_assign(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign");

    for experiment_count in [1, 10, 100].iter() {
        let experiments: Vec<ConfigExperiment> = (0..*experiment_count).map(two_arm_experiment).collect();
        let context = json!({});

        group.bench_with_input(
            format!("{experiment_count}_experiments"),
            &experiments,
            |b, experiments| {
                b.iter(|| assign(black_box(experiments), black_box("user-1"), black_box(&context)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_assign);
criterion_main!(benches);
