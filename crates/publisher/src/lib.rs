//! Compiles and publishes config snapshots.
//!
//! A publish reads every `RUNNING` experiment in an environment plus their
//! variants/allocations/audience rules, compiles a [`flagcore::ConfigSnapshot`],
//! writes it to the object store at three keys, and appends an audit row.

pub mod compile;
pub mod error;

pub use error::{PublishError, PublishResult};

use compile::compile_snapshot;
use objectstore::{latest_key, snapshot_key, version_key, ObjectStoreClient};
use sqlx::PgPool;
use std::collections::HashMap;
use store::repo::{allocations, audiences, config_versions, experiments, variants};
use uuid::Uuid;

#[derive(Clone)]
pub struct Publisher {
    pool: PgPool,
    objects: ObjectStoreClient,
}

impl Publisher {
    pub fn new(pool: PgPool, objects: ObjectStoreClient) -> Self {
        Self { pool, objects }
    }

    /// Compile and publish the next version for `environment_id`. Returns the
    /// published version number.
    ///
    /// Object-store writes are not cross-object transactional: each of the
    /// three keys is written independently, guarded against regressing
    /// `latest.json`/`version.json` behind a version that has already been
    /// published by a racing publish.
    pub async fn publish(
        &self,
        environment_id: Uuid,
        environment_name: &str,
    ) -> PublishResult<u64> {
        let running = experiments::list_running(&self.pool, environment_id).await?;
        let experiment_ids: Vec<Uuid> = running.iter().map(|e| e.id).collect();

        let variant_rows = variants::by_experiment_ids(&self.pool, &experiment_ids).await?;
        let allocation_rows = allocations::by_experiment_ids(&self.pool, &experiment_ids).await?;

        let audience_ids: Vec<Uuid> = running.iter().filter_map(|e| e.audience_id).collect();
        let mut audiences_by_id = HashMap::new();
        for id in audience_ids {
            if let Ok(audience) = audiences::get(&self.pool, id).await {
                audiences_by_id.insert(id, audience);
            }
        }

        let mut variants_by_experiment: HashMap<Uuid, Vec<store::Variant>> = HashMap::new();
        for variant in variant_rows {
            variants_by_experiment
                .entry(variant.experiment_id)
                .or_default()
                .push(variant);
        }

        let mut allocations_by_experiment: HashMap<Uuid, Vec<store::Allocation>> = HashMap::new();
        for allocation in allocation_rows {
            allocations_by_experiment
                .entry(allocation.experiment_id)
                .or_default()
                .push(allocation);
        }

        let version = config_versions::next_version(&self.pool, environment_id).await? as u64;

        let snapshot = compile_snapshot(
            environment_name,
            version,
            &running,
            &audiences_by_id,
            &variants_by_experiment,
            &allocations_by_experiment,
        );

        self.objects
            .put_json(&snapshot_key(environment_name, version), &snapshot)
            .await?;

        if self.should_advance_pointer(environment_name, version).await {
            self.objects
                .put_json(&latest_key(environment_name), &snapshot)
                .await?;
            self.objects
                .put_json(
                    &version_key(environment_name),
                    &flagcore::VersionIndex { version },
                )
                .await?;
        } else {
            tracing::warn!(
                environment = environment_name,
                version,
                "skipping pointer advance: a newer version is already published"
            );
        }

        config_versions::record(&self.pool, environment_id, version as i64, &snapshot).await?;

        tracing::info!(environment = environment_name, version, "published config snapshot");

        Ok(version)
    }

    /// Stale-write guard: only advance `latest.json`/`version.json` if no
    /// concurrent publish has already installed a version at or ahead of
    /// ours.
    async fn should_advance_pointer(&self, environment_name: &str, version: u64) -> bool {
        match self
            .objects
            .get_json::<flagcore::VersionIndex>(&version_key(environment_name))
            .await
        {
            Ok(current) => version > current.version,
            Err(objectstore::ObjectStoreError::NotFound(_)) => true,
            Err(err) => {
                tracing::warn!(error = %err, "could not read current version pointer, advancing anyway");
                true
            }
        }
    }
}
