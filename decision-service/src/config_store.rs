//! In-memory, per-environment snapshot cache kept current by polling the
//! object store's version index.
//!
//! `spawn()` returns a shutdown handle and a poll loop runs on
//! `tokio::select!` between a `watch` channel and a `tokio::time::interval`
//! tick, with each tick walking every known environment.

use flagcore::ConfigSnapshot;
use objectstore::{latest_key, version_key, ObjectStoreClient, ObjectStoreError};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;

/// Holds installed snapshots and enforces the monotonic-install rule. Kept
/// separate from `ConfigStore` so the install logic is testable without a
/// live object-store client.
#[derive(Default)]
struct SnapshotTable {
    snapshots: RwLock<HashMap<String, Arc<ConfigSnapshot>>>,
}

impl SnapshotTable {
    fn get(&self, environment: &str) -> Option<Arc<ConfigSnapshot>> {
        self.snapshots.read().unwrap().get(environment).cloned()
    }

    fn versions(&self) -> HashMap<String, Option<u64>> {
        self.snapshots
            .read()
            .unwrap()
            .iter()
            .map(|(env, snapshot)| (env.clone(), Some(snapshot.version)))
            .collect()
    }

    /// Install `snapshot`, honouring the monotonic-install rule: a snapshot
    /// is only installed if strictly newer than whatever's currently there.
    fn install(&self, environment: &str, snapshot: ConfigSnapshot) {
        let mut snapshots = self.snapshots.write().unwrap();
        let should_install = match snapshots.get(environment) {
            Some(current) => snapshot.version > current.version,
            None => true,
        };
        if should_install {
            tracing::info!(environment, version = snapshot.version, "installed config snapshot");
            snapshots.insert(environment.to_string(), Arc::new(snapshot));
        } else {
            tracing::warn!(
                environment,
                version = snapshot.version,
                "rejected stale snapshot install"
            );
        }
    }
}

#[derive(Clone)]
pub struct ConfigStore {
    objects: ObjectStoreClient,
    table: Arc<SnapshotTable>,
    /// Environments the poll loop walks each tick. Shared with `spawn`'s
    /// task so a lazily-registered environment (via `get_or_load`) keeps
    /// getting polled instead of being loaded once and forgotten.
    known: Arc<RwLock<Vec<String>>>,
}

impl ConfigStore {
    pub fn new(objects: ObjectStoreClient) -> Self {
        Self {
            objects,
            table: Arc::new(SnapshotTable::default()),
            known: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn register(&self, environment: &str) {
        let mut known = self.known.write().unwrap();
        if !known.iter().any(|e| e == environment) {
            known.push(environment.to_string());
        }
    }

    /// Installed snapshot for `environment`, if any.
    pub fn get(&self, environment: &str) -> Option<Arc<ConfigSnapshot>> {
        self.table.get(environment)
    }

    /// `{ env: version|null }` for the health endpoint.
    pub fn versions(&self) -> HashMap<String, Option<u64>> {
        self.table.versions()
    }

    /// Fetch-and-install `environment`'s latest snapshot unconditionally.
    /// Used both for startup pre-registration and lazy registration on
    /// first `/decide` for an unseen environment.
    pub async fn load(&self, environment: &str) -> Result<(), ObjectStoreError> {
        let snapshot: ConfigSnapshot = self.objects.get_json(&latest_key(environment)).await?;
        self.table.install(environment, snapshot);
        Ok(())
    }

    /// One poll tick for a single environment: check `version.json`, and if
    /// it's ahead of what's installed, fetch and attempt to install
    /// `latest.json`. Failures log and leave state untouched.
    async fn poll_one(&self, environment: &str) {
        let current_version = self.get(environment).map(|s| s.version);

        let index: flagcore::VersionIndex = match self.objects.get_json(&version_key(environment)).await {
            Ok(index) => index,
            Err(err) => {
                tracing::warn!(environment, error = %err, "failed to fetch version index");
                return;
            }
        };

        if current_version.is_some_and(|v| index.version <= v) {
            return;
        }

        match self.objects.get_json::<ConfigSnapshot>(&latest_key(environment)).await {
            Ok(snapshot) => self.table.install(environment, snapshot),
            Err(err) => {
                tracing::warn!(environment, error = %err, "failed to fetch latest snapshot");
            }
        }
    }

    /// Spawn the poll loop over `environments`, returning a shutdown sender
    /// and the task's join handle.
    pub fn spawn(
        self,
        environments: Vec<String>,
        poll_interval: Duration,
    ) -> (watch::Sender<()>, tokio::task::JoinHandle<()>) {
        for environment in &environments {
            self.register(environment);
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(());

        let handle = tokio::spawn(async move {
            tracing::info!(poll_interval_secs = poll_interval.as_secs(), "config store poll loop started");
            let mut timer = interval(poll_interval);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        tracing::info!("config store poll loop received shutdown signal");
                        break;
                    }
                    _ = timer.tick() => {
                        let envs: Vec<String> = self.known.read().unwrap().clone();
                        for env in envs {
                            self.poll_one(&env).await;
                        }
                    }
                }
            }
        });

        (shutdown_tx, handle)
    }

    /// Lazily register and synchronously load an environment not seen
    /// before, for the first `/decide` request that targets it. Registers
    /// the environment into the shared poll set so later polls keep it current.
    pub async fn get_or_load(&self, environment: &str) -> Result<Arc<ConfigSnapshot>, ObjectStoreError> {
        if let Some(snapshot) = self.get(environment) {
            return Ok(snapshot);
        }
        self.load(environment).await?;
        self.register(environment);
        self.get(environment)
            .ok_or_else(|| ObjectStoreError::NotFound(environment.to_string()))
    }
}
