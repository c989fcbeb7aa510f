//! Single-environment polling snapshot cache for in-process embedding.
//!
//! One [`Client`] targets one environment, unlike the decision service's
//! multi-environment map — an embedded consumer process only ever cares
//! about the environment it runs in. Same monotonic-install rule and the
//! same `tokio::select!`/`watch` shutdown shape as
//! `decision-service/src/config_store.rs`.

use flagcore::ConfigSnapshot;
use objectstore::{latest_key, version_key, ObjectStoreClient};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;

use crate::error::SdkResult;

#[derive(Clone)]
pub(crate) struct ConfigStore {
    objects: ObjectStoreClient,
    environment: String,
    snapshot: Arc<RwLock<Option<Arc<ConfigSnapshot>>>>,
}

impl ConfigStore {
    pub(crate) fn new(objects: ObjectStoreClient, environment: String) -> Self {
        Self {
            objects,
            environment,
            snapshot: Arc::new(RwLock::new(None)),
        }
    }

    pub(crate) fn get(&self) -> Option<Arc<ConfigSnapshot>> {
        self.snapshot.read().unwrap().clone()
    }

    pub(crate) fn version(&self) -> Option<u64> {
        self.get().map(|s| s.version)
    }

    /// Synchronous initial fetch, used before the SDK returns from `build()`
    /// so the first call to `get_assignments` doesn't race the poll loop.
    pub(crate) async fn load(&self) -> SdkResult<()> {
        let snapshot: ConfigSnapshot = self.objects.get_json(&latest_key(&self.environment)).await?;
        self.install(snapshot);
        Ok(())
    }

    fn install(&self, snapshot: ConfigSnapshot) {
        let mut current = self.snapshot.write().unwrap();
        let should_install = match current.as_ref() {
            Some(existing) => snapshot.version > existing.version,
            None => true,
        };
        if should_install {
            tracing::info!(environment = %self.environment, version = snapshot.version, "sdk installed config snapshot");
            *current = Some(Arc::new(snapshot));
        } else {
            tracing::warn!(environment = %self.environment, version = snapshot.version, "sdk rejected stale snapshot install");
        }
    }

    async fn poll_once(&self) {
        let current_version = self.version();

        let index: flagcore::VersionIndex = match self.objects.get_json(&version_key(&self.environment)).await {
            Ok(index) => index,
            Err(err) => {
                tracing::warn!(environment = %self.environment, error = %err, "sdk failed to fetch version index");
                return;
            }
        };

        if current_version.is_some_and(|v| index.version <= v) {
            return;
        }

        match self.objects.get_json::<ConfigSnapshot>(&latest_key(&self.environment)).await {
            Ok(snapshot) => self.install(snapshot),
            Err(err) => {
                tracing::warn!(environment = %self.environment, error = %err, "sdk failed to fetch latest snapshot");
            }
        }
    }

    pub(crate) fn spawn(self, poll_interval: Duration) -> (watch::Sender<()>, tokio::task::JoinHandle<()>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(());

        let handle = tokio::spawn(async move {
            let mut timer = interval(poll_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        tracing::info!(environment = %self.environment, "sdk poll loop received shutdown signal");
                        break;
                    }
                    _ = timer.tick() => {
                        self.poll_once().await;
                    }
                }
            }
        });

        (shutdown_tx, handle)
    }
}
