//! In-process assignment core: evaluate feature-flag assignments against a
//! snapshot polled directly from the object store, with no HTTP hop.
//!
//! Construction is programmatic, not config-file driven — this is an
//! embedded library, not a standalone process — so configuration goes
//! through [`ClientBuilder`] rather than a `Config::load()` that reads the
//! environment.
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use flagship_sdk::ClientBuilder;
//!
//! let client = ClientBuilder::new("production")
//!     .object_store(objectstore::ObjectStoreConfig::from_env())
//!     .poll_interval(std::time::Duration::from_secs(5))
//!     .build()
//!     .await?;
//!
//! let assignments = client.get_assignments("user-123", &serde_json::json!({"plan": "pro"}))?;
//! # Ok(())
//! # }
//! ```

mod config_store;
mod error;

pub use error::{SdkError, SdkResult};

use config_store::ConfigStore;
use flagcore::Assignment;
use objectstore::{ObjectStoreClient, ObjectStoreConfig};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Builder for [`Client`]. The only required setting is the environment
/// name; everything else defaults the way `decision-service`'s `Config`
/// does.
pub struct ClientBuilder {
    environment: String,
    object_store: Option<ObjectStoreConfig>,
    poll_interval: Duration,
}

impl ClientBuilder {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            object_store: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn object_store(mut self, config: ObjectStoreConfig) -> Self {
        self.object_store = Some(config);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Fetches the environment's current snapshot once, synchronously, then
    /// spawns the background poll loop and returns a ready-to-use client.
    pub async fn build(self) -> SdkResult<Client> {
        let object_store_config = self.object_store.unwrap_or_else(ObjectStoreConfig::from_env);
        let objects = ObjectStoreClient::new(object_store_config).await;
        let store = ConfigStore::new(objects, self.environment.clone());
        store.load().await?;

        let (shutdown, handle) = store.clone().spawn(self.poll_interval);

        Ok(Client {
            store,
            shutdown,
            handle,
        })
    }
}

/// An embedded, self-polling assignment client for one environment.
pub struct Client {
    store: ConfigStore,
    shutdown: watch::Sender<()>,
    handle: JoinHandle<()>,
}

impl Client {
    /// Evaluate every running experiment in the currently installed
    /// snapshot against `(user_key, context)`.
    ///
    /// Returns [`SdkError::ConfigUnavailable`] if no snapshot has been
    /// installed yet, which should not happen after a successful `build()`
    /// but can if the object store was emptied out from under the client.
    pub fn get_assignments(&self, user_key: &str, context: &Value) -> SdkResult<Vec<Assignment>> {
        let snapshot = self.store.get().ok_or(SdkError::ConfigUnavailable)?;
        Ok(flagcore::assign(&snapshot.experiments, user_key, context))
    }

    /// The currently installed snapshot's version, if any.
    pub fn config_version(&self) -> Option<u64> {
        self.store.version()
    }

    /// Stop the poll loop and wait for it to exit. Consumes the client.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_poll_interval_to_five_seconds() {
        let builder = ClientBuilder::new("staging");
        assert_eq!(builder.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn builder_accepts_custom_poll_interval() {
        let builder = ClientBuilder::new("staging").poll_interval(Duration::from_secs(30));
        assert_eq!(builder.poll_interval, Duration::from_secs(30));
    }
}
