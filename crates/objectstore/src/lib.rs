//! S3-compatible object store client for the config-snapshot pipeline.

pub mod client;
pub mod config;

pub use client::{ObjectStoreClient, ObjectStoreError};
pub use config::{latest_key, snapshot_key, version_key, ObjectStoreConfig};
