//! Thin S3-compatible client wrapper.
//!
//! Path-style addressing, `application/json` content type, one bucket per
//! deployment, trimmed to the handful of operations the config pipeline
//! actually needs (put/get of small JSON objects; no multipart, no
//! presigning).

use crate::config::ObjectStoreConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("object store request failed: {0}")]
    Request(String),
    #[error("object body was not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct ObjectStoreClient {
    client: Arc<Client>,
    config: ObjectStoreConfig,
}

impl ObjectStoreClient {
    pub async fn new(config: ObjectStoreConfig) -> Self {
        let mut loader = aws_config::from_env().region(aws_sdk_s3::config::Region::new(
            config.region.clone(),
        ));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Self {
            client: Arc::new(client),
            config,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Serialize `value` and PUT it at `key` with `application/json`.
    pub async fn put_json<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), ObjectStoreError> {
        let body = serde_json::to_vec(value)?;
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| ObjectStoreError::Request(e.to_string()))?;
        Ok(())
    }

    /// GET `key` and deserialize the body as JSON.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<T, ObjectStoreError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("NoSuchKey") || msg.contains("404") {
                    ObjectStoreError::NotFound(key.to_string())
                } else {
                    ObjectStoreError::Request(msg)
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::Request(e.to_string()))?
            .into_bytes();

        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn health_check(&self) -> Result<(), ObjectStoreError> {
        self.client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Request(e.to_string()))?;
        Ok(())
    }
}
