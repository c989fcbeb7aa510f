//! Implicit-publish orchestration.
//!
//! Mutations that affect a `RUNNING` experiment's live behaviour trigger a
//! publish immediately after they commit. A failed implicit publish never
//! fails the mutation — callers attach [`PublishOutcome`] to the response as
//! `x-publish-*` headers instead of returning an error.

use axum::http::HeaderMap;
use publisher::Publisher;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct PublishOutcome {
    pub attempted: bool,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl PublishOutcome {
    pub fn not_attempted() -> Self {
        Self::default()
    }

    /// Apply `x-publish-attempted`/`x-publish-succeeded`/`x-publish-error` to
    /// a response's headers.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert("x-publish-attempted", bool_header(self.attempted));
        if self.attempted {
            headers.insert("x-publish-succeeded", bool_header(self.succeeded));
            if let Some(error) = &self.error {
                if let Ok(value) = error.parse() {
                    headers.insert("x-publish-error", value);
                }
            }
        }
    }
}

fn bool_header(value: bool) -> axum::http::HeaderValue {
    axum::http::HeaderValue::from_static(if value { "true" } else { "false" })
}

#[derive(Clone)]
pub struct PublishService {
    pool: PgPool,
    publisher: Publisher,
}

impl PublishService {
    pub fn new(pool: PgPool, publisher: Publisher) -> Self {
        Self { pool, publisher }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Publish `environment_id` if `trigger` is true, translating the result
    /// into the outcome callers attach to their HTTP response. Errors here
    /// are swallowed into the outcome, never propagated.
    pub async fn publish_if(
        &self,
        trigger: bool,
        environment_id: Uuid,
        environment_name: &str,
    ) -> PublishOutcome {
        if !trigger {
            return PublishOutcome::not_attempted();
        }

        match self.publisher.publish(environment_id, environment_name).await {
            Ok(_) => PublishOutcome {
                attempted: true,
                succeeded: true,
                error: None,
            },
            Err(err) => {
                let service_err = error_types::ServiceError::Publish(err.to_string());
                service_err.log();
                PublishOutcome {
                    attempted: true,
                    succeeded: false,
                    error: Some(service_err.as_header_value()),
                }
            }
        }
    }

    /// Explicit publish (`POST /experiments/:id/publish`): errors propagate
    /// as a 500 instead of being swallowed into headers.
    pub async fn publish_explicit(
        &self,
        environment_id: Uuid,
        environment_name: &str,
    ) -> Result<flagcore::ConfigSnapshot, publisher::PublishError> {
        self.publisher.publish(environment_id, environment_name).await?;
        let version = store::repo::config_versions::latest(&self.pool, environment_id)
            .await
            .map_err(publisher::PublishError::Store)?
            .expect("publish just wrote a version");
        Ok(version.snapshot)
    }
}
