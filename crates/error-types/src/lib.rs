//! Shared error shape for the flag platform.
//!
//! Every service-level error the control plane and decision service raise
//! collapses to one of these kinds before it crosses an HTTP boundary. This
//! keeps §7 of the design ("Error handling design") implemented in one place
//! instead of re-derived per binary.

use serde::Serialize;
use std::fmt;

/// Surface-independent error kind. Binaries map this to their web
/// framework's response type; library crates return it (or something that
/// converts into it) instead of framework-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed request body, bad pagination, invalid range, overlapping
    /// allocations, or any other single-message input problem.
    #[error("{0}")]
    Validation(String),

    /// An accepted state transition rule was violated (e.g. RUNNING -> DRAFT).
    #[error("{0}")]
    IllegalTransition(String),

    /// Missing environment / audience / experiment / variant.
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness collision (env name, (env, experiment key), ...).
    #[error("{0}")]
    Conflict(String),

    /// An audience or resource was referenced across an environment boundary.
    #[error("{0}")]
    CrossEnvironment(String),

    /// Compilation ran but the object-store write failed.
    #[error("{0}")]
    Publish(String),

    /// `/decide` was called for an environment with no snapshot installed yet.
    #[error("no configuration available for this environment")]
    ConfigUnavailable,

    /// Anything else: database failures, object-store transport errors, etc.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(format!("{resource} not found: {id}"))
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Single-line, trimmed, CR/LF-stripped, truncated to 512 bytes, for
    /// embedding in the `x-publish-error` response header.
    pub fn as_header_value(&self) -> String {
        let raw = self.to_string();
        let mut single_line: String = raw
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        single_line = single_line.trim().to_string();
        if single_line.len() > 512 {
            let mut boundary = 512;
            while !single_line.is_char_boundary(boundary) {
                boundary -= 1;
            }
            single_line.truncate(boundary);
        }
        single_line
    }

    /// Logs at the level appropriate to the error kind.
    pub fn log(&self) {
        match self {
            Self::Validation(_) | Self::IllegalTransition(_) | Self::NotFound(_) => {
                tracing::debug!(error = %self, "client error");
            }
            Self::Conflict(_) | Self::CrossEnvironment(_) => {
                tracing::info!(error = %self, "conflict");
            }
            Self::ConfigUnavailable => {
                tracing::warn!("no config available for requested environment");
            }
            Self::Publish(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "server error");
            }
        }
    }
}

/// Wire envelope every HTTP error response carries: `{ "error": "<message>" }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&ServiceError> for ErrorBody {
    fn from(err: &ServiceError) -> Self {
        let message = match err {
            ServiceError::Internal(_) | ServiceError::Publish(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        ErrorBody { error: message }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
