use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use error_types::{ErrorBody, ServiceError};
use store::StoreError;

/// Thin `IntoResponse` wrapper around [`ServiceError`] — handlers return
/// `Result<T, AppError>` and everything below them speaks `ServiceError`.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct AppError(#[from] pub ServiceError);

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError(match err {
            StoreError::NotFound { resource, id } => ServiceError::not_found(resource, id),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::CrossEnvironment(msg) => ServiceError::CrossEnvironment(msg),
            StoreError::Validation(msg) => ServiceError::Validation(msg),
            StoreError::Database(e) => ServiceError::Internal(e.into()),
        })
    }
}

impl From<publisher::PublishError> for AppError {
    fn from(err: publisher::PublishError) -> Self {
        AppError(ServiceError::Publish(err.to_string()))
    }
}

fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_) | ServiceError::CrossEnvironment(_) => StatusCode::BAD_REQUEST,
        ServiceError::IllegalTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::ConfigUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Publish(_) | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.0.log();
        let status = status_for(&self.0);
        let body: ErrorBody = (&self.0).into();
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
