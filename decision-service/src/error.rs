use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use error_types::{ErrorBody, ServiceError};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct AppError(#[from] pub ServiceError);

impl From<objectstore::ObjectStoreError> for AppError {
    fn from(err: objectstore::ObjectStoreError) -> Self {
        match err {
            objectstore::ObjectStoreError::NotFound(_) => AppError(ServiceError::ConfigUnavailable),
            other => AppError(ServiceError::Internal(other.into())),
        }
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
