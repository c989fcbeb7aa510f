use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("object store error: {0}")]
    ObjectStore(#[from] objectstore::ObjectStoreError),

    #[error("no configuration loaded yet for this environment")]
    ConfigUnavailable,
}

pub type SdkResult<T> = Result<T, SdkError>;
