use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error(transparent)]
    ObjectStore(#[from] objectstore::ObjectStoreError),
}

pub type PublishResult<T> = Result<T, PublishError>;
