use aqualog_exchange::ImportError;
use aqualog_store::StorageError;
use aqualog_types::{ContainerId, RecordId, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("container not found: {0}")]
    ContainerNotFound(ContainerId),

    #[error("image not found: {0}")]
    ImageNotFound(RecordId),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Types(#[from] TypeError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SdkError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
