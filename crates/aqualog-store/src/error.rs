/// Errors from record collection and flat namespace operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backing store could not be opened or has gone away.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The write would exceed the store's capacity.
    #[error("storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The transaction did not commit.
    #[error("transaction aborted: {0}")]
    Aborted(String),

    /// The on-disk database was created by a newer schema version.
    #[error("database {name} is at version {found}, newer than requested version {requested}")]
    VersionConflict {
        name: String,
        found: u32,
        requested: u32,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be decoded or does not match its key.
    #[error("corrupt entry {location}: {reason}")]
    Corrupt { location: String, reason: String },

    /// The key is not usable in this namespace.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
