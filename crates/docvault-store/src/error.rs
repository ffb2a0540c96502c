use docvault_types::{ObjectId, TypeError};

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The id string is not a well-formed object id.
    #[error("invalid object id {id:?}: {source}")]
    InvalidId {
        id: String,
        #[source]
        source: TypeError,
    },

    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// An object with the same id but different content already exists.
    #[error("content collision for {0}: stored bytes differ from the new content")]
    Collision(ObjectId),

    /// The backing storage is not in the format this store writes.
    #[error("storage corruption at offset {offset}: {reason}")]
    StorageCorruption { offset: u64, reason: String },

    /// The object cannot be represented by the backend.
    #[error("object of {size} bytes exceeds the backend limit of {max} bytes")]
    ObjectTooLarge { size: u64, max: u64 },

    /// The store was opened without write access.
    #[error("store is read-only")]
    ReadOnly,

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn invalid_id(id: &str, source: TypeError) -> Self {
        Self::InvalidId {
            id: id.to_string(),
            source,
        }
    }

    pub(crate) fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        Self::StorageCorruption {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn poisoned() -> Self {
        Self::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "store lock poisoned",
        ))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
