//! Error types for the index crate.

use crate::node::NodeHandle;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The handle does not belong to this index.
    #[error("unknown node handle: {0}")]
    UnknownNode(NodeHandle),

    /// No node is reachable at the given address.
    #[error("address not found: {0:?}")]
    AddressNotFound(String),

    /// The persisted index violates the nesting or attribute rules.
    #[error("index format error at byte {position}: {reason}")]
    Format { position: u64, reason: String },

    /// The persisted index is not well-formed XML.
    #[error("XML error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    /// I/O error while reading or writing the index.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
