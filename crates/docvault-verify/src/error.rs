//! Error types for the verify crate.
//!
//! Findings about the verified tree are never errors; they are reported as
//! messages. These types cover configuration and content parsing only.

/// Errors raised while configuring a verification run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// A message kind name that is not part of the taxonomy.
    #[error("unknown message kind: {0:?}")]
    UnknownMessageKind(String),

    /// A severity name other than info, warning or error.
    #[error("unknown severity: {0:?}")]
    UnknownSeverity(String),
}

/// Errors raised by a markup parser.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    /// The content is not well-formed XML.
    #[error("markup error at byte {position}: {message}")]
    Xml { position: u64, message: String },

    /// An element was left open at the end of the content.
    #[error("unclosed <{element}> at end of content")]
    Unclosed { element: String },
}

/// Convenience alias for verify configuration results.
pub type VerifyResult<T> = Result<T, VerifyError>;
