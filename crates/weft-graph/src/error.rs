use std::io;

use weft_types::ErrorKind;

/// Errors from graph store operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The path is empty or has an empty segment.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The store did not answer within the wait bound.
    #[error("store did not respond for {path} within {waited_ms}ms")]
    Timeout { path: String, waited_ms: u64 },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error while persisting or loading a snapshot.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backend refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl GraphError {
    pub fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Position in the protocol failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath { .. } => ErrorKind::Validation,
            Self::Timeout { .. } => ErrorKind::Timeout,
            _ => ErrorKind::Store,
        }
    }

    /// Returns `true` for store timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
