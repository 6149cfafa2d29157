//! Error types for reference index operations.

use thiserror::Error;
use weft_graph::GraphError;
use weft_types::{ErrorKind, TypeError};

/// Errors that can occur while linking, unlinking, or traversing edges.
#[derive(Debug, Error)]
pub enum RefError {
    /// The traversal anchor cannot be used as a path segment.
    #[error("invalid anchor {anchor:?}: {reason}")]
    InvalidAnchor { anchor: String, reason: String },

    /// A stored value or identifier failed to parse.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// The graph store rejected or failed the operation.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Serialization failure while encoding an edge value.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl RefError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAnchor { .. } | Self::Type(_) => ErrorKind::Validation,
            Self::Graph(e) => e.kind(),
            Self::Serialization(_) => ErrorKind::Store,
        }
    }
}

/// Convenience type alias for index operations.
pub type RefResult<T> = std::result::Result<T, RefError>;
