use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: String },

    #[error("timestamp out of range: {0}")]
    InvalidTimestamp(i64),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// The protocol's failure taxonomy.
///
/// Every crate-level error maps onto one of these so that callers at the
/// upward API can branch on a stable set of outcomes. A duplicate publish is
/// deliberately absent: it is a success.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No authenticated identity is available for a self-attributed write.
    NotAuthenticated,
    /// The caller's identity does not own the target.
    PermissionDenied,
    /// The bounded wait elapsed and nothing resolved.
    NotFound,
    /// The store did not answer within the wait bound.
    Timeout,
    /// Empty content, a malformed tag, or a malformed identifier.
    Validation,
    /// The underlying graph store reported a failure.
    Store,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotAuthenticated => "NotAuthenticated",
            Self::PermissionDenied => "PermissionDenied",
            Self::NotFound => "NotFound",
            Self::Timeout => "Timeout",
            Self::Validation => "ValidationError",
            Self::Store => "StoreError",
        };
        write!(f, "{s}")
    }
}

impl TypeError {
    /// Every type-level failure is a validation failure.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
