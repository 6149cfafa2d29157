use thiserror::Error;
use weft_graph::GraphError;
use weft_types::{ErrorKind, UserPub};

/// Errors from profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("no authenticated identity")]
    NotAuthenticated,

    #[error("profiles can only be updated by their owner, not {caller}")]
    PermissionDenied { caller: UserPub },

    #[error("display name is empty")]
    EmptyDisplayName,

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProfileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::EmptyDisplayName => ErrorKind::Validation,
            Self::Graph(e) => e.kind(),
            Self::Serialization(_) => ErrorKind::Store,
        }
    }
}

pub type ProfileResult<T> = std::result::Result<T, ProfileError>;
