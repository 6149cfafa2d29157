use thiserror::Error;
use weft_graph::GraphError;
use weft_refs::RefError;
use weft_types::{ErrorKind, PostId, TypeError, UserPub};

/// Errors from post lifecycle operations.
#[derive(Debug, Error)]
pub enum PostError {
    #[error("post text is empty")]
    EmptyText,

    #[error("no authenticated identity")]
    NotAuthenticated,

    #[error("post not found: {0}")]
    NotFound(PostId),

    #[error("{user} is not the author of {post}")]
    PermissionDenied { post: PostId, user: UserPub },

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Refs(#[from] RefError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl PostError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyText | Self::Type(_) => ErrorKind::Validation,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Refs(e) => e.kind(),
            Self::Graph(e) => e.kind(),
        }
    }
}

pub type PostResult<T> = std::result::Result<T, PostError>;
