use thiserror::Error;
use weft_graph::GraphError;
use weft_refs::RefError;
use weft_types::{ErrorKind, PostId};

/// Errors from interaction operations.
#[derive(Debug, Error)]
pub enum InteractError {
    #[error("no authenticated identity")]
    NotAuthenticated,

    #[error("post not found: {0}")]
    NotFound(PostId),

    #[error(transparent)]
    Refs(#[from] RefError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl InteractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Refs(e) => e.kind(),
            Self::Graph(e) => e.kind(),
            Self::Serialization(_) => ErrorKind::Store,
        }
    }
}

pub type InteractResult<T> = std::result::Result<T, InteractError>;
