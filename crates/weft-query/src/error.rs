use thiserror::Error;
use weft_graph::GraphError;
use weft_posts::PostError;
use weft_refs::RefError;
use weft_types::{ErrorKind, TypeError};

/// Errors from query operations.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Nothing resolved within the bounded wait.
    #[error("{what} not found")]
    NotFound { what: String },

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Refs(#[from] RefError),

    #[error(transparent)]
    Posts(#[from] PostError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl QueryError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Type(e) => e.kind(),
            Self::Refs(e) => e.kind(),
            Self::Posts(e) => e.kind(),
            Self::Graph(e) => e.kind(),
        }
    }
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;
