use thiserror::Error;
use weft_types::ErrorKind;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("media upload failed: {0}")]
    Media(String),

    #[error(transparent)]
    Post(#[from] weft_posts::PostError),

    #[error(transparent)]
    Interact(#[from] weft_interact::InteractError),

    #[error(transparent)]
    Profile(#[from] weft_profile::ProfileError),

    #[error(transparent)]
    Query(#[from] weft_query::QueryError),

    #[error(transparent)]
    Graph(#[from] weft_graph::GraphError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Validation,
            Self::Media(_) | Self::Io(_) => ErrorKind::Store,
            Self::Post(e) => e.kind(),
            Self::Interact(e) => e.kind(),
            Self::Profile(e) => e.kind(),
            Self::Query(e) => e.kind(),
            Self::Graph(e) => e.kind(),
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
