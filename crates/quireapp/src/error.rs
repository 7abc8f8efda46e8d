use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum QuireError {
    #[error("Node not found: {0}")]
    NodeNotFound(Uuid),

    #[error("Resource not found: {0}")]
    ResourceNotFound(Uuid),

    #[error("Cannot move a node under its own descendant")]
    Cycle,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Not authenticated, please log in again")]
    Unauthorized,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Api Error: {0}")]
    Api(String),
}

impl QuireError {
    pub fn validation(msg: impl Into<String>) -> Self {
        QuireError::Validation(msg.into())
    }

    /// Errors that were rejected before anything was mutated.
    pub fn is_rejection(&self) -> bool {
        matches!(self, QuireError::Validation(_) | QuireError::Cycle)
    }
}

pub type Result<T> = std::result::Result<T, QuireError>;
