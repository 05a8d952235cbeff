use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Route(#[from] route_solver::RouteError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("cancelled")]
    Cancelled,
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("checkpoint does not match the task list: {0}")]
    CheckpointCorruption(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    pub fn corruption(message: impl Into<String>) -> Self {
        Self::CheckpointCorruption(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Errors that must halt the whole experiment instead of degrading a task.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvariantViolation(_) | Self::CheckpointCorruption(_) | Self::Io(_)
        )
    }

    /// True for cancellation, including a cancelled route search.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Route(route_solver::RouteError::Cancelled)
        )
    }
}
