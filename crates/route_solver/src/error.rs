use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("route search cancelled")]
    Cancelled,
    #[error("{0}")]
    Other(String),
}

pub type RouteResult<T> = std::result::Result<T, RouteError>;

impl RouteError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
