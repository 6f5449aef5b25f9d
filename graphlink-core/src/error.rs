//! Error types shared by the graphlink crates

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Unknown procedure: {0}")]
    UnknownProcedure(String),

    #[error("Flight error: {0}")]
    Flight(String),

    #[error("Flight transport unavailable: {0}")]
    FlightUnavailable(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid procedure namespace: {0}")]
    InvalidNamespace(String),

    #[error("Missing field `{0}` in server response")]
    MissingField(String),

    #[error("Server version error: {0}")]
    ServerVersion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Retry exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_) | ClientError::FlightUnavailable(_) | ClientError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for ClientError {
    fn from(err: arrow::error::ArrowError) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
