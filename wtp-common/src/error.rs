//! Common error types for WTP

use thiserror::Error;

/// Common result type for WTP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across WTP crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not allowed in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Remote session backend rejected or failed a call
    #[error("Backend error: {0}")]
    Backend(String),

    /// Audio subsystem could not be opened or resumed
    #[error("Audio error: {0}")]
    Audio(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
