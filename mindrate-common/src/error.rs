//! Common error types for MindRate

use thiserror::Error;

/// Common result type for MindRate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across MindRate crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Entity would violate a uniqueness rule (duplicate study name, position)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a `NotFound` naming the entity kind and its id
    pub fn not_found(kind: &str, id: i64) -> Self {
        Error::NotFound(format!("{} {}", kind, id))
    }
}
