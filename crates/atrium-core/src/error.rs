//! Error types for atrium-core

use thiserror::Error;

/// Result type alias using atrium-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in atrium-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Remote read/write collaborator rejected or failed a call
    #[error("Backend error: {0}")]
    Backend(String),

    /// Record not found in the addressed partition
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A mutation was requested without a signed-in user
    #[error("No signed-in user")]
    Unauthenticated,

    /// A fan-out operation where only some calls succeeded
    #[error("{} of {attempted} operations failed: {}", .failures.len(), .failures.join("; "))]
    PartialFailure {
        attempted: usize,
        /// One message per failed operation, naming its target
        failures: Vec<String>,
    },

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
