//! Error types for the domwatch system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for domwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the domwatch system
#[derive(Error, Debug)]
pub enum Error {
    /// The availability oracle could not be constructed or queried
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// The store rejected or failed a read/write
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// The notifier could not be constructed or failed to deliver
    #[error("Notifier failure: {0}")]
    Notifier(String),

    /// A scan was requested while another one is still running
    #[error("A scan is already in progress")]
    ScanInProgress,

    /// Unrecoverable scan-level failure
    #[error("Scan failure: {0}")]
    Scan(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an oracle error
    pub fn oracle(msg: impl Into<String>) -> Self {
        Self::Oracle(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a notifier error
    pub fn notifier(msg: impl Into<String>) -> Self {
        Self::Notifier(msg.into())
    }

    /// Create a scan error
    pub fn scan(msg: impl Into<String>) -> Self {
        Self::Scan(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error came from the store
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
