//! Error types for the Dilemma Machine
//!
//! This module defines the error taxonomy shared by the game core, the
//! storage gateway, and the HTTP surface, using `thiserror` for ergonomic
//! error handling.

use thiserror::Error;

/// Main error type for Dilemma Machine operations
///
/// The first three variants are client-addressable and never retried.
/// `Storage` covers any persistence failure and is surfaced as an opaque
/// server error.
#[derive(Error, Debug)]
pub enum DilemmaError {
    /// Referenced session does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request value (e.g. an option other than A or B)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Duplicate choice for a (session, dilemma) pair
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any underlying persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Work abandoned by its caller before it committed; nothing was written
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DilemmaError {
    /// Returns true for failures the caller can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DilemmaError::NotFound(_) | DilemmaError::InvalidInput(_) | DilemmaError::Conflict(_)
        )
    }
}

/// Result type alias for Dilemma Machine operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type.
/// Callers that need to branch on the failure kind use
/// `err.downcast_ref::<DilemmaError>()`.
pub type Result<T> = anyhow::Result<T>;
