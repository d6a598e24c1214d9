//! Error handling for the WorkLogs client

use std::fmt;
use thiserror::Error;

/// Unified error type for the WorkLogs client
///
/// Messages are free text and meant to be shown to the user as-is.
#[derive(Error, Debug)]
pub enum Error {
    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Authentication errors
    #[error("{0}")]
    Auth(String),

    /// Database query errors reported by the backend
    #[error("{0}")]
    Database(String),

    /// A required input was missing or malformed; no request was issued
    #[error("{0}")]
    Validation(String),

    /// The current user lacks the permission for the operation
    #[error("{0}")]
    PermissionDenied(String),

    /// A row that was expected to exist was not found
    #[error("{0}")]
    NotFound(String),

    /// The operation was cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new authentication error
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    /// Create a new database error
    pub fn database<T: fmt::Display>(msg: T) -> Self {
        Error::Database(msg.to_string())
    }

    /// Create a new validation error
    pub fn validation<T: fmt::Display>(msg: T) -> Self {
        Error::Validation(msg.to_string())
    }

    /// Create a new permission error
    pub fn permission_denied<T: fmt::Display>(msg: T) -> Self {
        Error::PermissionDenied(msg.to_string())
    }

    /// Create a new not-found error
    pub fn not_found<T: fmt::Display>(msg: T) -> Self {
        Error::NotFound(msg.to_string())
    }

    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }

    /// Build the error for a set of missing required fields
    pub fn missing_fields(fields: &[&str]) -> Self {
        Error::Validation(format!("Missing required fields: {}", fields.join(", ")))
    }

    /// Whether the error was raised locally before touching the network
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
