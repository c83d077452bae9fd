//! Error types for notesync.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Message shown to the user when a remote operation fails.
pub const GENERIC_FAILURE_MESSAGE: &str = "Oops! Something went wrong. Please try again.";

/// Result type alias for notesync operations
pub type NoteResult<T> = Result<T, NoteError>;

/// Main error type for notesync operations
#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Validation error in {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not authorized: missing or invalid session token")]
    Unauthorized,

    #[error("Server returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NoteError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        NoteError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new HTTP status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        NoteError::Http {
            status,
            message: message.into(),
        }
    }

    /// True for client-side validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, NoteError::Validation { .. })
    }

    /// True for failures that happened talking to the remote store
    /// (network, auth, server status or an undecodable body).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            NoteError::Network(_)
                | NoteError::Unauthorized
                | NoteError::Http { .. }
                | NoteError::NotFound(_)
                | NoteError::Decode(_)
        )
    }

    /// Message suitable for display to the user.
    ///
    /// Transport failures collapse into one generic message; validation
    /// failures keep their detail so the user can fix the input.
    pub fn user_message(&self) -> String {
        match self {
            NoteError::Validation { field, message } => format!("{}: {}", field, message),
            e if e.is_transport() => GENERIC_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for NoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            NoteError::Decode(err.to_string())
        } else {
            NoteError::Network(err.to_string())
        }
    }
}

/// Validation error with field and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for NoteError {
    fn from(err: ValidationError) -> Self {
        NoteError::Validation {
            field: err.field,
            message: err.message,
        }
    }
}
