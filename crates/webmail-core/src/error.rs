//! Error types for the webmail frontend.
//!
//! Errors fall into two groups: the ones a user can act on (server
//! `{error}` payloads, client-side validation) are rendered inline next to
//! the control that triggered them; everything else only reaches the log.

use thiserror::Error;

/// Result type alias for webmail operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the webmail frontend
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Transport Errors
    // ==========================================================================
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status {status} for {method} {path}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
    },

    // ==========================================================================
    // Application Errors
    // ==========================================================================
    /// The server answered with an `{"error": "..."}` payload.
    #[error("{0}")]
    Rejected(String),

    /// Client-side validation failed before any request was issued.
    #[error("{0}")]
    InvalidInput(String),

    // ==========================================================================
    // Encoding Errors
    // ==========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    #[error("Invalid config: {0}")]
    Config(String),
}

impl Error {
    /// Returns the error type string (for diagnostics)
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT",
            Self::Status { .. } => "HTTP_STATUS",
            Self::Rejected(_) => "REJECTED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Serialization(_) => "SERIALIZATION",
            Self::Template(_) => "TEMPLATE",
            Self::Config(_) => "CONFIG",
        }
    }

    /// Whether the message is meant for the user rather than the console.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::InvalidInput(_))
    }
}
