//! Error types for colloq-api

use thiserror::Error;

/// Result type alias using colloq-api Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the chat backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend answered with a non-success status
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Credentials were missing, expired or rejected
    #[error("Not authorized")]
    Unauthorized,

    /// Backend answered `{"success": false}`
    #[error("Backend rejected {0}")]
    Rejected(&'static str),

    /// Response parsed but carried unusable values
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a status error, trimming long bodies
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        const MAX_BODY_CHARS: usize = 200;

        let body = body.into();
        let body = if body.chars().count() > MAX_BODY_CHARS {
            let head: String = body.chars().take(MAX_BODY_CHARS).collect();
            format!("{}...", head)
        } else {
            body
        };
        Self::Status { status, body }
    }

    /// Whether the session collaborator should drop its credentials
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Error::Unauthorized => true,
            Error::Status { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// HTTP status attached to this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Unauthorized => Some(401),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
