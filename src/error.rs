//! Error types for PistonPost operations.

use thiserror::Error;

/// Result type alias for PistonPost operations.
pub type Result<T> = std::result::Result<T, PistonError>;

/// Main error type for PistonPost operations.
#[derive(Error, Debug)]
pub enum PistonError {
    /// Transport-level failures talking to the backend
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// The backend answered with something we could not decode
    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PistonError {
    /// Creates a new backend error.
    pub fn backend<T: ToString>(status: u16, msg: T) -> Self {
        Self::Backend {
            status,
            message: msg.to_string(),
        }
    }

    /// Creates a new invalid response error.
    pub fn invalid_response<T: ToString>(msg: T) -> Self {
        Self::InvalidResponse(msg.to_string())
    }

    /// Creates a new validation error.
    pub fn validation<T: ToString>(msg: T) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Creates a new configuration error.
    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Text shown in a page's alert region.
    ///
    /// Backend failures surface the server-provided message verbatim; every
    /// other failure uses its display form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status reported by the backend, if the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
