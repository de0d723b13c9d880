//! Error types for kiosk

use hyper::StatusCode;

/// Main error type for kiosk operations
#[derive(Debug, thiserror::Error)]
pub enum KioskError {
    /// Bad or missing submission field, duplicate version/hash
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entry id absent from the catalog
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-moderator moderation attempt, editing a denied entry,
    /// or a submission without verified identity headers
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Release source or webhook sink call failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl KioskError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Permission(_) => StatusCode::FORBIDDEN,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Http(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine-readable code for the JSON error envelope
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Permission(_) => "FORBIDDEN",
            Self::Upstream(_) => "UPSTREAM",
            Self::Database(_) => "DATABASE",
            Self::Internal(_) => "INTERNAL",
            Self::Http(_) => "BAD_REQUEST",
        }
    }
}

// Implement From conversions for common error types

impl From<std::io::Error> for KioskError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for KioskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for KioskError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<reqwest::Error> for KioskError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<mongodb::error::Error> for KioskError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for kiosk operations
pub type Result<T> = std::result::Result<T, KioskError>;
