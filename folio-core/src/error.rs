//! Error types for Folio.
//!
//! A single error hierarchy built with `thiserror`. Every variant is cheap to
//! clone so that one failed request can be handed, unchanged, to every caller
//! that was waiting on it.

use thiserror::Error;

/// Result type alias using `FolioError`.
pub type Result<T> = std::result::Result<T, FolioError>;

/// Main error type for all Folio operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FolioError {
    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Persistent store read/write failure (quota, corrupt file, ...).
    #[error("Storage error: {0}")]
    StorageError(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Connection or request timeout.
    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    /// The backend answered with a non-success status.
    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    // ═══════════════════════════════════════════════════════════════════════════
    // SESSION & DOMAIN ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// An authenticated resource was requested without a session.
    #[error("Not logged in")]
    Unauthenticated,

    /// Requested item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION & CONFIG ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl FolioError {
    /// Returns true if the operation may succeed when tried again later.
    pub fn is_recoverable(&self) -> bool {
        match self {
            FolioError::HttpError(_) | FolioError::ConnectionTimeout(_) => true,
            FolioError::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if this error came from talking to the remote endpoint.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            FolioError::HttpError(_) | FolioError::ConnectionTimeout(_) | FolioError::Api { .. }
        )
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, FolioError::ValidationError(_))
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::JsonError(err.to_string())
    }
}

impl From<std::io::Error> for FolioError {
    fn from(err: std::io::Error) -> Self {
        FolioError::IoError(err.to_string())
    }
}
