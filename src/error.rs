//! Error handling for Visage
//!
//! Errors here cover the collaborator path: loading profiles, wiring a
//! session together, looking up declared layers and expressions. The per-tick
//! blending path never returns errors: inconsistent buffer lengths are
//! programmer errors (panic), and out-of-range numeric inputs are clamped
//! silently so a live session keeps ticking.

use thiserror::Error;

/// Result type alias for Visage operations
pub type Result<T> = std::result::Result<T, VisageError>;

/// Main error type for Visage operations
#[derive(Error, Debug)]
pub enum VisageError {
    // Profile Errors
    #[error("Profile not found: {path}")]
    ProfileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid profile: {reason}")]
    InvalidProfile { reason: String },

    // Session Errors
    #[error("Duplicate channel name: {name}")]
    DuplicateChannel { name: String },

    #[error("Unknown layer: {name}")]
    UnknownLayer { name: String },

    #[error("Unknown expression: {id}")]
    UnknownExpression { id: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VisageError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            VisageError::ProfileNotFound { .. } => "PROFILE_NOT_FOUND",
            VisageError::InvalidProfile { .. } => "INVALID_PROFILE",
            VisageError::DuplicateChannel { .. } => "DUPLICATE_CHANNEL",
            VisageError::UnknownLayer { .. } => "UNKNOWN_LAYER",
            VisageError::UnknownExpression { .. } => "UNKNOWN_EXPRESSION",
            VisageError::Io(_) => "IO_ERROR",
            VisageError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors indicate bad collaborator input (a profile that can
    /// be fixed and reloaded); unrecoverable ones indicate the process
    /// environment itself failed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            VisageError::ProfileNotFound { .. } => true,
            VisageError::InvalidProfile { .. } => true,
            VisageError::DuplicateChannel { .. } => true,
            VisageError::UnknownLayer { .. } => true,
            VisageError::UnknownExpression { .. } => true,
            _ => false,
        }
    }
}
