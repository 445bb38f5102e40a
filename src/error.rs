//! Error types for the Fitted core
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to the frontend shell.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Capture cancelled")]
    Cancelled,

    #[error("Background removal failed: {0}")]
    ServiceError(String),

    #[error("Upload conflict: an object already exists at {0}")]
    UploadConflict(String),

    #[error("Blob store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Outfit selection requires a shirt, a pant, and a shoe")]
    IncompleteSelection,

    #[error("Unknown item category: {0}")]
    UnknownCategory(String),

    #[error("Album name cannot be empty")]
    EmptyName,

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Constraint failures (unique, foreign key, check) surface as
/// `ConstraintViolation`; everything else stays a plain database error.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            if db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation()
            {
                return AppError::ConstraintViolation(db.message().to_string());
            }
        }
        AppError::Database(err)
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
