//! Error types for Quarry.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`QuarryError`]. None of these conditions are retried internally; they are
//! raised synchronously to the caller.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QuarryError>;

/// The error type for document store, filter and retrieval operations.
#[derive(Debug, Error)]
pub enum QuarryError {
    /// Malformed write input (not a list of documents, or an ill-formed document).
    #[error("validation error: {0}")]
    Validation(String),

    /// A document with the same ID already exists and the policy is `fail`.
    #[error("ID '{id}' already exists")]
    DuplicateDocument { id: String },

    /// A delete referenced an ID that is not in the store.
    #[error("ID '{id}' not found, cannot delete it")]
    MissingDocument { id: String },

    /// Malformed filter expression or an incompatible comparison.
    #[error("filter error: {0}")]
    Filter(String),

    /// Invalid store or retrieval configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QuarryError {
    /// Create a validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        QuarryError::Validation(msg.into())
    }

    /// Create a duplicate document error.
    pub fn duplicate_document<S: Into<String>>(id: S) -> Self {
        QuarryError::DuplicateDocument { id: id.into() }
    }

    /// Create a missing document error.
    pub fn missing_document<S: Into<String>>(id: S) -> Self {
        QuarryError::MissingDocument { id: id.into() }
    }

    /// Create a filter error.
    pub fn filter<S: Into<String>>(msg: S) -> Self {
        QuarryError::Filter(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        QuarryError::InvalidConfig(msg.into())
    }

    pub fn is_filter(&self) -> bool {
        matches!(self, QuarryError::Filter(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, QuarryError::Validation(_))
    }
}
