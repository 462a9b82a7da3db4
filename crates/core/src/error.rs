//! Store error model.

use thiserror::Error;

/// Result type used across the store.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level error.
///
/// Validation failures are raised before any mutation is applied. Storage
/// faults are carried as text so this crate stays free of driver types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A write violates a field constraint.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// No record exists with the requested id.
    #[error("not found")]
    NotFound,

    /// The persistence layer could not be opened, read or written.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl StoreError {
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub fn storage(err: impl core::fmt::Display) -> Self {
        Self::StorageUnavailable(err.to_string())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Name of the offending field, for `InvalidField` errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidField { field, .. } => Some(*field),
            _ => None,
        }
    }
}
