//! Error types for name parsing.

use thiserror::Error;

/// Errors that can occur when parsing a generated name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The name string is empty.
    #[error("name cannot be empty")]
    Empty,

    /// The name does not start with the shared marker.
    #[error("name '{0}' is not a generated fixture name")]
    MissingMarker(String),

    /// The name has the wrong kind.
    #[error("invalid name kind: expected '{expected}', got '{actual}'")]
    InvalidKind {
        expected: &'static str,
        actual: String,
    },

    /// The ULID portion of the name is invalid.
    #[error("invalid ULID: {0}")]
    InvalidUlid(String),
}

impl NameError {
    /// Returns true if this error indicates a kind mismatch.
    pub fn is_kind_error(&self) -> bool {
        matches!(self, NameError::InvalidKind { .. })
    }
}
