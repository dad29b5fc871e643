//! Value-level error model.

use thiserror::Error;

/// Result type used for parsing and constructing core values.
pub type CoreResult<T> = Result<T, CoreError>;

/// Failure to build one of the core identifiers.
///
/// Authorization failures live one layer up (`accessgate-policy`); this enum
/// only covers malformed input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An account/target identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A role was neither a reserved name nor an integer.
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// An operation identifier was not 4 bytes of hex.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl CoreError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_role(msg: impl Into<String>) -> Self {
        Self::InvalidRole(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}
