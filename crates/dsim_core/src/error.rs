//! Error types for dsim core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in dsim core operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Codec error while serializing a key.
    #[error("codec error: {0}")]
    Codec(#[from] dsim_codec::CodecError),

    /// The caller passed an argument the store cannot accept.
    #[error("{message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The operation exists on the API surface but is not emulated.
    #[error("not implemented: {operation}")]
    NotImplemented {
        /// Name of the operation.
        operation: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// The project id could not be resolved.
    #[error("project id unavailable: {message}")]
    ProjectId {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a not implemented error.
    pub fn not_implemented(operation: impl Into<String>) -> Self {
        Self::NotImplemented {
            operation: operation.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a project id error.
    pub fn project_id(message: impl Into<String>) -> Self {
        Self::ProjectId {
            message: message.into(),
        }
    }

    /// Whether this is an [`CoreError::InvalidArgument`].
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}
