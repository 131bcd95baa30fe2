//! Requestor error types

use thiserror::Error;

use crate::explain::ExplainError;

/// Errors surfaced by an explain source
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    /// The engine rejected the command
    #[error("command failed with {code_name} ({code}): {message}")]
    CommandFailed {
        code: i32,
        code_name: String,
        message: String,
    },

    /// The request itself is malformed
    #[error("invalid explain request: {0}")]
    InvalidRequest(String),

    /// The engine answered with an unusable document
    #[error(transparent)]
    Explain(#[from] ExplainError),
}

impl RequestError {
    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            RequestError::CommandFailed { .. } => "REQUEST_COMMAND_FAILED",
            RequestError::InvalidRequest(_) => "REQUEST_INVALID",
            RequestError::Explain(e) => e.code(),
        }
    }

    /// Creates an invalid request error
    pub fn invalid(reason: impl Into<String>) -> Self {
        RequestError::InvalidRequest(reason.into())
    }
}

/// Result type for requestor operations
pub type RequestResult<T> = Result<T, RequestError>;
