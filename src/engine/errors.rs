//! Engine error types
//!
//! Numeric codes and code names follow the server convention so that a
//! failure from the in-process engine reads the same as one from a server.

use thiserror::Error;

use crate::requestor::RequestError;

/// Engine command failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Malformed argument (filter, hint, key pattern)
    #[error("{0}")]
    BadValue(String),

    /// Collection does not exist
    #[error("collection '{0}' does not exist")]
    NamespaceNotFound(String),

    /// Index specification cannot be built
    #[error("cannot create index: {0}")]
    CannotCreateIndex(String),

    /// An index with the same name but different spec exists
    #[error("index already exists with different options: {0}")]
    IndexOptionsConflict(String),

    /// Unique `_id` constraint violated
    #[error("E11000 duplicate key error collection: {collection} index: _id_ dup key: {key}")]
    DuplicateKey { collection: String, key: String },
}

impl EngineError {
    /// Numeric error code
    pub fn code(&self) -> i32 {
        match self {
            EngineError::BadValue(_) => 2,
            EngineError::NamespaceNotFound(_) => 26,
            EngineError::CannotCreateIndex(_) => 67,
            EngineError::IndexOptionsConflict(_) => 85,
            EngineError::DuplicateKey { .. } => 11000,
        }
    }

    /// Error code name
    pub fn code_name(&self) -> &'static str {
        match self {
            EngineError::BadValue(_) => "BadValue",
            EngineError::NamespaceNotFound(_) => "NamespaceNotFound",
            EngineError::CannotCreateIndex(_) => "CannotCreateIndex",
            EngineError::IndexOptionsConflict(_) => "IndexOptionsConflict",
            EngineError::DuplicateKey { .. } => "DuplicateKey",
        }
    }

    pub fn bad_value(reason: impl Into<String>) -> Self {
        EngineError::BadValue(reason.into())
    }
}

impl From<EngineError> for RequestError {
    fn from(e: EngineError) -> Self {
        RequestError::CommandFailed {
            code: e.code(),
            code_name: e.code_name().to_string(),
            message: e.to_string(),
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_server_convention() {
        assert_eq!(EngineError::bad_value("x").code(), 2);
        assert_eq!(EngineError::NamespaceNotFound("c".into()).code(), 26);
        assert_eq!(EngineError::CannotCreateIndex("x".into()).code(), 67);
        assert_eq!(EngineError::IndexOptionsConflict("x".into()).code(), 85);
        assert_eq!(
            EngineError::DuplicateKey {
                collection: "test.c".into(),
                key: "1".into()
            }
            .code(),
            11000
        );
    }

    #[test]
    fn test_into_command_failure() {
        let err: RequestError = EngineError::bad_value("bad hint").into();
        assert_eq!(
            err,
            RequestError::CommandFailed {
                code: 2,
                code_name: "BadValue".into(),
                message: "bad hint".into(),
            }
        );
    }
}
