//! Explain document error types

use thiserror::Error;

/// Errors raised while reading an explain document
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExplainError {
    /// The document (or one of its sections) is not a JSON object
    #[error("explain output at '{path}' is not an object")]
    NotAnObject { path: String },

    /// A required section is absent
    #[error("explain output is missing '{path}'")]
    MissingSection { path: String },

    /// Input could not be parsed as JSON
    #[error("explain output is not valid JSON: {0}")]
    InvalidJson(String),

    /// Verbosity string not recognised
    #[error("unknown explain verbosity '{0}'")]
    UnknownVerbosity(String),
}

impl ExplainError {
    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            ExplainError::NotAnObject { .. } => "EXPLAIN_NOT_AN_OBJECT",
            ExplainError::MissingSection { .. } => "EXPLAIN_MISSING_SECTION",
            ExplainError::InvalidJson(_) => "EXPLAIN_INVALID_JSON",
            ExplainError::UnknownVerbosity(_) => "EXPLAIN_UNKNOWN_VERBOSITY",
        }
    }

    pub(crate) fn missing(path: impl Into<String>) -> Self {
        ExplainError::MissingSection { path: path.into() }
    }

    pub(crate) fn not_object(path: impl Into<String>) -> Self {
        ExplainError::NotAnObject { path: path.into() }
    }
}

impl From<serde_json::Error> for ExplainError {
    fn from(e: serde_json::Error) -> Self {
        ExplainError::InvalidJson(e.to_string())
    }
}

/// Result type for explain document operations
pub type ExplainResult<T> = Result<T, ExplainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ExplainError::missing("executionStats").code(), "EXPLAIN_MISSING_SECTION");
        assert_eq!(ExplainError::not_object("queryPlanner").code(), "EXPLAIN_NOT_AN_OBJECT");
        assert_eq!(
            ExplainError::UnknownVerbosity("loud".into()).code(),
            "EXPLAIN_UNKNOWN_VERBOSITY"
        );
    }

    #[test]
    fn test_error_display_names_path() {
        let display = ExplainError::missing("executionStats.executionStages").to_string();
        assert!(display.contains("executionStats.executionStages"));
    }
}
