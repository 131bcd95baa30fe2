//! Assertion failures raised by the verifier

use serde_json::Value;
use thiserror::Error;

/// A failed assertion against explain output.
///
/// Every variant carries the JSON node that failed so the caller can
/// report it verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerifyError {
    /// No stage of the target kind was found
    #[error("no '{stage}' stage found in explain output")]
    NoMatchingStages { stage: String },

    /// A stage does not carry an index name
    #[error("stage has no '{field}' field: {stage}")]
    MissingIndexName { field: String, stage: Value },

    /// A stage reports a different index
    #[error("expected index '{expected}' but stage reports {actual}: {stage}")]
    IndexNameMismatch {
        expected: String,
        actual: Value,
        stage: Value,
    },

    /// The winning plan does not read an index
    #[error("winning plan does not contain an index scan: {plan}")]
    NotIndexScan { plan: Value },

    /// The winning plan lacks the engine marker
    #[error("winning plan is missing '{marker}'")]
    MissingEngineMarker { marker: String },
}

impl VerifyError {
    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            VerifyError::NoMatchingStages { .. } => "VERIFY_NO_MATCHING_STAGES",
            VerifyError::MissingIndexName { .. } => "VERIFY_MISSING_INDEX_NAME",
            VerifyError::IndexNameMismatch { .. } => "VERIFY_INDEX_NAME_MISMATCH",
            VerifyError::NotIndexScan { .. } => "VERIFY_NOT_INDEX_SCAN",
            VerifyError::MissingEngineMarker { .. } => "VERIFY_MISSING_ENGINE_MARKER",
        }
    }

    /// The offending node, if the failure is tied to one
    pub fn offending_node(&self) -> Option<&Value> {
        match self {
            VerifyError::MissingIndexName { stage, .. }
            | VerifyError::IndexNameMismatch { stage, .. } => Some(stage),
            VerifyError::NotIndexScan { plan } => Some(plan),
            _ => None,
        }
    }
}

/// Result type for verification
pub type VerifyResult<T> = Result<T, VerifyError>;
