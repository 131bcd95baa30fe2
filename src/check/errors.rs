//! Check failures

use thiserror::Error;

use crate::explain::ExplainError;
use crate::requestor::RequestError;
use crate::verifier::VerifyError;

/// A terminal failure of a check run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    /// The explain command (or capability query) failed
    #[error("explain command failed: {0}")]
    Command(#[from] RequestError),

    /// The explain document lacks a section the check reads
    #[error("malformed explain output: {0}")]
    Explain(#[from] ExplainError),

    /// An assertion on the explain output did not hold
    #[error("assertion failed: {0}")]
    Assertion(#[from] VerifyError),
}

impl CheckError {
    /// Stable code of the underlying failure
    pub fn code(&self) -> &'static str {
        match self {
            CheckError::Command(e) => e.code(),
            CheckError::Explain(e) => e.code(),
            CheckError::Assertion(e) => e.code(),
        }
    }
}

/// Result type for check runs
pub type CheckResult<T> = Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_delegates() {
        let err: CheckError = VerifyError::NoMatchingStages {
            stage: "ixseek".into(),
        }
        .into();
        assert_eq!(err.code(), "VERIFY_NO_MATCHING_STAGES");

        let err: CheckError = RequestError::invalid("bad").into();
        assert_eq!(err.code(), "REQUEST_INVALID");
    }
}
