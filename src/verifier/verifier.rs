//! Index identity verifier

use serde_json::Value;
use tracing::debug;

use super::errors::{VerifyError, VerifyResult};

/// Field under which index stages report the index they read
pub const INDEX_NAME_FIELD: &str = "indexName";

/// Checks that every stage reports the expected index name
#[derive(Debug, Clone)]
pub struct IndexNameVerifier {
    expected: String,
    stage_kind: String,
}

impl IndexNameVerifier {
    /// Creates a verifier for `expected`.
    ///
    /// `stage_kind` only labels the empty-input failure.
    pub fn new(expected: impl Into<String>, stage_kind: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            stage_kind: stage_kind.into(),
        }
    }

    /// Returns the expected index name
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Verifies the stages in order, stopping at the first failure.
    ///
    /// Returns the number of stages verified. An empty slice is a failure.
    pub fn verify(&self, stages: &[&Value]) -> VerifyResult<usize> {
        if stages.is_empty() {
            return Err(VerifyError::NoMatchingStages {
                stage: self.stage_kind.clone(),
            });
        }

        for stage in stages {
            self.verify_stage(stage)?;
        }

        debug!(
            event = "STAGES_VERIFIED",
            count = stages.len(),
            index = %self.expected,
        );
        Ok(stages.len())
    }

    fn verify_stage(&self, stage: &Value) -> VerifyResult<()> {
        let actual = stage
            .get(INDEX_NAME_FIELD)
            .ok_or_else(|| VerifyError::MissingIndexName {
                field: INDEX_NAME_FIELD.to_string(),
                stage: stage.clone(),
            })?;

        if actual.as_str() != Some(self.expected.as_str()) {
            return Err(VerifyError::IndexNameMismatch {
                expected: self.expected.clone(),
                actual: actual.clone(),
                stage: stage.clone(),
            });
        }

        Ok(())
    }
}
