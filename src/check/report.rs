//! Serialisable check report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::CheckResult;
use super::index_name::{CheckOutcome, IndexNameCheck};

/// Final status of a check run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Passed,
    Skipped,
    Failed,
}

/// Summary of one check run, printed by the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    pub collection: String,
    pub expected_index: String,
    pub target_stage: String,
    pub outcome: ReportStatus,
    pub stages_verified: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl CheckReport {
    /// Summarises the result of running `check`
    pub fn from_result(check: &IndexNameCheck, result: &CheckResult<CheckOutcome>) -> Self {
        let (outcome, stages_verified, reason, error_code) = match result {
            Ok(CheckOutcome::Passed { stages_verified }) => {
                (ReportStatus::Passed, *stages_verified, None, None)
            }
            Ok(CheckOutcome::Skipped { reason }) => {
                (ReportStatus::Skipped, 0, Some(reason.clone()), None)
            }
            Err(e) => (
                ReportStatus::Failed,
                0,
                Some(e.to_string()),
                Some(e.code().to_string()),
            ),
        };

        Self {
            collection: check.request().collection.clone(),
            expected_index: check.expected_index().to_string(),
            target_stage: check.target_stage().to_string(),
            outcome,
            stages_verified,
            reason,
            error_code,
            completed_at: Utc::now(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == ReportStatus::Failed
    }
}
