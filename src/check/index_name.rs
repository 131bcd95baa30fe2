//! Index-name check over explain output

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::explain::SLOT_BASED_PLAN_MARKER;
use crate::requestor::{ExplainRequest, ExplainSource, Hint};
use crate::stages::{get_plan_stages, is_ixscan, kind, winning_plan};
use crate::verifier::{IndexNameVerifier, VerifyError};

use super::errors::CheckResult;

/// Feature flag that enables the slot-based engine for all queries
pub const SBE_FULL_FLAG: &str = "featureFlagSbeFull";

/// How a check run ended, short of failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Every assertion held
    Passed { stages_verified: usize },
    /// The source cannot run the check; nothing was asserted
    Skipped { reason: String },
}

/// Verifies that index stages of a hinted query report the hinted index.
///
/// # Procedure
///
/// 1. Capability gate: skip unless the slot-based engine runs with every
///    required feature flag
/// 2. Run the request in explain mode
/// 3. The winning plan must contain an `IXSCAN`
/// 4. The winning plan must carry `slotBasedPlan` (unless disabled)
/// 5. Collect target stages from `executionStats.executionStages`
/// 6. Every collected stage must report the expected `indexName`
///
/// The first failure ends the run. Nothing is retried. Failures are
/// returned without logging; the caller reports them.
#[derive(Debug, Clone)]
pub struct IndexNameCheck {
    request: ExplainRequest,
    expected_index: String,
    target_stage: String,
    required_flags: Vec<String>,
    require_slot_based_plan: bool,
}

impl IndexNameCheck {
    /// Creates a check of `request` against `expected_index`, targeting
    /// `ixseek` stages and gated on [`SBE_FULL_FLAG`].
    pub fn new(request: ExplainRequest, expected_index: impl Into<String>) -> Self {
        Self {
            request,
            expected_index: expected_index.into(),
            target_stage: kind::sbe::IXSEEK.to_string(),
            required_flags: vec![SBE_FULL_FLAG.to_string()],
            require_slot_based_plan: true,
        }
    }

    /// Hinted point query on `field`, expecting the ascending index on it
    pub fn hinted(collection: &str, field: &str, value: Value) -> Self {
        let mut filter = Map::new();
        filter.insert(field.to_string(), value);
        let request = ExplainRequest::find(collection, Value::Object(filter))
            .with_hint(Hint::key(field, 1));
        Self::new(request, format!("{}_1", field))
    }

    pub fn with_target_stage(mut self, stage: impl Into<String>) -> Self {
        self.target_stage = stage.into();
        self
    }

    pub fn with_required_flags(mut self, flags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_slot_based_plan_required(mut self, required: bool) -> Self {
        self.require_slot_based_plan = required;
        self
    }

    pub fn request(&self) -> &ExplainRequest {
        &self.request
    }

    pub fn expected_index(&self) -> &str {
        &self.expected_index
    }

    pub fn target_stage(&self) -> &str {
        &self.target_stage
    }

    /// Runs the check against `source`
    pub fn run<S: ExplainSource + ?Sized>(&self, source: &mut S) -> CheckResult<CheckOutcome> {
        let capabilities = source.capabilities()?;
        if !capabilities.slot_based_enabled(&self.required_flags) {
            let reason = if !capabilities.slot_based_engine {
                "slot-based execution engine is not active".to_string()
            } else {
                let missing: Vec<&str> = self
                    .required_flags
                    .iter()
                    .map(String::as_str)
                    .filter(|f| !capabilities.feature_flags.contains(*f))
                    .collect();
                format!("required feature flags not enabled: {}", missing.join(", "))
            };
            info!(event = "CHECK_SKIPPED", reason = %reason);
            return Ok(CheckOutcome::Skipped { reason });
        }

        let document = source.explain(&self.request)?;

        let plan = winning_plan(document.query_planner());
        if !is_ixscan(plan) {
            return Err(VerifyError::NotIndexScan { plan: plan.clone() }.into());
        }

        if self.require_slot_based_plan && !document.has_slot_based_plan() {
            return Err(VerifyError::MissingEngineMarker {
                marker: SLOT_BASED_PLAN_MARKER.to_string(),
            }
            .into());
        }

        let execution_stages = document.execution_stages()?;
        let stages = get_plan_stages(execution_stages, &self.target_stage);

        let verifier = IndexNameVerifier::new(&self.expected_index, &self.target_stage);
        let stages_verified = verifier.verify(&stages)?;

        info!(
            event = "CHECK_PASSED",
            collection = %self.request.collection,
            index = %self.expected_index,
            stage = %self.target_stage,
            stages_verified,
        );
        Ok(CheckOutcome::Passed { stages_verified })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckError;
    use crate::explain::ExplainDocument;
    use crate::check::{CheckReport, ReportStatus};
    use crate::requestor::{EngineCapabilities, RecordedExplain, RequestError, RequestResult};
    use serde_json::json;

    /// Slot-based source whose explain command always fails
    struct RejectingSource;

    impl ExplainSource for RejectingSource {
        fn explain(&mut self, _: &ExplainRequest) -> RequestResult<ExplainDocument> {
            Err(RequestError::CommandFailed {
                code: 26,
                code_name: "NamespaceNotFound".into(),
                message: "collection c does not exist".into(),
            })
        }

        fn capabilities(&self) -> RequestResult<EngineCapabilities> {
            Ok(EngineCapabilities {
                slot_based_engine: true,
                feature_flags: [SBE_FULL_FLAG.to_string()].into_iter().collect(),
            })
        }
    }

    fn sbe_document(index_name: &str) -> ExplainDocument {
        ExplainDocument::from_value(json!({
            "queryPlanner": {
                "winningPlan": {
                    "queryPlan": {
                        "stage": "FETCH",
                        "inputStage": {"stage": "IXSCAN", "indexName": "a_1"}
                    },
                    "slotBasedPlan": {"slots": "", "stages": ""}
                }
            },
            "executionStats": {
                "executionStages": {
                    "stage": "nlj",
                    "outerStage": {"stage": "ixseek", "indexName": index_name},
                    "innerStage": {"stage": "limit", "inputStage": {"stage": "seek"}}
                }
            }
        }))
        .unwrap()
    }

    fn check() -> IndexNameCheck {
        IndexNameCheck::hinted("c", "a", json!(3))
    }

    #[test]
    fn test_passes_on_matching_stage() {
        let mut source = RecordedExplain::new(sbe_document("a_1")).with_feature_flags([SBE_FULL_FLAG]);
        assert_eq!(
            check().run(&mut source).unwrap(),
            CheckOutcome::Passed { stages_verified: 1 }
        );
    }

    #[test]
    fn test_skips_without_flag() {
        let mut source = RecordedExplain::new(sbe_document("b_1"));
        match check().run(&mut source).unwrap() {
            CheckOutcome::Skipped { reason } => assert!(reason.contains(SBE_FULL_FLAG)),
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn test_required_flags_configurable() {
        let mut source = RecordedExplain::new(sbe_document("a_1"));
        let outcome = check()
            .with_required_flags(Vec::<String>::new())
            .run(&mut source)
            .unwrap();
        assert_eq!(outcome, CheckOutcome::Passed { stages_verified: 1 });
    }

    #[test]
    fn test_mismatch_fails() {
        let mut source = RecordedExplain::new(sbe_document("b_1")).with_feature_flags([SBE_FULL_FLAG]);
        let err = check().run(&mut source).unwrap_err();
        assert_eq!(err.code(), "VERIFY_INDEX_NAME_MISMATCH");
    }

    #[test]
    fn test_missing_execution_stats() {
        let doc = ExplainDocument::from_value(json!({
            "queryPlanner": {
                "winningPlan": {
                    "queryPlan": {"stage": "IXSCAN", "indexName": "a_1"},
                    "slotBasedPlan": {}
                }
            }
        }))
        .unwrap();
        let mut source = RecordedExplain::new(doc).with_feature_flags([SBE_FULL_FLAG]);
        let err = check().run(&mut source).unwrap_err();
        assert!(matches!(err, CheckError::Explain(_)));
    }

    #[test]
    fn test_target_stage_configurable() {
        let mut source = RecordedExplain::new(sbe_document("a_1")).with_feature_flags([SBE_FULL_FLAG]);
        let err = check()
            .with_target_stage("ixscan")
            .run(&mut source)
            .unwrap_err();
        assert_eq!(err.code(), "VERIFY_NO_MATCHING_STAGES");
    }

    #[test]
    fn test_command_failure_reaches_report() {
        let check = check();
        let result = check.run(&mut RejectingSource);
        assert!(matches!(result, Err(CheckError::Command(_))));

        let report = CheckReport::from_result(&check, &result);
        assert_eq!(report.outcome, ReportStatus::Failed);
        assert_eq!(report.error_code.as_deref(), Some("REQUEST_COMMAND_FAILED"));
        assert!(report.reason.unwrap().contains("NamespaceNotFound"));
    }
}
