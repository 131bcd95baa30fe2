//! Verifier Tests
//!
//! Tests for verification invariants:
//! - Empty input is its own failure
//! - The first offending stage stops verification
//! - Failures carry the offending node

use ixexplain::explain::ExplainDocument;
use ixexplain::requestor::{ExplainRequest, ExplainSource, Hint, RecordedExplain};
use ixexplain::stages::get_plan_stages;
use ixexplain::verifier::{IndexNameVerifier, VerifyError};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn execution_tree(names: &[Value]) -> Value {
    let branches: Vec<Value> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let mut stage = json!({"stage": "ixseek", "planNodeId": i + 1});
            if !name.is_null() {
                stage["indexName"] = name.clone();
            }
            stage
        })
        .collect();
    json!({"stage": "union", "inputStages": branches})
}

// =============================================================================
// Fail-Fast Behavior
// =============================================================================

/// Empty stage list is NoMatchingStages, not a vacuous pass.
#[test]
fn test_empty_is_failure() {
    let verifier = IndexNameVerifier::new("a_1", "ixseek");
    let err = verifier.verify(&[]).unwrap_err();
    assert_eq!(
        err,
        VerifyError::NoMatchingStages {
            stage: "ixseek".into()
        }
    );
    assert!(err.offending_node().is_none());
}

/// The first bad stage is reported even when later ones are also bad.
#[test]
fn test_first_offender_reported() {
    let tree = execution_tree(&[json!("a_1"), json!("b_1"), Value::Null]);
    let stages = get_plan_stages(&tree, "ixseek");

    let err = IndexNameVerifier::new("a_1", "ixseek")
        .verify(&stages)
        .unwrap_err();
    assert_eq!(err.code(), "VERIFY_INDEX_NAME_MISMATCH");
    assert_eq!(err.offending_node().unwrap()["planNodeId"], 2);
}

/// A stage without indexName is reported with the node.
#[test]
fn test_missing_index_name() {
    let tree = execution_tree(&[Value::Null, json!("a_1")]);
    let stages = get_plan_stages(&tree, "ixseek");

    let err = IndexNameVerifier::new("a_1", "ixseek")
        .verify(&stages)
        .unwrap_err();
    assert_eq!(err.code(), "VERIFY_MISSING_INDEX_NAME");
    assert_eq!(err.offending_node().unwrap()["planNodeId"], 1);
}

/// Non-string index names never match.
#[test]
fn test_non_string_index_name() {
    let tree = execution_tree(&[json!(1)]);
    let stages = get_plan_stages(&tree, "ixseek");
    let err = IndexNameVerifier::new("1", "ixseek")
        .verify(&stages)
        .unwrap_err();
    assert_eq!(err.code(), "VERIFY_INDEX_NAME_MISMATCH");
}

/// All matching stages pass and are counted.
#[test]
fn test_all_match() {
    let tree = execution_tree(&[json!("a_1"), json!("a_1"), json!("a_1")]);
    let stages = get_plan_stages(&tree, "ixseek");
    assert_eq!(IndexNameVerifier::new("a_1", "ixseek").verify(&stages).unwrap(), 3);
}

// =============================================================================
// Captured Documents
// =============================================================================

/// A captured document is served as-is and verified like a live one.
#[test]
fn test_recorded_document() {
    let captured = json!({
        "explainVersion": "2",
        "queryPlanner": {
            "winningPlan": {
                "queryPlan": {"stage": "FETCH", "inputStage": {"stage": "IXSCAN", "indexName": "a_1"}},
                "slotBasedPlan": {"slots": "", "stages": ""}
            }
        },
        "executionStats": {"executionStages": execution_tree(&[json!("a_1")])}
    });
    let mut source = RecordedExplain::new(ExplainDocument::from_value(captured).unwrap());

    let request = ExplainRequest::find("c", json!({"a": 3})).with_hint(Hint::key("a", 1));
    let document = source.explain(&request).unwrap();
    let stages = get_plan_stages(document.execution_stages().unwrap(), "ixseek");
    assert_eq!(IndexNameVerifier::new("a_1", "ixseek").verify(&stages).unwrap(), 1);

    assert!(source.capabilities().unwrap().slot_based_engine);
}
