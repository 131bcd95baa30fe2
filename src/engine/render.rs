//! Explain output rendering
//!
//! Classic output reports the query solution tree directly, and the
//! execution statistics mirror it stage for stage (`IXSCAN`, `FETCH`, ...).
//!
//! Slot-based output wraps the solution under `winningPlan.queryPlan`,
//! adds the compiled plan under `winningPlan.slotBasedPlan`, and reports
//! statistics for the lowered stage tree (`ixseek`, `nlj`, `seek`, ...).
//! Both trees carry `planNodeId` so lowered stages can be traced back to
//! the solution node they came from.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::explain::{Verbosity, SLOT_BASED_PLAN_MARKER};
use crate::stages::{kind, CHILD_KEYS};

use super::executor::{ExecutionOutput, StageDetail, StageStats};
use super::filter::MatchExpr;
use super::planner::PlanNode;

/// Execution engine that ran the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Classic,
    SlotBased,
}

impl ExecutionMode {
    fn explain_version(&self) -> &'static str {
        match self {
            ExecutionMode::Classic => "1",
            ExecutionMode::SlotBased => "2",
        }
    }
}

/// Inputs to a single explain document
pub struct ExplainInputs<'a> {
    pub namespace: &'a str,
    pub command: Value,
    pub parsed_query: &'a MatchExpr,
    pub plan: &'a PlanNode,
    pub execution: &'a ExecutionOutput,
    pub verbosity: Verbosity,
}

/// Renders explain documents for one execution mode
pub struct ExplainRenderer {
    mode: ExecutionMode,
}

impl ExplainRenderer {
    pub fn new(mode: ExecutionMode) -> Self {
        Self { mode }
    }

    pub fn render(&self, inputs: &ExplainInputs<'_>) -> Value {
        let solution = plan_value(inputs.plan, self.ids());

        let winning_plan = match self.mode {
            ExecutionMode::Classic => solution,
            ExecutionMode::SlotBased => {
                let lowered = lower(inputs.plan, &inputs.execution.stats, &mut 0);
                let mut debug = String::new();
                debug_print(&lowered, 0, &mut debug);
                let mut wrapped = Map::new();
                wrapped.insert("queryPlan".into(), solution);
                wrapped.insert(
                    SLOT_BASED_PLAN_MARKER.into(),
                    json!({ "slots": "$$RESULT=s1 env: { }", "stages": debug }),
                );
                Value::Object(wrapped)
            }
        };

        let mut document = Map::new();
        document.insert("explainVersion".into(), json!(self.mode.explain_version()));
        document.insert(
            "queryPlanner".into(),
            json!({
                "namespace": inputs.namespace,
                "indexFilterSet": false,
                "parsedQuery": inputs.parsed_query.to_value(),
                "maxIndexedOrSolutionsReached": false,
                "maxIndexedAndSolutionsReached": false,
                "maxScansToExplodeReached": false,
                "winningPlan": winning_plan,
                "rejectedPlans": [],
            }),
        );

        if inputs.verbosity.includes_execution_stats() {
            document.insert("executionStats".into(), self.execution_stats(inputs));
        }

        document.insert("command".into(), inputs.command.clone());
        document.insert("ok".into(), json!(1.0));
        Value::Object(document)
    }

    fn ids(&self) -> Option<u64> {
        match self.mode {
            ExecutionMode::Classic => None,
            ExecutionMode::SlotBased => Some(0),
        }
    }

    fn execution_stats(&self, inputs: &ExplainInputs<'_>) -> Value {
        let execution = inputs.execution;
        let stages = match self.mode {
            ExecutionMode::Classic => classic_stats(inputs.plan, &execution.stats),
            ExecutionMode::SlotBased => lower(inputs.plan, &execution.stats, &mut 0),
        };

        let mut stats = json!({
            "executionSuccess": true,
            "nReturned": execution.n_returned(),
            "executionTimeMillis": execution.execution_time_millis,
            "totalKeysExamined": execution.stats.total_keys_examined(),
            "totalDocsExamined": execution.stats.total_docs_examined(),
            "executionStages": stages,
        });
        if inputs.verbosity == Verbosity::AllPlansExecution {
            stats["allPlansExecution"] = json!([]);
        }
        stats
    }
}

/// Solution tree; `next_id` numbers nodes pre-order when present
fn plan_value(node: &PlanNode, next_id: Option<u64>) -> Value {
    let mut counter = next_id;
    plan_value_inner(node, &mut counter)
}

fn plan_value_inner(node: &PlanNode, counter: &mut Option<u64>) -> Value {
    let mut out = Map::new();
    out.insert("stage".into(), json!(stage_name(node)));
    if let Some(id) = counter.as_mut() {
        *id += 1;
        out.insert("planNodeId".into(), json!(*id));
    }

    match node {
        PlanNode::CollScan { filter, direction } => {
            insert_filter(&mut out, filter);
            out.insert("direction".into(), json!(direction_name(*direction)));
        }
        PlanNode::IxScan { .. } => index_fields(node, &mut out),
        PlanNode::Fetch { filter, input } => {
            insert_filter(&mut out, filter);
            out.insert("inputStage".into(), plan_value_inner(input, counter));
        }
        PlanNode::Or { inputs } => {
            let children: Vec<Value> = inputs
                .iter()
                .map(|i| plan_value_inner(i, counter))
                .collect();
            out.insert("inputStages".into(), Value::Array(children));
        }
    }

    Value::Object(out)
}

fn classic_stats(node: &PlanNode, stats: &StageStats) -> Value {
    let mut out = Map::new();
    out.insert("stage".into(), json!(stage_name(node)));
    if let PlanNode::CollScan { filter, .. } | PlanNode::Fetch { filter, .. } = node {
        insert_filter(&mut out, filter);
    }
    out.insert("nReturned".into(), json!(stats.n_returned));
    out.insert(
        "executionTimeMillisEstimate".into(),
        json!(stats.execution_time_millis),
    );
    out.insert("works".into(), json!(stats.works));
    out.insert("advanced".into(), json!(stats.advanced));
    out.insert(
        "needTime".into(),
        json!(stats.works.saturating_sub(stats.advanced + 1)),
    );
    out.insert("needYield".into(), json!(0));
    out.insert("saveState".into(), json!(0));
    out.insert("restoreState".into(), json!(0));
    out.insert("isEOF".into(), json!(u8::from(stats.is_eof)));

    match (&stats.detail, node) {
        (StageDetail::CollScan { docs_examined, direction }, _) => {
            out.insert("direction".into(), json!(direction_name(*direction)));
            out.insert("docsExamined".into(), json!(docs_examined));
        }
        (
            StageDetail::IxScan {
                keys_examined,
                seeks,
                dups_tested,
                dups_dropped,
                ..
            },
            _,
        ) => {
            index_fields(node, &mut out);
            out.insert("keysExamined".into(), json!(keys_examined));
            out.insert("seeks".into(), json!(seeks));
            out.insert("dupsTested".into(), json!(dups_tested));
            out.insert("dupsDropped".into(), json!(dups_dropped));
        }
        (StageDetail::Fetch { docs_examined }, PlanNode::Fetch { input, .. }) => {
            out.insert("docsExamined".into(), json!(docs_examined));
            out.insert("alreadyHasObj".into(), json!(0));
            if let Some(child) = stats.children.first() {
                out.insert("inputStage".into(), classic_stats(input, child));
            }
        }
        (
            StageDetail::Or {
                dups_tested,
                dups_dropped,
            },
            PlanNode::Or { inputs },
        ) => {
            out.insert("dupsTested".into(), json!(dups_tested));
            out.insert("dupsDropped".into(), json!(dups_dropped));
            let children: Vec<Value> = inputs
                .iter()
                .zip(&stats.children)
                .map(|(i, s)| classic_stats(i, s))
                .collect();
            out.insert("inputStages".into(), Value::Array(children));
        }
        _ => {}
    }

    Value::Object(out)
}

/// Lowers a solution node and its statistics to slot-based stages
fn lower(node: &PlanNode, stats: &StageStats, next_id: &mut u64) -> Value {
    *next_id += 1;
    let id = *next_id;

    match (node, &stats.detail) {
        (
            PlanNode::IxScan {
                index, intervals, ..
            },
            StageDetail::IxScan {
                keys_examined,
                seeks,
                ..
            },
        ) => {
            let full = intervals.len() == 1 && intervals[0].is_full_range();
            let name = if full { kind::sbe::IXSCAN } else { kind::sbe::IXSEEK };
            let mut out = sbe_common(name, id, stats.n_returned, stats.execution_time_millis);
            out.insert("indexName".into(), json!(index.name));
            out.insert("keysExamined".into(), json!(keys_examined));
            out.insert("seeks".into(), json!(seeks));
            out.insert("numReads".into(), json!(keys_examined));
            Value::Object(out)
        }
        (PlanNode::Fetch { filter, input }, StageDetail::Fetch { docs_examined }) => {
            let outer = match stats.children.first() {
                Some(child) => lower(input, child, next_id),
                None => Value::Null,
            };

            let mut seek = sbe_common(kind::sbe::SEEK, id, *docs_examined, 0);
            seek.insert("numReads".into(), json!(docs_examined));

            let mut limit = sbe_common(kind::sbe::LIMIT, id, *docs_examined, 0);
            limit.insert("limit".into(), json!(1));
            limit.insert("inputStage".into(), Value::Object(seek));

            let mut nlj = sbe_common(
                kind::sbe::NLJ,
                id,
                *docs_examined,
                stats.execution_time_millis,
            );
            nlj.insert("totalDocsExamined".into(), json!(stats.total_docs_examined()));
            nlj.insert("totalKeysExamined".into(), json!(stats.total_keys_examined()));
            nlj.insert("collectionScans".into(), json!(0));
            nlj.insert("collectionSeeks".into(), json!(docs_examined));
            nlj.insert("innerOpens".into(), json!(docs_examined));
            nlj.insert("innerCloses".into(), json!(1));
            nlj.insert("outerStage".into(), outer);
            nlj.insert("innerStage".into(), Value::Object(limit));

            wrap_filter(filter, id, stats, *docs_examined, nlj)
        }
        (PlanNode::Or { inputs }, StageDetail::Or { dups_tested, dups_dropped }) => {
            let children: Vec<Value> = inputs
                .iter()
                .zip(&stats.children)
                .map(|(i, s)| lower(i, s, next_id))
                .collect();

            let mut union = sbe_common(kind::sbe::UNION, id, *dups_tested, 0);
            union.insert("inputStages".into(), Value::Array(children));

            let mut unique = sbe_common(
                kind::sbe::UNIQUE,
                id,
                stats.n_returned,
                stats.execution_time_millis,
            );
            unique.insert("dupsTested".into(), json!(dups_tested));
            unique.insert("dupsDropped".into(), json!(dups_dropped));
            unique.insert("inputStage".into(), Value::Object(union));
            Value::Object(unique)
        }
        (PlanNode::CollScan { filter, .. }, StageDetail::CollScan { docs_examined, .. }) => {
            let mut scan = sbe_common(
                kind::sbe::SCAN,
                id,
                *docs_examined,
                stats.execution_time_millis,
            );
            scan.insert("numReads".into(), json!(docs_examined));
            wrap_filter(filter, id, stats, *docs_examined, scan)
        }
        _ => Value::Null,
    }
}

fn wrap_filter(
    filter: &MatchExpr,
    id: u64,
    stats: &StageStats,
    tested: u64,
    input: Map<String, Value>,
) -> Value {
    if filter.is_empty() {
        return Value::Object(input);
    }
    let mut out = sbe_common(
        kind::sbe::FILTER,
        id,
        stats.n_returned,
        stats.execution_time_millis,
    );
    out.insert("numTested".into(), json!(tested));
    out.insert("inputStage".into(), Value::Object(input));
    Value::Object(out)
}

fn sbe_common(stage: &str, id: u64, n_returned: u64, millis: u64) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("stage".into(), json!(stage));
    out.insert("planNodeId".into(), json!(id));
    out.insert("nReturned".into(), json!(n_returned));
    out.insert("executionTimeMillisEstimate".into(), json!(millis));
    out.insert("opens".into(), json!(1));
    out.insert("closes".into(), json!(1));
    out.insert("saveState".into(), json!(0));
    out.insert("restoreState".into(), json!(0));
    out.insert("isEOF".into(), json!(1));
    out
}

fn index_fields(node: &PlanNode, out: &mut Map<String, Value>) {
    let PlanNode::IxScan {
        index,
        intervals,
        multikey,
    } = node
    else {
        return;
    };

    let bounds: Vec<Value> = intervals
        .iter()
        .map(|i| json!(i.render(index.direction)))
        .collect();
    let mut index_bounds = Map::new();
    index_bounds.insert(index.field.clone(), Value::Array(bounds));

    out.insert("keyPattern".into(), index.key_pattern());
    out.insert("indexName".into(), json!(index.name));
    out.insert("isMultiKey".into(), json!(multikey));
    out.insert("isUnique".into(), json!(index.field == "_id"));
    out.insert("isSparse".into(), json!(false));
    out.insert("isPartial".into(), json!(false));
    out.insert("indexVersion".into(), json!(2));
    out.insert("direction".into(), json!("forward"));
    out.insert("indexBounds".into(), Value::Object(index_bounds));
}

fn insert_filter(out: &mut Map<String, Value>, filter: &MatchExpr) {
    if !filter.is_empty() {
        out.insert("filter".into(), filter.to_value());
    }
}

fn stage_name(node: &PlanNode) -> &'static str {
    match node {
        PlanNode::CollScan { .. } => kind::COLLSCAN,
        PlanNode::IxScan { .. } => kind::IXSCAN,
        PlanNode::Fetch { .. } => kind::FETCH,
        PlanNode::Or { .. } => kind::OR,
    }
}

fn direction_name(direction: i64) -> &'static str {
    if direction < 0 {
        "backward"
    } else {
        "forward"
    }
}

/// Indented one-line-per-stage listing of a lowered tree
fn debug_print(node: &Value, depth: usize, out: &mut String) {
    let Some(obj) = node.as_object() else {
        return;
    };

    out.push_str(&"    ".repeat(depth));
    out.push_str(&format!(
        "[{}] {}",
        obj.get("planNodeId").and_then(Value::as_u64).unwrap_or(0),
        obj.get("stage").and_then(Value::as_str).unwrap_or("?"),
    ));
    if let Some(index) = obj.get("indexName").and_then(Value::as_str) {
        out.push_str(&format!(" \"{}\"", index));
    }
    out.push('\n');

    for key in CHILD_KEYS {
        match obj.get(key) {
            Some(Value::Array(children)) => {
                for child in children {
                    debug_print(child, depth + 1, out);
                }
            }
            Some(child) => debug_print(child, depth + 1, out),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::collection::Collection;
    use crate::engine::executor::QueryExecutor;
    use crate::engine::planner::QueryPlanner;
    use crate::requestor::Hint;
    use crate::stages::get_plan_stages;

    fn render(mode: ExecutionMode, filter: Value, hint: Option<Hint>, verbosity: Verbosity) -> Value {
        let mut coll = Collection::new("test.c");
        coll.create_index(json!({"a": 1}).as_object().unwrap()).unwrap();
        coll.create_index(json!({"b": 1}).as_object().unwrap()).unwrap();
        for (i, a) in [1, 2, 3, 4].iter().enumerate() {
            coll.insert(json!({"_id": i, "a": a, "b": i % 2})).unwrap();
        }

        let expr = MatchExpr::parse(&filter).unwrap();
        let plan = QueryPlanner::new(&coll).plan(&expr, hint.as_ref()).unwrap();
        let execution = QueryExecutor::new(&coll).execute(&plan).unwrap();

        ExplainRenderer::new(mode).render(&ExplainInputs {
            namespace: "test.c",
            command: json!({"find": "c"}),
            parsed_query: &expr,
            plan: &plan,
            execution: &execution,
            verbosity,
        })
    }

    #[test]
    fn test_classic_shape() {
        let doc = render(
            ExecutionMode::Classic,
            json!({"a": 3}),
            Some(Hint::key("a", 1)),
            Verbosity::ExecutionStats,
        );

        assert_eq!(doc["explainVersion"], "1");
        let winning = &doc["queryPlanner"]["winningPlan"];
        assert_eq!(winning["stage"], "FETCH");
        assert_eq!(winning["inputStage"]["stage"], "IXSCAN");
        assert_eq!(winning["inputStage"]["indexBounds"]["a"], json!(["[3, 3]"]));
        assert!(winning.get("slotBasedPlan").is_none());
        assert!(winning.get("planNodeId").is_none());

        let stages = &doc["executionStats"]["executionStages"];
        assert_eq!(stages["docsExamined"], 1);
        assert_eq!(stages["inputStage"]["indexName"], "a_1");
        assert_eq!(stages["inputStage"]["keysExamined"], 1);
        assert_eq!(doc["executionStats"]["nReturned"], 1);
    }

    #[test]
    fn test_slot_based_shape() {
        let doc = render(
            ExecutionMode::SlotBased,
            json!({"a": 3}),
            Some(Hint::key("a", 1)),
            Verbosity::ExecutionStats,
        );

        assert_eq!(doc["explainVersion"], "2");
        let winning = &doc["queryPlanner"]["winningPlan"];
        assert_eq!(winning["queryPlan"]["stage"], "FETCH");
        assert_eq!(winning["queryPlan"]["planNodeId"], 1);
        assert_eq!(winning["queryPlan"]["inputStage"]["planNodeId"], 2);
        let debug = winning["slotBasedPlan"]["stages"].as_str().unwrap();
        assert!(debug.contains("ixseek \"a_1\""));

        let stages = &doc["executionStats"]["executionStages"];
        assert_eq!(stages["stage"], "nlj");
        assert_eq!(stages["outerStage"]["stage"], "ixseek");
        assert_eq!(stages["outerStage"]["indexName"], "a_1");
        assert_eq!(stages["outerStage"]["planNodeId"], 2);
        assert_eq!(stages["innerStage"]["inputStage"]["stage"], "seek");
    }

    #[test]
    fn test_full_range_lowers_to_ixscan() {
        let doc = render(
            ExecutionMode::SlotBased,
            json!({}),
            Some(Hint::key("a", 1)),
            Verbosity::ExecutionStats,
        );
        let stages = &doc["executionStats"]["executionStages"];
        assert_eq!(get_plan_stages(stages, "ixscan").len(), 1);
        assert!(get_plan_stages(stages, "ixseek").is_empty());
    }

    #[test]
    fn test_residual_filter_wraps_nlj() {
        let doc = render(
            ExecutionMode::SlotBased,
            json!({"a": {"$gte": 2}}),
            Some(Hint::key("a", 1)),
            Verbosity::ExecutionStats,
        );
        let stages = &doc["executionStats"]["executionStages"];
        assert_eq!(stages["stage"], "filter");
        assert_eq!(stages["inputStage"]["stage"], "nlj");
        assert_eq!(stages["nReturned"], 3);
    }

    #[test]
    fn test_or_lowering_keeps_every_branch() {
        let doc = render(
            ExecutionMode::SlotBased,
            json!({"$or": [{"a": 1}, {"b": 1}]}),
            None,
            Verbosity::ExecutionStats,
        );
        let stages = &doc["executionStats"]["executionStages"];
        let seeks = get_plan_stages(stages, "ixseek");
        let names: Vec<&str> = seeks.iter().map(|s| s["indexName"].as_str().unwrap()).collect();
        assert_eq!(names, ["a_1", "b_1"]);

        let plan = &doc["queryPlanner"]["winningPlan"]["queryPlan"];
        assert_eq!(get_plan_stages(plan, "IXSCAN").len(), 2);
    }

    #[test]
    fn test_query_planner_verbosity_has_no_stats() {
        let doc = render(
            ExecutionMode::SlotBased,
            json!({"a": 3}),
            Some(Hint::key("a", 1)),
            Verbosity::QueryPlanner,
        );
        assert!(doc.get("executionStats").is_none());
        assert!(doc["queryPlanner"]["winningPlan"].get("slotBasedPlan").is_some());
    }

    #[test]
    fn test_all_plans_execution_section() {
        let doc = render(
            ExecutionMode::Classic,
            json!({"a": 3}),
            None,
            Verbosity::AllPlansExecution,
        );
        assert_eq!(doc["executionStats"]["allPlansExecution"], json!([]));
    }
}
