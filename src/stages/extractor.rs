//! Stage collection over explain trees

use serde_json::Value;

use super::kind;

/// Keys under which a stage node holds child stages, in visiting order.
pub const CHILD_KEYS: [&str; 7] = [
    "inputStage",
    "inputStages",
    "queryPlan",
    "thenStage",
    "elseStage",
    "outerStage",
    "innerStage",
];

/// Returns the stage-kind tag of a node (`stage`, falling back to `nodeType`)
pub fn stage_kind(node: &Value) -> Option<&str> {
    node.get("stage")
        .or_else(|| node.get("nodeType"))
        .and_then(Value::as_str)
}

/// Collects every node matching `predicate`, pre-order.
pub fn collect_stages<'a, F>(root: &'a Value, predicate: F) -> Vec<&'a Value>
where
    F: Fn(&Value) -> bool,
{
    let mut out = Vec::new();
    walk(root, &predicate, &mut out);
    out
}

/// Collects every node whose stage kind equals `stage`, pre-order.
pub fn get_plan_stages<'a>(root: &'a Value, stage: &str) -> Vec<&'a Value> {
    collect_stages(root, |node| stage_kind(node) == Some(stage))
}

/// Collects every index-reading stage of either engine, pre-order.
pub fn index_access_stages(root: &Value) -> Vec<&Value> {
    collect_stages(root, |node| stage_kind(node).is_some_and(kind::is_index_access))
}

/// Returns true if any node in the tree has the given stage kind
pub fn plan_has_stage(root: &Value, stage: &str) -> bool {
    !get_plan_stages(root, stage).is_empty()
}

/// Returns true if the plan reads an index with a classic `IXSCAN`
pub fn is_ixscan(root: &Value) -> bool {
    plan_has_stage(root, kind::IXSCAN)
}

/// Returns true if the plan scans the whole collection
pub fn is_collscan(root: &Value) -> bool {
    plan_has_stage(root, kind::COLLSCAN)
}

/// Unwraps the winning plan from a `queryPlanner` section.
///
/// Slot-based output nests the query solution under `queryPlan` next to
/// the compiled plan; classic output is the solution itself.
pub fn winning_plan(query_planner: &Value) -> &Value {
    let winning = &query_planner["winningPlan"];
    match winning.get("queryPlan") {
        Some(plan) if winning.get("shards").is_none() => plan,
        _ => winning,
    }
}

fn walk<'a, F>(node: &'a Value, predicate: &F, out: &mut Vec<&'a Value>)
where
    F: Fn(&Value) -> bool,
{
    let Some(obj) = node.as_object() else {
        return;
    };

    if predicate(node) {
        out.push(node);
    }

    for key in CHILD_KEYS {
        match obj.get(key) {
            Some(Value::Array(children)) => {
                for child in children {
                    walk(child, predicate, out);
                }
            }
            Some(child) => walk(child, predicate, out),
            None => {}
        }
    }

    if let Some(Value::Array(shards)) = obj.get("shards") {
        for shard in shards {
            let root = shard
                .get("winningPlan")
                .or_else(|| shard.get("executionStages"))
                .unwrap_or(shard);
            walk(root, predicate, out);
        }
    }
}
