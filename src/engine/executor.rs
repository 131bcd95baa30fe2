//! Plan execution with per-stage statistics
//!
//! Execution is materialised: each stage produces its full list of record
//! ids before the parent runs. The statistics tree mirrors the plan tree
//! node for node.

use std::collections::HashSet;
use std::time::Instant;

use serde_json::Value;

use super::collection::Collection;
use super::errors::{EngineError, EngineResult};
use super::index::RecordId;
use super::planner::PlanNode;

/// Stage-specific counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageDetail {
    CollScan {
        docs_examined: u64,
        direction: i64,
    },
    IxScan {
        index_name: String,
        keys_examined: u64,
        seeks: u64,
        dups_tested: u64,
        dups_dropped: u64,
    },
    Fetch {
        docs_examined: u64,
    },
    Or {
        dups_tested: u64,
        dups_dropped: u64,
    },
}

/// Runtime statistics for one plan node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStats {
    pub n_returned: u64,
    pub works: u64,
    pub advanced: u64,
    pub is_eof: bool,
    pub execution_time_millis: u64,
    pub detail: StageDetail,
    pub children: Vec<StageStats>,
}

impl StageStats {
    fn sum<F: Fn(&StageDetail) -> u64>(&self, f: &F) -> u64 {
        f(&self.detail) + self.children.iter().map(|c| c.sum(f)).sum::<u64>()
    }

    /// Index keys examined by this stage and its descendants
    pub fn total_keys_examined(&self) -> u64 {
        self.sum(&|d| match d {
            StageDetail::IxScan { keys_examined, .. } => *keys_examined,
            _ => 0,
        })
    }

    /// Documents examined by this stage and its descendants
    pub fn total_docs_examined(&self) -> u64 {
        self.sum(&|d| match d {
            StageDetail::CollScan { docs_examined, .. } | StageDetail::Fetch { docs_examined } => {
                *docs_examined
            }
            _ => 0,
        })
    }
}

/// Result of running a plan
#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    pub records: Vec<RecordId>,
    pub stats: StageStats,
    pub execution_time_millis: u64,
}

impl ExecutionOutput {
    pub fn n_returned(&self) -> u64 {
        self.records.len() as u64
    }
}

/// Executes plans against one collection
pub struct QueryExecutor<'a> {
    collection: &'a Collection,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(collection: &'a Collection) -> Self {
        Self { collection }
    }

    /// Runs the plan. Same plan and same data give the same output.
    pub fn execute(&self, plan: &PlanNode) -> EngineResult<ExecutionOutput> {
        let started = Instant::now();
        let (records, stats) = self.run(plan)?;
        Ok(ExecutionOutput {
            records,
            stats,
            execution_time_millis: started.elapsed().as_millis() as u64,
        })
    }

    /// Resolves record ids to documents
    pub fn documents(&self, records: &[RecordId]) -> Vec<Value> {
        records
            .iter()
            .filter_map(|r| self.collection.get(*r).cloned())
            .collect()
    }

    fn run(&self, node: &PlanNode) -> EngineResult<(Vec<RecordId>, StageStats)> {
        let started = Instant::now();

        let (records, examined, detail, children) = match node {
            PlanNode::CollScan { filter, direction } => {
                let mut ids = self.collection.record_ids();
                if *direction < 0 {
                    ids.reverse();
                }
                let examined = ids.len() as u64;
                let matched: Vec<RecordId> = ids
                    .into_iter()
                    .filter(|r| {
                        self.collection
                            .get(*r)
                            .is_some_and(|doc| filter.matches(doc))
                    })
                    .collect();
                let detail = StageDetail::CollScan {
                    docs_examined: examined,
                    direction: *direction,
                };
                (matched, examined, detail, Vec::new())
            }
            PlanNode::IxScan {
                index, intervals, ..
            } => {
                let tree = self.collection.index(&index.name).ok_or_else(|| {
                    EngineError::bad_value(format!("index '{}' not found", index.name))
                })?;
                let out = tree.scan(intervals);
                let detail = StageDetail::IxScan {
                    index_name: index.name.clone(),
                    keys_examined: out.keys_examined,
                    seeks: out.seeks,
                    dups_tested: out.dups_tested,
                    dups_dropped: out.dups_dropped,
                };
                (out.records, out.keys_examined, detail, Vec::new())
            }
            PlanNode::Fetch { filter, input } => {
                let (input_ids, child) = self.run(input)?;
                let examined = input_ids.len() as u64;
                let matched: Vec<RecordId> = input_ids
                    .into_iter()
                    .filter(|r| {
                        self.collection
                            .get(*r)
                            .is_some_and(|doc| filter.matches(doc))
                    })
                    .collect();
                let detail = StageDetail::Fetch {
                    docs_examined: examined,
                };
                (matched, examined, detail, vec![child])
            }
            PlanNode::Or { inputs } => {
                let mut seen = HashSet::new();
                let mut merged = Vec::new();
                let mut children = Vec::with_capacity(inputs.len());
                let mut tested = 0;
                let mut dropped = 0;

                for input in inputs {
                    let (ids, child) = self.run(input)?;
                    children.push(child);
                    for id in ids {
                        tested += 1;
                        if seen.insert(id) {
                            merged.push(id);
                        } else {
                            dropped += 1;
                        }
                    }
                }

                let detail = StageDetail::Or {
                    dups_tested: tested,
                    dups_dropped: dropped,
                };
                (merged, tested, detail, children)
            }
        };

        let returned = records.len() as u64;
        let stats = StageStats {
            n_returned: returned,
            works: examined + 1,
            advanced: returned,
            is_eof: true,
            execution_time_millis: started.elapsed().as_millis() as u64,
            detail,
            children,
        };
        Ok((records, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::filter::MatchExpr;
    use crate::engine::planner::QueryPlanner;
    use crate::requestor::Hint;
    use serde_json::json;

    fn collection() -> Collection {
        let mut coll = Collection::new("test.sbe_ixscan_explain");
        coll.create_index(json!({"a": 1}).as_object().unwrap()).unwrap();
        coll.create_index(json!({"b": 1}).as_object().unwrap()).unwrap();
        for doc in [
            json!({"_id": 0, "a": 1, "b": 1, "c": 1}),
            json!({"_id": 1, "a": 2, "b": 1, "c": 2}),
            json!({"_id": 2, "a": 3, "b": 1, "c": 3}),
            json!({"_id": 3, "a": 4, "b": 2, "c": 4}),
        ] {
            coll.insert(doc).unwrap();
        }
        coll
    }

    fn run(coll: &Collection, filter: Value, hint: Option<Hint>) -> ExecutionOutput {
        let expr = MatchExpr::parse(&filter).unwrap();
        let plan = QueryPlanner::new(coll).plan(&expr, hint.as_ref()).unwrap();
        QueryExecutor::new(coll).execute(&plan).unwrap()
    }

    #[test]
    fn test_hinted_point_lookup_stats() {
        let coll = collection();
        let out = run(&coll, json!({"a": 3}), Some(Hint::key("a", 1)));

        assert_eq!(out.n_returned(), 1);
        assert_eq!(out.stats.total_keys_examined(), 1);
        assert_eq!(out.stats.total_docs_examined(), 1);

        let ixscan = &out.stats.children[0];
        match &ixscan.detail {
            StageDetail::IxScan { index_name, seeks, .. } => {
                assert_eq!(index_name, "a_1");
                assert_eq!(*seeks, 1);
            }
            other => panic!("expected index scan stats, got {other:?}"),
        }

        let docs = QueryExecutor::new(&coll).documents(&out.records);
        assert_eq!(docs[0]["c"], 3);
    }

    #[test]
    fn test_collscan_examines_everything() {
        let coll = collection();
        let out = run(&coll, json!({"c": {"$gte": 3}}), None);
        assert_eq!(out.n_returned(), 2);
        assert_eq!(out.stats.total_docs_examined(), 4);
        assert_eq!(out.stats.total_keys_examined(), 0);
        assert_eq!(out.stats.works, 5);
    }

    #[test]
    fn test_or_deduplicates() {
        let coll = collection();
        let out = run(&coll, json!({"$or": [{"a": 1}, {"b": 1}]}), None);
        assert_eq!(out.n_returned(), 3);

        let or = &out.stats.children[0];
        assert_eq!(
            or.detail,
            StageDetail::Or {
                dups_tested: 4,
                dups_dropped: 1
            }
        );
        assert_eq!(or.children.len(), 2);
    }

    #[test]
    fn test_results_match_collscan() {
        let coll = collection();
        let hinted = run(&coll, json!({"a": {"$gt": 1}, "b": 1}), Some(Hint::key("a", 1)));
        let natural = run(&coll, json!({"a": {"$gt": 1}, "b": 1}), Some(Hint::Natural(1)));
        assert_eq!(hinted.records, natural.records);
    }

    /// Equalities the index bounds cannot answer exactly are re-checked on fetch.
    #[test]
    fn test_inexact_equality_matches_collscan() {
        let cases = [
            (json!({"$and": [{"a": {"$gt": 5}}, {"a": 3}]}), json!({"_id": 0, "a": [6, 7]})),
            (json!({"a": 9007199254740992_u64}), json!({"_id": 0, "a": 9007199254740993_u64})),
            (json!({"a": null}), json!({"_id": 0, "a": [null, 1]})),
        ];

        for (filter, doc) in cases {
            let mut coll = Collection::new("test.inexact");
            coll.create_index(json!({"a": 1}).as_object().unwrap()).unwrap();
            coll.insert(doc).unwrap();

            let hinted = run(&coll, filter.clone(), Some(Hint::key("a", 1)));
            let natural = run(&coll, filter.clone(), Some(Hint::Natural(1)));
            assert_eq!(hinted.records, natural.records, "{filter}");
            assert_eq!(hinted.n_returned(), 0, "{filter}");
        }
    }
}
