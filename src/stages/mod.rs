//! Plan-stage extraction
//!
//! Walks plan trees and execution-statistics trees and collects the nodes
//! of a given stage kind.
//!
//! # Traversal
//!
//! - Pre-order: a node is visited before its children
//! - Children are visited in a fixed key order (see [`CHILD_KEYS`]), and
//!   every element of an array child is visited in array order
//! - Sharded output is followed into each shard's `winningPlan` or
//!   `executionStages`
//!
//! Extraction never fails. A tree without matching nodes yields an empty
//! vector and callers decide whether that is acceptable.

mod extractor;
pub mod kind;

pub use extractor::{
    collect_stages, get_plan_stages, index_access_stages, is_collscan, is_ixscan,
    plan_has_stage, stage_kind, winning_plan, CHILD_KEYS,
};
