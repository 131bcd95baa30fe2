//! In-process document engine
//!
//! A small single-database engine that produces explain output in the
//! shape real servers return, for both the classic and the slot-based
//! execution engine.
//!
//! # Scope
//!
//! - Collections of JSON documents with a unique `_id`
//! - Single-field ascending or descending indexes
//! - Comparison filters (`$eq`, `$gt`, `$gte`, `$lt`, `$lte`) combined with
//!   `$and` / `$or`
//! - One deterministic plan per query; no plan cache, no rejected plans
//!
//! Everything runs on the caller's thread and is mutated only through
//! `&mut self`.

mod collection;
#[allow(clippy::module_inception)]
mod engine;
mod errors;
mod executor;
mod filter;
mod index;
mod planner;
mod render;

pub use collection::Collection;
pub use engine::{Engine, EngineConfig};
pub use errors::{EngineError, EngineResult};
pub use executor::{ExecutionOutput, QueryExecutor, StageDetail, StageStats};
pub use filter::{CompareOp, MatchExpr, Predicate};
pub use index::{Index, IndexKey, IndexSpec, Interval, RecordId, ID_INDEX_NAME};
pub use planner::{IndexCatalog, PlanNode, QueryPlanner};
pub use render::{ExecutionMode, ExplainInputs, ExplainRenderer};
