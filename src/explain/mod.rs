//! Explain document model
//!
//! An explain document is the structured report a query engine returns
//! when a query is run in explain mode instead of (or in addition to)
//! returning its results.
//!
//! # Sections
//!
//! - `queryPlanner.winningPlan`: the plan chosen to execute the query
//! - `queryPlanner.winningPlan.slotBasedPlan`: present only when the
//!   slot-based engine compiled the plan
//! - `executionStats.executionStages`: runtime statistics tree, present
//!   for `executionStats` and `allPlansExecution` verbosity
//!
//! Documents are immutable once produced. Accessors only hand out shared
//! borrows into the underlying JSON.

mod document;
mod errors;

pub use document::{ExplainDocument, Verbosity, SLOT_BASED_PLAN_MARKER};
pub use errors::{ExplainError, ExplainResult};
