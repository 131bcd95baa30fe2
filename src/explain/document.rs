//! Explain document and verbosity levels

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{ExplainError, ExplainResult};

/// Key under `winningPlan` that marks a plan compiled by the slot-based engine
pub const SLOT_BASED_PLAN_MARKER: &str = "slotBasedPlan";

/// Explain verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verbosity {
    /// Plan selection only, no execution
    QueryPlanner,
    /// Execute the winning plan and report its statistics
    #[default]
    ExecutionStats,
    /// Execution statistics plus per-candidate trial statistics
    AllPlansExecution,
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::QueryPlanner => "queryPlanner",
            Verbosity::ExecutionStats => "executionStats",
            Verbosity::AllPlansExecution => "allPlansExecution",
        }
    }

    /// Returns true if this level runs the plan and reports statistics
    pub fn includes_execution_stats(&self) -> bool {
        !matches!(self, Verbosity::QueryPlanner)
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verbosity {
    type Err = ExplainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queryPlanner" => Ok(Verbosity::QueryPlanner),
            "executionStats" => Ok(Verbosity::ExecutionStats),
            "allPlansExecution" => Ok(Verbosity::AllPlansExecution),
            other => Err(ExplainError::UnknownVerbosity(other.to_string())),
        }
    }
}

/// A complete explain document.
///
/// Construction checks that the top level and `queryPlanner` are objects
/// and that a winning plan is present. Everything else is looked up lazily.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExplainDocument(Value);

impl ExplainDocument {
    /// Wraps a JSON value, validating the planner section
    pub fn from_value(value: Value) -> ExplainResult<Self> {
        let planner = value
            .as_object()
            .ok_or_else(|| ExplainError::not_object("$"))?
            .get("queryPlanner")
            .ok_or_else(|| ExplainError::missing("queryPlanner"))?;

        let winning = planner
            .as_object()
            .ok_or_else(|| ExplainError::not_object("queryPlanner"))?
            .get("winningPlan")
            .ok_or_else(|| ExplainError::missing("queryPlanner.winningPlan"))?;

        if !winning.is_object() {
            return Err(ExplainError::not_object("queryPlanner.winningPlan"));
        }

        Ok(Self(value))
    }

    /// Parses a document from JSON text
    pub fn from_json_str(text: &str) -> ExplainResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// The `queryPlanner` section
    pub fn query_planner(&self) -> &Value {
        &self.0["queryPlanner"]
    }

    /// The raw `queryPlanner.winningPlan`, including any engine wrapper
    pub fn winning_plan(&self) -> &Value {
        &self.0["queryPlanner"]["winningPlan"]
    }

    /// Whether the slot-based engine produced the winning plan
    pub fn has_slot_based_plan(&self) -> bool {
        self.winning_plan().get(SLOT_BASED_PLAN_MARKER).is_some()
    }

    /// The `executionStats` section, absent at `queryPlanner` verbosity
    pub fn execution_stats(&self) -> Option<&Value> {
        self.0.get("executionStats")
    }

    /// The execution statistics tree
    pub fn execution_stages(&self) -> ExplainResult<&Value> {
        let stats = self
            .execution_stats()
            .ok_or_else(|| ExplainError::missing("executionStats"))?;
        let stages = stats
            .get("executionStages")
            .ok_or_else(|| ExplainError::missing("executionStats.executionStages"))?;
        if !stages.is_object() {
            return Err(ExplainError::not_object("executionStats.executionStages"));
        }
        Ok(stages)
    }

    /// `explainVersion` if reported
    pub fn explain_version(&self) -> Option<&str> {
        self.0.get("explainVersion").and_then(Value::as_str)
    }

    /// Borrows the underlying JSON
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the document, returning the underlying JSON
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl<'de> Deserialize<'de> for ExplainDocument {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ExplainDocument::from_value(value).map_err(serde::de::Error::custom)
    }
}
