//! Scenario configuration file
//!
//! ```json
//! {
//!   "database": "test",
//!   "mode": "slot_based",
//!   "feature_flags": ["featureFlagSbeFull"],
//!   "scenario": { "filter": { "a": 3 }, "hint": { "a": 1 } }
//! }
//! ```
//!
//! Every field is optional; omitted fields take the canonical scenario's
//! values.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::check::{Scenario, SBE_FULL_FLAG};
use crate::engine::{EngineConfig, ExecutionMode};
use crate::explain::Verbosity;

use super::errors::{CliError, CliResult};

/// Engine setup plus the scenario to run on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Database name (default: "test")
    #[serde(default = "default_database")]
    pub database: String,

    /// Execution engine (default: "slot_based")
    #[serde(default = "default_mode")]
    pub mode: ExecutionMode,

    /// Feature flags the engine reports (default: ["featureFlagSbeFull"])
    #[serde(default = "default_feature_flags")]
    pub feature_flags: Vec<String>,

    #[serde(default)]
    pub scenario: Scenario,
}

fn default_database() -> String {
    "test".to_string()
}

fn default_mode() -> ExecutionMode {
    ExecutionMode::SlotBased
}

fn default_feature_flags() -> Vec<String> {
    vec![SBE_FULL_FLAG.to_string()]
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            mode: default_mode(),
            feature_flags: default_feature_flags(),
            scenario: Scenario::default(),
        }
    }
}

impl ScenarioConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: ScenarioConfig = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Loads `path`, or the built-in scenario when absent
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.database.is_empty() {
            return Err(CliError::config_error("database must not be empty"));
        }

        let scenario = &self.scenario;
        if scenario.collection.is_empty() {
            return Err(CliError::config_error("scenario.collection must not be empty"));
        }
        if !scenario.index.is_object() {
            return Err(CliError::config_error("scenario.index must be a key pattern object"));
        }
        if !scenario.filter.is_object() {
            return Err(CliError::config_error("scenario.filter must be an object"));
        }
        if scenario.expected_index.is_empty() {
            return Err(CliError::config_error("scenario.expected_index must not be empty"));
        }
        if scenario.target_stage.is_empty() {
            return Err(CliError::config_error("scenario.target_stage must not be empty"));
        }
        if let Some(i) = scenario.documents.iter().position(|d| !d.is_object()) {
            return Err(CliError::config_error(format!(
                "scenario.documents[{}] is not an object",
                i
            )));
        }

        Ok(())
    }

    /// Engine configuration, with the mode forced to classic if requested
    pub fn engine_config(&self, classic: bool) -> EngineConfig {
        let mode = if classic {
            ExecutionMode::Classic
        } else {
            self.mode
        };
        EngineConfig::new(&self.database)
            .with_mode(mode)
            .with_feature_flags(self.feature_flags.iter().cloned())
    }
}

/// Parses a verbosity argument
pub fn parse_verbosity(text: &str) -> CliResult<Verbosity> {
    text.parse::<Verbosity>()
        .map_err(|e| CliError::config_error(e.to_string()))
}
