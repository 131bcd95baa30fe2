//! Check scenarios
//!
//! A scenario names a collection, the index to build, the documents to
//! load, and the hinted query whose explain output is checked. The default
//! scenario is the canonical one: index `{a: 1}`, four documents, query
//! `{a: 3}` hinted with `{a: 1}`, expecting every `ixseek` stage to report
//! `a_1`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::engine::{Engine, EngineResult};
use crate::requestor::{ExplainRequest, Hint, RequestResult};
use crate::stages::kind;

use super::index_name::{IndexNameCheck, SBE_FULL_FLAG};

/// Collection used by the canonical scenario
pub const SCENARIO_COLLECTION: &str = "sbe_ixscan_explain";

/// Data and query for one check run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Collection to (re)create
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Key pattern of the index to build
    #[serde(default = "default_index")]
    pub index: Value,

    /// Documents loaded after the index is built
    #[serde(default = "default_documents")]
    pub documents: Vec<Value>,

    /// Query predicate
    #[serde(default = "default_filter")]
    pub filter: Value,

    /// Index hint (key pattern, index name, or `{$natural: 1}`)
    #[serde(default = "default_index")]
    pub hint: Value,

    /// Index name every target stage must report
    #[serde(default = "default_expected_index")]
    pub expected_index: String,

    /// Execution stage kind to verify
    #[serde(default = "default_target_stage")]
    pub target_stage: String,

    /// Feature flags the engine must have for the check to run
    #[serde(default = "default_required_flags")]
    pub required_flags: Vec<String>,

    /// Whether the winning plan must carry `slotBasedPlan`
    #[serde(default = "default_true")]
    pub require_slot_based_plan: bool,
}

fn default_collection() -> String {
    SCENARIO_COLLECTION.to_string()
}

fn default_index() -> Value {
    json!({ "a": 1 })
}

fn default_documents() -> Vec<Value> {
    vec![
        json!({ "_id": 0, "a": 1, "b": 1, "c": 1 }),
        json!({ "_id": 1, "a": 2, "b": 1, "c": 2 }),
        json!({ "_id": 2, "a": 3, "b": 1, "c": 3 }),
        json!({ "_id": 3, "a": 4, "b": 2, "c": 4 }),
    ]
}

fn default_filter() -> Value {
    json!({ "a": 3 })
}

fn default_expected_index() -> String {
    "a_1".to_string()
}

fn default_target_stage() -> String {
    kind::sbe::IXSEEK.to_string()
}

fn default_required_flags() -> Vec<String> {
    vec![SBE_FULL_FLAG.to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            index: default_index(),
            documents: default_documents(),
            filter: default_filter(),
            hint: default_index(),
            expected_index: default_expected_index(),
            target_stage: default_target_stage(),
            required_flags: default_required_flags(),
            require_slot_based_plan: true,
        }
    }
}

impl Scenario {
    /// Drops and recreates the collection, builds the index, loads documents
    pub fn seed(&self, engine: &mut Engine) -> EngineResult<()> {
        engine.drop_collection(&self.collection);
        let index = engine.create_index(&self.collection, &self.index)?;
        let inserted = engine.insert_many(&self.collection, self.documents.clone())?;
        info!(
            event = "SCENARIO_SEEDED",
            collection = %self.collection,
            index = %index,
            documents = inserted,
        );
        Ok(())
    }

    /// The hinted find request, at `executionStats` verbosity
    pub fn request(&self) -> RequestResult<ExplainRequest> {
        let hint = Hint::from_value(&self.hint)?;
        let request = ExplainRequest::find(&self.collection, self.filter.clone()).with_hint(hint);
        request.validate()?;
        Ok(request)
    }

    /// The check this scenario runs
    pub fn check(&self) -> RequestResult<IndexNameCheck> {
        Ok(IndexNameCheck::new(self.request()?, &self.expected_index)
            .with_target_stage(&self.target_stage)
            .with_required_flags(self.required_flags.iter().cloned())
            .with_slot_based_plan_required(self.require_slot_based_plan))
    }
}
