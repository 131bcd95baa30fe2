//! Engine facade
//!
//! Owns the collections of one database and answers find and explain
//! requests against them. Every request goes through the same pipeline:
//!
//! 1. Parse the filter
//! 2. Plan (hint-aware, deterministic)
//! 3. Execute with statistics
//! 4. Render (explain only)

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::explain::ExplainDocument;
use crate::requestor::{
    EngineCapabilities, ExplainRequest, ExplainSource, RequestResult,
};

use super::collection::Collection;
use super::errors::{EngineError, EngineResult};
use super::executor::QueryExecutor;
use super::filter::MatchExpr;
use super::planner::{PlanNode, QueryPlanner};
use super::render::{ExecutionMode, ExplainInputs, ExplainRenderer};

/// Engine construction options
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Database name used for namespaces
    pub database: String,
    /// Execution engine reported in explain output
    pub mode: ExecutionMode,
    /// Feature flags reported as enabled
    pub feature_flags: BTreeSet<String>,
}

impl EngineConfig {
    /// Slot-based engine with no feature flags
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            mode: ExecutionMode::SlotBased,
            feature_flags: BTreeSet::new(),
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_feature_flags(mut self, flags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.feature_flags = flags.into_iter().map(Into::into).collect();
        self
    }
}

/// In-process document engine
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    collections: BTreeMap<String, Collection>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        info!(
            event = "ENGINE_STARTED",
            database = %config.database,
            mode = ?config.mode,
            feature_flags = config.feature_flags.len(),
        );
        Self {
            config,
            collections: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Creates an index, creating the collection if needed.
    ///
    /// Returns the index name.
    pub fn create_index(&mut self, collection: &str, key_pattern: &Value) -> EngineResult<String> {
        let pattern = key_pattern
            .as_object()
            .ok_or_else(|| EngineError::bad_value("index key pattern must be an object"))?;
        let (name, created) = self.collection_mut(collection)?.create_index(pattern)?;
        if created {
            info!(event = "INDEX_CREATED", collection, index = %name);
        }
        Ok(name)
    }

    /// Inserts documents in order, stopping at the first failure.
    ///
    /// Documents before the failing one stay inserted.
    pub fn insert_many(&mut self, collection: &str, documents: Vec<Value>) -> EngineResult<usize> {
        let target = self.collection_mut(collection)?;
        let mut inserted = 0;
        for document in documents {
            target.insert(document)?;
            inserted += 1;
        }
        debug!(event = "DOCUMENTS_INSERTED", collection, count = inserted);
        Ok(inserted)
    }

    /// Drops a collection. Returns false if it did not exist.
    pub fn drop_collection(&mut self, collection: &str) -> bool {
        let dropped = self.collections.remove(collection).is_some();
        if dropped {
            info!(event = "COLLECTION_DROPPED", collection);
        }
        dropped
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Runs a find and returns matching documents in plan order
    pub fn find(&self, request: &ExplainRequest) -> RequestResult<Vec<Value>> {
        request.validate()?;
        let (collection, _, plan) = self.prepare(request)?;
        let executor = QueryExecutor::new(collection);
        let output = executor.execute(&plan)?;
        Ok(executor.documents(&output.records))
    }

    /// Runs a find in explain mode
    pub fn explain(&self, request: &ExplainRequest) -> RequestResult<ExplainDocument> {
        request.validate()?;
        let (collection, parsed, plan) = self.prepare(request)?;
        let execution = QueryExecutor::new(collection).execute(&plan)?;

        debug!(
            event = "QUERY_EXPLAINED",
            namespace = collection.namespace(),
            plan = %plan.summary(),
            n_returned = execution.n_returned(),
        );

        let rendered = ExplainRenderer::new(self.config.mode).render(&ExplainInputs {
            namespace: collection.namespace(),
            command: self.command(request),
            parsed_query: &parsed,
            plan: &plan,
            execution: &execution,
            verbosity: request.verbosity,
        });
        Ok(ExplainDocument::from_value(rendered)?)
    }

    fn prepare(&self, request: &ExplainRequest) -> EngineResult<(&Collection, MatchExpr, PlanNode)> {
        let collection = self.collections.get(&request.collection).ok_or_else(|| {
            EngineError::NamespaceNotFound(self.namespace(&request.collection))
        })?;
        let parsed = MatchExpr::parse(&request.filter)?;
        let plan = QueryPlanner::new(collection).plan(&parsed, request.hint.as_ref())?;
        Ok((collection, parsed, plan))
    }

    fn collection_mut(&mut self, name: &str) -> EngineResult<&mut Collection> {
        if name.is_empty() || name.contains('$') {
            return Err(EngineError::bad_value(format!(
                "invalid collection name '{}'",
                name
            )));
        }
        let namespace = self.namespace(name);
        Ok(self
            .collections
            .entry(name.to_string())
            .or_insert_with(|| Collection::new(namespace)))
    }

    fn namespace(&self, collection: &str) -> String {
        format!("{}.{}", self.config.database, collection)
    }

    fn command(&self, request: &ExplainRequest) -> Value {
        let mut command = Map::new();
        command.insert("find".into(), Value::String(request.collection.clone()));
        command.insert("filter".into(), request.filter.clone());
        if let Some(hint) = &request.hint {
            command.insert("hint".into(), hint.to_value());
        }
        command.insert("$db".into(), Value::String(self.config.database.clone()));
        Value::Object(command)
    }
}

impl ExplainSource for Engine {
    fn explain(&mut self, request: &ExplainRequest) -> RequestResult<ExplainDocument> {
        Engine::explain(self, request)
    }

    fn capabilities(&self) -> RequestResult<EngineCapabilities> {
        Ok(EngineCapabilities {
            slot_based_engine: self.config.mode == ExecutionMode::SlotBased,
            feature_flags: self.config.feature_flags.clone(),
        })
    }
}
