//! Explain sources

use std::collections::BTreeSet;

use tracing::debug;

use crate::explain::ExplainDocument;

use super::errors::RequestResult;
use super::request::ExplainRequest;

/// What the engine behind a source can do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineCapabilities {
    /// Queries run on the slot-based execution engine
    pub slot_based_engine: bool,
    /// Feature flags enabled on the engine
    pub feature_flags: BTreeSet<String>,
}

impl EngineCapabilities {
    /// Returns true if every flag in `flags` is enabled
    pub fn has_flags<S: AsRef<str>>(&self, flags: &[S]) -> bool {
        flags
            .iter()
            .all(|flag| self.feature_flags.contains(flag.as_ref()))
    }

    /// Returns true if the slot-based engine is active with all `flags`
    pub fn slot_based_enabled<S: AsRef<str>>(&self, flags: &[S]) -> bool {
        self.slot_based_engine && self.has_flags(flags)
    }
}

/// Something that can explain a find query
pub trait ExplainSource {
    /// Runs the request in explain mode and returns the full document
    fn explain(&mut self, request: &ExplainRequest) -> RequestResult<ExplainDocument>;

    /// Reports the engine's execution capabilities
    fn capabilities(&self) -> RequestResult<EngineCapabilities>;
}

/// A source that answers every request with a captured document.
///
/// Used to verify explain output saved from a running server.
#[derive(Debug, Clone)]
pub struct RecordedExplain {
    document: ExplainDocument,
    feature_flags: BTreeSet<String>,
}

impl RecordedExplain {
    pub fn new(document: ExplainDocument) -> Self {
        Self {
            document,
            feature_flags: BTreeSet::new(),
        }
    }

    /// Declares feature flags that were enabled when the document was captured
    pub fn with_feature_flags(mut self, flags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.feature_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn document(&self) -> &ExplainDocument {
        &self.document
    }
}

impl ExplainSource for RecordedExplain {
    fn explain(&mut self, request: &ExplainRequest) -> RequestResult<ExplainDocument> {
        request.validate()?;
        debug!(
            event = "RECORDED_EXPLAIN_SERVED",
            collection = %request.collection,
        );
        Ok(self.document.clone())
    }

    fn capabilities(&self) -> RequestResult<EngineCapabilities> {
        Ok(EngineCapabilities {
            slot_based_engine: self.document.has_slot_based_plan(),
            feature_flags: self.feature_flags.clone(),
        })
    }
}
