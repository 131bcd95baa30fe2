//! In-memory collections
//!
//! Documents live in a `BTreeMap<RecordId, Value>` in insertion order.
//! Indexes are derived state, updated after every insert and backfilled
//! when created.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::errors::{EngineError, EngineResult};
use super::index::{Index, IndexKey, IndexSpec, Interval, RecordId, ID_INDEX_NAME};
use super::planner::IndexCatalog;

/// A named set of documents and their indexes
#[derive(Debug)]
pub struct Collection {
    namespace: String,
    records: BTreeMap<RecordId, Value>,
    next_record: RecordId,
    indexes: BTreeMap<String, Index>,
}

impl Collection {
    /// Creates an empty collection with the implicit `_id_` index.
    ///
    /// `namespace` is the full `database.collection` name.
    pub fn new(namespace: impl Into<String>) -> Self {
        let mut indexes = BTreeMap::new();
        indexes.insert(ID_INDEX_NAME.to_string(), Index::new(IndexSpec::id_index()));
        Self {
            namespace: namespace.into(),
            records: BTreeMap::new(),
            next_record: 0,
            indexes,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Creates an index from a key pattern.
    ///
    /// Returns the index name and whether it was newly created. Creating an
    /// identical index again is a no-op.
    pub fn create_index(&mut self, pattern: &Map<String, Value>) -> EngineResult<(String, bool)> {
        let spec = IndexSpec::from_key_pattern(pattern)?;

        if let Some(existing) = self.indexes.get(&spec.name) {
            if existing.spec() == &spec {
                return Ok((spec.name, false));
            }
            return Err(EngineError::IndexOptionsConflict(spec.name));
        }

        let mut index = Index::new(spec.clone());
        for (&record, document) in &self.records {
            index.insert(document, record);
        }

        debug!(
            event = "INDEX_BUILT",
            namespace = %self.namespace,
            index = %spec.name,
            keys = index.key_count(),
        );
        self.indexes.insert(spec.name.clone(), index);
        Ok((spec.name, true))
    }

    /// Inserts a document, generating an `_id` if absent
    pub fn insert(&mut self, document: Value) -> EngineResult<RecordId> {
        let Value::Object(mut fields) = document else {
            return Err(EngineError::bad_value("document must be an object"));
        };

        let id = fields
            .entry("_id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()))
            .clone();

        let id_key = IndexKey::from_json(&id)
            .filter(|k| *k != IndexKey::Null)
            .ok_or_else(|| EngineError::bad_value(format!("_id must be a scalar, got {}", id)))?;

        if let Some(id_index) = self.indexes.get(ID_INDEX_NAME) {
            if !id_index.scan(&[Interval::point(id_key)]).records.is_empty() {
                return Err(EngineError::DuplicateKey {
                    collection: self.namespace.clone(),
                    key: id.to_string(),
                });
            }
        }

        let record = self.next_record;
        self.next_record += 1;

        let document = Value::Object(fields);
        for index in self.indexes.values_mut() {
            index.insert(&document, record);
        }
        self.records.insert(record, document);

        Ok(record)
    }

    pub fn get(&self, record: RecordId) -> Option<&Value> {
        self.records.get(&record)
    }

    /// Record ids in natural (insertion) order
    pub fn record_ids(&self) -> Vec<RecordId> {
        self.records.keys().copied().collect()
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }
}

impl IndexCatalog for Collection {
    fn index_specs(&self) -> Vec<&IndexSpec> {
        self.indexes.values().map(Index::spec).collect()
    }

    fn is_multikey(&self, name: &str) -> bool {
        self.indexes.get(name).is_some_and(Index::is_multikey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pattern(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_insert_generates_id() {
        let mut coll = Collection::new("test.c");
        let rid = coll.insert(json!({"a": 1})).unwrap();
        let doc = coll.get(rid).unwrap();
        assert!(doc["_id"].is_string());
        assert_eq!(coll.len(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut coll = Collection::new("test.c");
        coll.insert(json!({"_id": 0, "a": 1})).unwrap();
        let err = coll.insert(json!({"_id": 0, "a": 2})).unwrap_err();
        assert_eq!(err.code(), 11000);
        assert_eq!(coll.len(), 1);
    }

    #[test]
    fn test_non_object_rejected() {
        let mut coll = Collection::new("test.c");
        assert_eq!(coll.insert(json!(5)).unwrap_err().code(), 2);
        assert_eq!(coll.insert(json!({"_id": [1]})).unwrap_err().code(), 2);
    }

    #[test]
    fn test_create_index_backfills() {
        let mut coll = Collection::new("test.c");
        coll.insert(json!({"_id": 0, "a": 1})).unwrap();
        coll.insert(json!({"_id": 1, "a": 2})).unwrap();

        let (name, created) = coll.create_index(&pattern(json!({"a": 1}))).unwrap();
        assert_eq!(name, "a_1");
        assert!(created);
        assert_eq!(coll.index("a_1").unwrap().key_count(), 2);
    }

    #[test]
    fn test_create_index_idempotent() {
        let mut coll = Collection::new("test.c");
        coll.create_index(&pattern(json!({"a": 1}))).unwrap();
        let (name, created) = coll.create_index(&pattern(json!({"a": 1}))).unwrap();
        assert_eq!(name, "a_1");
        assert!(!created);
    }

    #[test]
    fn test_catalog_lists_id_index() {
        let mut coll = Collection::new("test.c");
        coll.create_index(&pattern(json!({"a": 1}))).unwrap();
        let names: Vec<&str> = coll.index_specs().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["_id_", "a_1"]);
    }
}
