//! Explain request structures

use serde_json::{json, Map, Value};

use crate::explain::Verbosity;

use super::errors::{RequestError, RequestResult};

/// Caller-supplied directive forcing the planner onto a specific index
#[derive(Debug, Clone, PartialEq)]
pub enum Hint {
    /// Index identified by its key pattern, e.g. `{a: 1}`
    KeyPattern(Map<String, Value>),
    /// Index identified by name, e.g. `"a_1"`
    IndexName(String),
    /// Collection scan in natural order (`1` forward, `-1` backward)
    Natural(i64),
}

impl Hint {
    /// Hint for a single-field key pattern
    pub fn key(field: impl Into<String>, direction: i64) -> Self {
        let mut pattern = Map::new();
        pattern.insert(field.into(), json!(direction));
        Hint::KeyPattern(pattern)
    }

    /// Parses the hint forms accepted by a find command
    pub fn from_value(value: &Value) -> RequestResult<Self> {
        match value {
            Value::String(name) if !name.is_empty() => Ok(Hint::IndexName(name.clone())),
            Value::Object(pattern) if pattern.is_empty() => {
                Err(RequestError::invalid("hint key pattern must not be empty"))
            }
            Value::Object(pattern) => match pattern.get("$natural") {
                Some(direction) => {
                    let dir = direction
                        .as_f64()
                        .filter(|d| *d == 1.0 || *d == -1.0)
                        .ok_or_else(|| RequestError::invalid("$natural hint must be 1 or -1"))?;
                    Ok(Hint::Natural(dir as i64))
                }
                None => Ok(Hint::KeyPattern(pattern.clone())),
            },
            other => Err(RequestError::invalid(format!(
                "hint must be an index name or key pattern, got {}",
                other
            ))),
        }
    }

    /// Renders the hint as it appears in a command
    pub fn to_value(&self) -> Value {
        match self {
            Hint::KeyPattern(pattern) => Value::Object(pattern.clone()),
            Hint::IndexName(name) => Value::String(name.clone()),
            Hint::Natural(direction) => json!({ "$natural": direction }),
        }
    }
}

/// A find query to be run in explain mode
#[derive(Debug, Clone, PartialEq)]
pub struct ExplainRequest {
    /// Target collection
    pub collection: String,
    /// Query predicate
    pub filter: Value,
    /// Optional index hint
    pub hint: Option<Hint>,
    /// Explain verbosity
    pub verbosity: Verbosity,
}

impl ExplainRequest {
    /// Creates a find request at `executionStats` verbosity
    pub fn find(collection: impl Into<String>, filter: Value) -> Self {
        Self {
            collection: collection.into(),
            filter,
            hint: None,
            verbosity: Verbosity::ExecutionStats,
        }
    }

    /// Sets the hint
    pub fn with_hint(mut self, hint: Hint) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Sets the verbosity
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Checks the request shape before dispatch
    pub fn validate(&self) -> RequestResult<()> {
        if self.collection.is_empty() {
            return Err(RequestError::invalid("collection name must not be empty"));
        }
        if !self.filter.is_object() {
            return Err(RequestError::invalid("filter must be an object"));
        }
        Ok(())
    }

    /// Renders the request as an explain command document
    pub fn to_command(&self) -> Value {
        let mut find = Map::new();
        find.insert("find".into(), Value::String(self.collection.clone()));
        find.insert("filter".into(), self.filter.clone());
        if let Some(hint) = &self.hint {
            find.insert("hint".into(), hint.to_value());
        }

        json!({
            "explain": Value::Object(find),
            "verbosity": self.verbosity.as_str(),
        })
    }
}
