//! Query filters
//!
//! Parses find filters into a match expression tree and evaluates it
//! against documents.
//!
//! Supported forms:
//! - `{field: value}` implicit equality
//! - `{field: {$eq | $gt | $gte | $lt | $lte: value}}`
//! - `{$and: [...]}`, `{$or: [...]}`
//! - dotted field paths into embedded objects
//!
//! Comparisons never coerce across types. Numbers compare by value, so
//! `3` and `3.0` are equal.

use std::cmp::Ordering;

use serde_json::{json, Map, Value};

use super::errors::{EngineError, EngineResult};

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "$eq" => Some(CompareOp::Eq),
            "$gt" => Some(CompareOp::Gt),
            "$gte" => Some(CompareOp::Gte),
            "$lt" => Some(CompareOp::Lt),
            "$lte" => Some(CompareOp::Lte),
            _ => None,
        }
    }

    pub fn operator(&self) -> &'static str {
        match self {
            CompareOp::Eq => "$eq",
            CompareOp::Gt => "$gt",
            CompareOp::Gte => "$gte",
            CompareOp::Lt => "$lt",
            CompareOp::Lte => "$lte",
        }
    }
}

/// A single field comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub path: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Predicate {
    pub fn new(path: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Self {
            path: path.into(),
            op,
            value,
        }
    }

    pub fn is_equality(&self) -> bool {
        self.op == CompareOp::Eq
    }

    fn matches(&self, document: &Value) -> bool {
        let field = lookup_path(document, &self.path);

        if self.op == CompareOp::Eq && self.value.is_null() {
            return matches!(field, None | Some(Value::Null));
        }

        let Some(field) = field else {
            return false;
        };

        if self.compare_scalar(field) {
            return true;
        }

        match field {
            Value::Array(items) => items.iter().any(|item| self.compare_scalar(item)),
            _ => false,
        }
    }

    fn compare_scalar(&self, actual: &Value) -> bool {
        let Some(ordering) = compare_values(actual, &self.value) else {
            return false;
        };
        match self.op {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Parsed filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum MatchExpr {
    And(Vec<MatchExpr>),
    Or(Vec<MatchExpr>),
    Compare(Predicate),
}

impl MatchExpr {
    /// Parses a filter document. The result is always a top-level `And`.
    pub fn parse(filter: &Value) -> EngineResult<Self> {
        let obj = filter
            .as_object()
            .ok_or_else(|| EngineError::bad_value("filter must be an object"))?;
        Ok(MatchExpr::And(parse_conjuncts(obj)?))
    }

    /// Top-level conjuncts
    pub fn conjuncts(&self) -> &[MatchExpr] {
        match self {
            MatchExpr::And(children) => children,
            other => std::slice::from_ref(other),
        }
    }

    /// Comparison predicates among the top-level conjuncts
    pub fn top_level_predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.conjuncts().iter().filter_map(|c| match c {
            MatchExpr::Compare(p) => Some(p),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, MatchExpr::And(children) if children.is_empty())
    }

    /// Evaluates the expression against a document
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            MatchExpr::And(children) => children.iter().all(|c| c.matches(document)),
            MatchExpr::Or(children) => children.iter().any(|c| c.matches(document)),
            MatchExpr::Compare(p) => p.matches(document),
        }
    }

    /// Normalised form used as `parsedQuery` and stage `filter` in explain output
    pub fn to_value(&self) -> Value {
        match self {
            MatchExpr::Compare(p) => {
                let mut field = Map::new();
                field.insert(p.path.clone(), json!({ p.op.operator(): p.value }));
                Value::Object(field)
            }
            MatchExpr::And(children) => match children.as_slice() {
                [] => json!({}),
                [only] => only.to_value(),
                many => json!({ "$and": many.iter().map(MatchExpr::to_value).collect::<Vec<_>>() }),
            },
            MatchExpr::Or(children) => {
                json!({ "$or": children.iter().map(MatchExpr::to_value).collect::<Vec<_>>() })
            }
        }
    }

    /// Returns a copy with `exclude` removed from the top-level conjuncts.
    pub fn without(&self, exclude: &[&Predicate]) -> MatchExpr {
        let kept = self
            .conjuncts()
            .iter()
            .filter(|c| match c {
                MatchExpr::Compare(p) => !exclude.contains(&p),
                _ => true,
            })
            .cloned()
            .collect();
        MatchExpr::And(kept)
    }
}

fn parse_conjuncts(obj: &Map<String, Value>) -> EngineResult<Vec<MatchExpr>> {
    let mut out = Vec::new();

    for (key, value) in obj {
        match key.as_str() {
            "$and" => {
                for branch in parse_branches(key, value)? {
                    match branch {
                        MatchExpr::And(children) => out.extend(children),
                        other => out.push(other),
                    }
                }
            }
            "$or" => out.push(MatchExpr::Or(parse_branches(key, value)?)),
            op if op.starts_with('$') => {
                return Err(EngineError::bad_value(format!(
                    "unknown top level operator: {}",
                    op
                )))
            }
            path => parse_field(path, value, &mut out)?,
        }
    }

    Ok(out)
}

fn parse_branches(op: &str, value: &Value) -> EngineResult<Vec<MatchExpr>> {
    let items = value
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| EngineError::bad_value(format!("{} must be a nonempty array", op)))?;

    items
        .iter()
        .map(|item| {
            let obj = item.as_object().ok_or_else(|| {
                EngineError::bad_value(format!("{} argument's entries must be objects", op))
            })?;
            let mut children = parse_conjuncts(obj)?;
            Ok(if children.len() == 1 {
                children.remove(0)
            } else {
                MatchExpr::And(children)
            })
        })
        .collect()
}

fn parse_field(path: &str, value: &Value, out: &mut Vec<MatchExpr>) -> EngineResult<()> {
    let operators = match value {
        Value::Object(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => ops,
        _ => {
            out.push(MatchExpr::Compare(Predicate::new(path, CompareOp::Eq, value.clone())));
            return Ok(());
        }
    };

    for (op, operand) in operators {
        let op = CompareOp::from_operator(op)
            .ok_or_else(|| EngineError::bad_value(format!("unknown operator: {}", op)))?;
        out.push(MatchExpr::Compare(Predicate::new(path, op, operand.clone())));
    }
    Ok(())
}

/// Resolves a dotted path through embedded objects
pub fn lookup_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
}

/// Compares two scalars of the same type. Mixed types do not compare.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(xi), Some(yi)) = (x.as_i64(), y.as_i64()) {
                return Some(xi.cmp(&yi));
            }
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            (a == b).then_some(Ordering::Equal)
        }
        _ => None,
    }
}
