//! Ordered single-field indexes
//!
//! Each index is a `BTreeMap<IndexKey, Vec<RecordId>>`. Record ids under a
//! key are kept sorted ascending so scans are deterministic.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::Bound;

use serde_json::{json, Map, Value};

use super::errors::{EngineError, EngineResult};
use super::filter::lookup_path;

/// Position of a document in its collection
pub type RecordId = u64;

/// Name of the implicit primary key index
pub const ID_INDEX_NAME: &str = "_id_";

/// Index key for one field value.
///
/// Ordering across types: MinKey < Null < Number < String < Bool < MaxKey.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    MinKey,
    Null,
    /// f64 bits rearranged for total ordering
    Number(u64),
    String(String),
    Bool(bool),
    MaxKey,
}

impl IndexKey {
    pub fn from_f64(v: f64) -> Self {
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        IndexKey::Number(ordered)
    }

    /// Key for a scalar JSON value. Arrays and objects have no key.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(IndexKey::Null),
            Value::Bool(b) => Some(IndexKey::Bool(*b)),
            Value::Number(n) => n.as_f64().map(IndexKey::from_f64),
            Value::String(s) => Some(IndexKey::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Whether a point scan on this value finds exactly the values equal to it.
    ///
    /// Null points also find arrays holding null, and integers beyond 2^53
    /// share keys with their neighbours.
    pub fn is_exact(value: &Value) -> bool {
        const MAX_SAFE: u64 = 1 << 53;
        match value {
            Value::Bool(_) | Value::String(_) => true,
            Value::Number(n) => match (n.as_u64(), n.as_i64()) {
                (Some(u), _) => u <= MAX_SAFE,
                (None, Some(i)) => i.unsigned_abs() <= MAX_SAFE,
                (None, None) => n.as_f64().is_some(),
            },
            Value::Null | Value::Array(_) | Value::Object(_) => false,
        }
    }

    fn as_f64(bits: u64) -> f64 {
        let raw = if (bits >> 63) == 1 {
            bits ^ (1 << 63)
        } else {
            !bits
        };
        f64::from_bits(raw)
    }

    /// Smallest key of the same type
    fn type_min(&self) -> (IndexKey, bool) {
        match self {
            IndexKey::Number(_) => (IndexKey::from_f64(f64::NEG_INFINITY), true),
            IndexKey::String(_) => (IndexKey::String(String::new()), true),
            IndexKey::Bool(_) => (IndexKey::Bool(false), true),
            other => (other.clone(), true),
        }
    }

    /// Largest key of the same type; strings are capped exclusively by the next type
    fn type_max(&self) -> (IndexKey, bool) {
        match self {
            IndexKey::Number(_) => (IndexKey::from_f64(f64::INFINITY), true),
            IndexKey::String(_) => (IndexKey::Bool(false), false),
            IndexKey::Bool(_) => (IndexKey::Bool(true), true),
            other => (other.clone(), true),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::MinKey => write!(f, "MinKey"),
            IndexKey::MaxKey => write!(f, "MaxKey"),
            IndexKey::Null => write!(f, "null"),
            IndexKey::Bool(b) => write!(f, "{}", b),
            IndexKey::String(s) => write!(f, "{}", Value::String(s.clone())),
            IndexKey::Number(bits) => {
                let v = Self::as_f64(*bits);
                if v == f64::INFINITY {
                    write!(f, "inf.0")
                } else if v == f64::NEG_INFINITY {
                    write!(f, "-inf.0")
                } else if v.fract() == 0.0 && v.abs() < 1e15 {
                    write!(f, "{}", v as i64)
                } else {
                    write!(f, "{}", v)
                }
            }
        }
    }
}

/// A contiguous key range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub start: IndexKey,
    pub start_inclusive: bool,
    pub end: IndexKey,
    pub end_inclusive: bool,
}

impl Interval {
    /// `[MinKey, MaxKey]`
    pub fn all() -> Self {
        Self {
            start: IndexKey::MinKey,
            start_inclusive: true,
            end: IndexKey::MaxKey,
            end_inclusive: true,
        }
    }

    /// `[k, k]`
    pub fn point(key: IndexKey) -> Self {
        Self {
            start: key.clone(),
            start_inclusive: true,
            end: key,
            end_inclusive: true,
        }
    }

    /// Keys above `key` within its type
    pub fn greater_than(key: IndexKey, inclusive: bool) -> Self {
        let (end, end_inclusive) = key.type_max();
        Self {
            start: key,
            start_inclusive: inclusive,
            end,
            end_inclusive,
        }
    }

    /// Keys below `key` within its type
    pub fn less_than(key: IndexKey, inclusive: bool) -> Self {
        let (start, start_inclusive) = key.type_min();
        Self {
            start,
            start_inclusive,
            end: key,
            end_inclusive: inclusive,
        }
    }

    pub fn is_full_range(&self) -> bool {
        self.start == IndexKey::MinKey && self.end == IndexKey::MaxKey
    }

    pub fn is_empty(&self) -> bool {
        match self.start.cmp(&self.end) {
            Ordering::Greater => true,
            Ordering::Equal => !(self.start_inclusive && self.end_inclusive),
            Ordering::Less => false,
        }
    }

    /// Intersection of two intervals (may be empty)
    pub fn intersect(&self, other: &Interval) -> Interval {
        let (start, start_inclusive) = match self.start.cmp(&other.start) {
            Ordering::Greater => (self.start.clone(), self.start_inclusive),
            Ordering::Less => (other.start.clone(), other.start_inclusive),
            Ordering::Equal => (
                self.start.clone(),
                self.start_inclusive && other.start_inclusive,
            ),
        };
        let (end, end_inclusive) = match self.end.cmp(&other.end) {
            Ordering::Less => (self.end.clone(), self.end_inclusive),
            Ordering::Greater => (other.end.clone(), other.end_inclusive),
            Ordering::Equal => (self.end.clone(), self.end_inclusive && other.end_inclusive),
        };
        Interval {
            start,
            start_inclusive,
            end,
            end_inclusive,
        }
    }

    /// Renders the interval in scan direction
    pub fn render(&self, direction: i64) -> String {
        let open = |inclusive: bool| if inclusive { "[" } else { "(" };
        let close = |inclusive: bool| if inclusive { "]" } else { ")" };
        if direction < 0 {
            format!(
                "{}{}, {}{}",
                open(self.end_inclusive),
                self.end,
                self.start,
                close(self.start_inclusive)
            )
        } else {
            format!(
                "{}{}, {}{}",
                open(self.start_inclusive),
                self.start,
                self.end,
                close(self.end_inclusive)
            )
        }
    }

    fn bounds(&self) -> (Bound<&IndexKey>, Bound<&IndexKey>) {
        let lower = if self.start_inclusive {
            Bound::Included(&self.start)
        } else {
            Bound::Excluded(&self.start)
        };
        let upper = if self.end_inclusive {
            Bound::Included(&self.end)
        } else {
            Bound::Excluded(&self.end)
        };
        (lower, upper)
    }
}

/// Identity and key pattern of an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub field: String,
    /// 1 ascending, -1 descending
    pub direction: i64,
}

impl IndexSpec {
    /// The implicit `{_id: 1}` index
    pub fn id_index() -> Self {
        Self {
            name: ID_INDEX_NAME.to_string(),
            field: "_id".to_string(),
            direction: 1,
        }
    }

    /// Builds a spec from a key pattern such as `{a: 1}`, named `a_1`
    pub fn from_key_pattern(pattern: &Map<String, Value>) -> EngineResult<Self> {
        let mut fields = pattern.iter();
        let (field, direction) = match (fields.next(), fields.next()) {
            (Some(entry), None) => entry,
            (None, _) => {
                return Err(EngineError::CannotCreateIndex(
                    "key pattern must not be empty".into(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(EngineError::CannotCreateIndex(
                    "compound key patterns are not supported".into(),
                ))
            }
        };

        let direction = key_direction(direction).ok_or_else(|| {
            EngineError::CannotCreateIndex(format!(
                "unsupported key direction {} for field '{}'",
                direction, field
            ))
        })?;

        if field == "_id" && direction == 1 {
            return Ok(Self::id_index());
        }

        Ok(Self {
            name: format!("{}_{}", field, direction),
            field: field.clone(),
            direction,
        })
    }

    pub fn key_pattern(&self) -> Value {
        let mut pattern = Map::new();
        pattern.insert(self.field.clone(), json!(self.direction));
        Value::Object(pattern)
    }

    /// Returns true if the spec was built from this key pattern
    pub fn matches_pattern(&self, pattern: &Map<String, Value>) -> bool {
        pattern.len() == 1
            && pattern
                .get(&self.field)
                .and_then(key_direction)
                .is_some_and(|d| d == self.direction)
    }
}

/// Ascending or descending; `1.0` and `-1.0` count as `1` and `-1`.
fn key_direction(value: &Value) -> Option<i64> {
    let d = value.as_f64()?;
    if d == 1.0 {
        Some(1)
    } else if d == -1.0 {
        Some(-1)
    } else {
        None
    }
}

/// Output of an index scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutput {
    pub records: Vec<RecordId>,
    pub keys_examined: u64,
    pub seeks: u64,
    pub dups_tested: u64,
    pub dups_dropped: u64,
}

/// A single-field index
#[derive(Debug)]
pub struct Index {
    spec: IndexSpec,
    tree: BTreeMap<IndexKey, Vec<RecordId>>,
    multikey: bool,
}

impl Index {
    pub fn new(spec: IndexSpec) -> Self {
        Self {
            spec,
            tree: BTreeMap::new(),
            multikey: false,
        }
    }

    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    pub fn is_multikey(&self) -> bool {
        self.multikey
    }

    /// Returns the keys a document contributes to this index.
    ///
    /// A missing field indexes as null. Array elements are indexed
    /// individually; object values are not indexed.
    pub fn keys_for(&self, document: &Value) -> Vec<IndexKey> {
        match lookup_path(document, &self.spec.field) {
            None => vec![IndexKey::Null],
            Some(Value::Array(items)) => items.iter().filter_map(IndexKey::from_json).collect(),
            Some(value) => IndexKey::from_json(value).into_iter().collect(),
        }
    }

    /// Adds a document under each of its keys
    pub fn insert(&mut self, document: &Value, record: RecordId) {
        if matches!(lookup_path(document, &self.spec.field), Some(Value::Array(_))) {
            self.multikey = true;
        }
        for key in self.keys_for(document) {
            let records = self.tree.entry(key).or_default();
            if let Err(pos) = records.binary_search(&record) {
                records.insert(pos, record);
            }
        }
    }

    /// Scans the intervals in index direction
    pub fn scan(&self, intervals: &[Interval]) -> ScanOutput {
        let mut out = ScanOutput::default();
        let mut seen = HashSet::new();

        let ordered: Vec<&Interval> = if self.spec.direction < 0 {
            intervals.iter().rev().collect()
        } else {
            intervals.iter().collect()
        };

        for interval in ordered {
            if interval.is_empty() {
                continue;
            }
            out.seeks += 1;

            let mut entries: Vec<(&IndexKey, &Vec<RecordId>)> =
                self.tree.range::<IndexKey, _>(interval.bounds()).collect();
            if self.spec.direction < 0 {
                entries.reverse();
            }

            for (_, records) in entries {
                for &record in records {
                    out.keys_examined += 1;
                    if self.multikey {
                        out.dups_tested += 1;
                        if !seen.insert(record) {
                            out.dups_dropped += 1;
                            continue;
                        }
                    }
                    out.records.push(record);
                }
            }
        }

        out
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_key_ordering() {
        let keys = vec![
            IndexKey::MinKey,
            IndexKey::Null,
            IndexKey::from_f64(-100.0),
            IndexKey::from_f64(0.0),
            IndexKey::from_f64(2.5),
            IndexKey::from_f64(100.0),
            IndexKey::String("aaa".into()),
            IndexKey::String("zzz".into()),
            IndexKey::Bool(false),
            IndexKey::Bool(true),
            IndexKey::MaxKey,
        ];
        for i in 1..keys.len() {
            assert!(keys[i - 1] < keys[i], "{:?} < {:?}", keys[i - 1], keys[i]);
        }
    }

    #[test]
    fn test_integers_and_floats_share_order() {
        assert_eq!(IndexKey::from_json(&json!(3)), IndexKey::from_json(&json!(3.0)));
        assert!(IndexKey::from_json(&json!(2)) < IndexKey::from_json(&json!(2.5)));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(IndexKey::from_f64(3.0).to_string(), "3");
        assert_eq!(IndexKey::from_f64(-1.5).to_string(), "-1.5");
        assert_eq!(IndexKey::from_f64(f64::INFINITY).to_string(), "inf.0");
        assert_eq!(IndexKey::String("x".into()).to_string(), "\"x\"");
    }

    #[test]
    fn test_spec_naming() {
        let spec = IndexSpec::from_key_pattern(&pattern(json!({"a": 1}))).unwrap();
        assert_eq!(spec.name, "a_1");
        let spec = IndexSpec::from_key_pattern(&pattern(json!({"b.c": -1}))).unwrap();
        assert_eq!(spec.name, "b.c_-1");
        let spec = IndexSpec::from_key_pattern(&pattern(json!({"_id": 1}))).unwrap();
        assert_eq!(spec.name, "_id_");
    }

    #[test]
    fn test_float_directions() {
        let spec = IndexSpec::from_key_pattern(&pattern(json!({"a": 1.0}))).unwrap();
        assert_eq!(spec.name, "a_1");
        assert!(spec.matches_pattern(&pattern(json!({"a": 1.0}))));
        assert!(spec.matches_pattern(&pattern(json!({"a": 1}))));
        assert!(!spec.matches_pattern(&pattern(json!({"a": -1.0}))));

        let spec = IndexSpec::from_key_pattern(&pattern(json!({"b": -1.0}))).unwrap();
        assert_eq!(spec.name, "b_-1");
        assert!(IndexSpec::from_key_pattern(&pattern(json!({"a": 1.5}))).is_err());
    }

    #[test]
    fn test_exact_point_keys() {
        assert!(IndexKey::is_exact(&json!(3)));
        assert!(IndexKey::is_exact(&json!(2.5)));
        assert!(IndexKey::is_exact(&json!("x")));
        assert!(IndexKey::is_exact(&json!(9007199254740992_u64)));
        assert!(!IndexKey::is_exact(&json!(9007199254740993_u64)));
        assert!(!IndexKey::is_exact(&json!(-9007199254740993_i64)));
        assert!(!IndexKey::is_exact(&Value::Null));
        assert!(!IndexKey::is_exact(&json!([1])));
    }

    #[test]
    fn test_spec_rejections() {
        assert!(IndexSpec::from_key_pattern(&pattern(json!({}))).is_err());
        assert!(IndexSpec::from_key_pattern(&pattern(json!({"a": 1, "b": 1}))).is_err());
        let err = IndexSpec::from_key_pattern(&pattern(json!({"a": "hashed"}))).unwrap_err();
        assert_eq!(err.code(), 67);
    }

    #[test]
    fn test_interval_render() {
        assert_eq!(Interval::point(IndexKey::from_f64(3.0)).render(1), "[3, 3]");
        assert_eq!(Interval::all().render(1), "[MinKey, MaxKey]");
        assert_eq!(Interval::all().render(-1), "[MaxKey, MinKey]");
        assert_eq!(
            Interval::greater_than(IndexKey::from_f64(2.0), false).render(1),
            "(2, inf.0]"
        );
    }

    #[test]
    fn test_interval_intersection() {
        let gt = Interval::greater_than(IndexKey::from_f64(1.0), false);
        let lte = Interval::less_than(IndexKey::from_f64(3.0), true);
        let both = gt.intersect(&lte);
        assert_eq!(both.render(1), "(1, 3]");
        assert!(!both.is_empty());

        let disjoint = Interval::point(IndexKey::from_f64(5.0)).intersect(&both);
        assert!(disjoint.is_empty());
    }

    #[test]
    fn test_scan_point_and_range() {
        let mut index = Index::new(IndexSpec::from_key_pattern(&pattern(json!({"a": 1}))).unwrap());
        for (rid, a) in [1, 2, 3, 4].iter().enumerate() {
            index.insert(&json!({"a": a}), rid as RecordId);
        }

        let out = index.scan(&[Interval::point(IndexKey::from_f64(3.0))]);
        assert_eq!(out.records, vec![2]);
        assert_eq!(out.keys_examined, 1);
        assert_eq!(out.seeks, 1);

        let out = index.scan(&[Interval::greater_than(IndexKey::from_f64(2.0), true)]);
        assert_eq!(out.records, vec![1, 2, 3]);
    }

    #[test]
    fn test_descending_scan_order() {
        let mut index =
            Index::new(IndexSpec::from_key_pattern(&pattern(json!({"a": -1}))).unwrap());
        for (rid, a) in [1, 2, 3].iter().enumerate() {
            index.insert(&json!({"a": a}), rid as RecordId);
        }
        assert_eq!(index.scan(&[Interval::all()]).records, vec![2, 1, 0]);
    }

    #[test]
    fn test_missing_field_indexed_as_null() {
        let mut index = Index::new(IndexSpec::from_key_pattern(&pattern(json!({"a": 1}))).unwrap());
        index.insert(&json!({"b": 1}), 7);
        assert_eq!(index.scan(&[Interval::point(IndexKey::Null)]).records, vec![7]);
    }

    #[test]
    fn test_multikey_dedup() {
        let mut index = Index::new(IndexSpec::from_key_pattern(&pattern(json!({"a": 1}))).unwrap());
        index.insert(&json!({"a": [1, 2]}), 0);
        index.insert(&json!({"a": 2}), 1);
        assert!(index.is_multikey());

        let out = index.scan(&[Interval::all()]);
        assert_eq!(out.records, vec![0, 1]);
        assert_eq!(out.keys_examined, 3);
        assert_eq!(out.dups_dropped, 1);
    }

    #[test]
    fn test_empty_interval_skipped() {
        let index = Index::new(IndexSpec::id_index());
        let empty = Interval {
            start: IndexKey::from_f64(2.0),
            start_inclusive: false,
            end: IndexKey::from_f64(2.0),
            end_inclusive: false,
        };
        let out = index.scan(&[empty]);
        assert_eq!(out.seeks, 0);
        assert!(out.records.is_empty());
    }
}
