//! Hint-aware query planner
//!
//! Produces a single deterministic plan per query.
//!
//! A hint is binding: the hinted index (or natural-order scan) is used
//! even if no predicate references it. Without a hint, index selection
//! follows a strict priority:
//!
//! 1. `_id` equality
//! 2. Indexed equality predicate
//! 3. Indexed range predicate
//! 4. Top-level `$or` whose every branch is indexable
//! 5. Collection scan
//!
//! Ties are broken lexicographically by field name.

use crate::requestor::Hint;

use super::errors::{EngineError, EngineResult};
use super::filter::{CompareOp, MatchExpr, Predicate};
use super::index::{IndexKey, IndexSpec, Interval};

/// Read-only view of a collection's indexes
pub trait IndexCatalog {
    /// All index specs, in name order
    fn index_specs(&self) -> Vec<&IndexSpec>;

    /// Whether an index holds array-valued keys
    fn is_multikey(&self, name: &str) -> bool;
}

/// Query solution tree
#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    /// Full scan in natural order (1 forward, -1 backward)
    CollScan { filter: MatchExpr, direction: i64 },
    /// Index scan over key intervals
    IxScan {
        index: IndexSpec,
        intervals: Vec<Interval>,
        multikey: bool,
    },
    /// Loads documents for record ids and applies the residual filter
    Fetch { filter: MatchExpr, input: Box<PlanNode> },
    /// Union of child record ids, deduplicated
    Or { inputs: Vec<PlanNode> },
}

impl PlanNode {
    /// Short description such as `IXSCAN { a: 1 }`
    pub fn summary(&self) -> String {
        match self {
            PlanNode::CollScan { .. } => "COLLSCAN".to_string(),
            PlanNode::IxScan { index, .. } => {
                format!("IXSCAN {{ {}: {} }}", index.field, index.direction)
            }
            PlanNode::Fetch { input, .. } => input.summary(),
            PlanNode::Or { inputs } => inputs
                .iter()
                .map(PlanNode::summary)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Visits this node and its descendants, pre-order
    pub fn for_each<'a>(&'a self, f: &mut dyn FnMut(&'a PlanNode)) {
        f(self);
        match self {
            PlanNode::Fetch { input, .. } => input.for_each(f),
            PlanNode::Or { inputs } => {
                for input in inputs {
                    input.for_each(f);
                }
            }
            PlanNode::CollScan { .. } | PlanNode::IxScan { .. } => {}
        }
    }
}

/// Planner over one collection's index catalog
pub struct QueryPlanner<'a, C: IndexCatalog> {
    catalog: &'a C,
}

impl<'a, C: IndexCatalog> QueryPlanner<'a, C> {
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Plans a query. Same filter, hint and catalog give the same plan.
    pub fn plan(&self, filter: &MatchExpr, hint: Option<&Hint>) -> EngineResult<PlanNode> {
        match hint {
            Some(Hint::Natural(direction)) => Ok(PlanNode::CollScan {
                filter: filter.clone(),
                direction: *direction,
            }),
            Some(Hint::IndexName(name)) => {
                let spec = self
                    .catalog
                    .index_specs()
                    .into_iter()
                    .find(|s| &s.name == name)
                    .ok_or_else(bad_hint)?;
                Ok(self.index_plan(spec, filter))
            }
            Some(Hint::KeyPattern(pattern)) => {
                let spec = self
                    .catalog
                    .index_specs()
                    .into_iter()
                    .find(|s| s.matches_pattern(pattern))
                    .ok_or_else(bad_hint)?;
                Ok(self.index_plan(spec, filter))
            }
            None => Ok(self.choose(filter)),
        }
    }

    fn choose(&self, filter: &MatchExpr) -> PlanNode {
        if let Some(spec) = self.select_index(filter.top_level_predicates()) {
            return self.index_plan(spec, filter);
        }

        if let Some(or_plan) = self.or_plan(filter) {
            return PlanNode::Fetch {
                filter: filter.clone(),
                input: Box::new(or_plan),
            };
        }

        PlanNode::CollScan {
            filter: filter.clone(),
            direction: 1,
        }
    }

    /// One index scan per `$or` branch, if every branch has a usable index
    fn or_plan(&self, filter: &MatchExpr) -> Option<PlanNode> {
        let branches = filter.conjuncts().iter().find_map(|c| match c {
            MatchExpr::Or(branches) => Some(branches),
            _ => None,
        })?;

        let inputs = branches
            .iter()
            .map(|branch| {
                let spec = self.select_index(branch.top_level_predicates())?;
                Some(self.index_scan(spec, branch))
            })
            .collect::<Option<Vec<_>>>()?;

        Some(PlanNode::Or { inputs })
    }

    fn select_index<'p>(
        &self,
        predicates: impl Iterator<Item = &'p Predicate>,
    ) -> Option<&'a IndexSpec> {
        let predicates: Vec<&Predicate> = predicates.collect();

        if predicates.iter().any(|p| p.path == "_id" && p.is_equality()) {
            if let Some(spec) = self.index_on("_id") {
                return Some(spec);
            }
        }

        for equality in [true, false] {
            let mut candidates: Vec<&str> = predicates
                .iter()
                .filter(|p| p.is_equality() == equality && self.index_on(&p.path).is_some())
                .map(|p| p.path.as_str())
                .collect();
            candidates.sort();
            if let Some(field) = candidates.first() {
                return self.index_on(field);
            }
        }

        None
    }

    /// Prefers the ascending index when a field has both directions
    fn index_on(&self, field: &str) -> Option<&'a IndexSpec> {
        let specs: Vec<&'a IndexSpec> = self
            .catalog
            .index_specs()
            .into_iter()
            .filter(|s| s.field == field)
            .collect();
        specs
            .iter()
            .find(|s| s.direction == 1)
            .or_else(|| specs.first())
            .copied()
    }

    fn index_scan(&self, spec: &IndexSpec, filter: &MatchExpr) -> PlanNode {
        let multikey = self.catalog.is_multikey(&spec.name);
        let predicates: Vec<&Predicate> = filter
            .top_level_predicates()
            .filter(|p| p.path == spec.field)
            .collect();

        PlanNode::IxScan {
            index: spec.clone(),
            intervals: bounds_for(&predicates, multikey),
            multikey,
        }
    }

    /// Index scan plus fetch. An equality is dropped from the fetch filter
    /// only when it alone built the bounds and its key answers it exactly.
    fn index_plan(&self, spec: &IndexSpec, filter: &MatchExpr) -> PlanNode {
        let scan = self.index_scan(spec, filter);
        let multikey = self.catalog.is_multikey(&spec.name);

        let on_field: Vec<&Predicate> = filter
            .top_level_predicates()
            .filter(|p| p.path == spec.field)
            .collect();

        let exact: Vec<&Predicate> = match on_field.as_slice() {
            [only] if !multikey && only.is_equality() && IndexKey::is_exact(&only.value) => {
                vec![*only]
            }
            _ => Vec::new(),
        };

        PlanNode::Fetch {
            filter: filter.without(&exact),
            input: Box::new(scan),
        }
    }
}

fn bad_hint() -> EngineError {
    EngineError::bad_value("hint provided does not correspond to an existing index")
}

/// Intersects predicate intervals on one field.
///
/// Multikey indexes only take the first bounding predicate, since different
/// array elements may satisfy different predicates.
fn bounds_for(predicates: &[&Predicate], multikey: bool) -> Vec<Interval> {
    let mut bounds = Interval::all();
    let mut applied = 0;

    for predicate in predicates {
        if multikey && applied > 0 {
            break;
        }
        let Some(key) = IndexKey::from_json(&predicate.value) else {
            continue;
        };
        let interval = match predicate.op {
            CompareOp::Eq => Interval::point(key),
            CompareOp::Gt => Interval::greater_than(key, false),
            CompareOp::Gte => Interval::greater_than(key, true),
            CompareOp::Lt => Interval::less_than(key, false),
            CompareOp::Lte => Interval::less_than(key, true),
        };
        bounds = bounds.intersect(&interval);
        applied += 1;
    }

    if bounds.is_empty() {
        Vec::new()
    } else {
        vec![bounds]
    }
}
