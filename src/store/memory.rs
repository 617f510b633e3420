//! # In-Memory Store
//!
//! `GridStore` over JSON documents grouped by collection. Used by the
//! binary (loaded from a JSON data file) and by tests.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::debug;

use super::{GridStore, PageWindow, StoreError, StoreResult};
use crate::grid::path::{resolve, FieldPath};
use crate::grid::predicate::{FilterExpr, FilterOperator, Predicate, QueryPlan};
use crate::grid::request::SortDirection;

/// Collection name → documents
pub struct MemoryStore {
    data: RwLock<HashMap<String, Vec<Value>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_collections(collections: HashMap<String, Vec<Value>>) -> Self {
        Self {
            data: RwLock::new(collections),
        }
    }

    /// Load `{"collection": [doc, ...], ...}` from a JSON file
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| StoreError::Load(format!("{}: {}", path.display(), e)))?;
        let collections: HashMap<String, Vec<Value>> = serde_json::from_str(&content)
            .map_err(|e| StoreError::Load(format!("{}: {}", path.display(), e)))?;

        debug!(
            path = %path.display(),
            collections = collections.len(),
            "loaded in-memory grid data"
        );
        Ok(Self::with_collections(collections))
    }

    /// Append documents to a collection, creating it if needed
    pub fn insert(&self, collection: &str, documents: impl IntoIterator<Item = Value>) -> StoreResult<()> {
        let mut store = self
            .data
            .write()
            .map_err(|_| StoreError::Unavailable("Lock poisoned".to_string()))?;
        store
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
        Ok(())
    }

    /// Run `f` over the documents matching `plan`
    fn with_matching<T>(
        &self,
        collection: &str,
        plan: Option<&QueryPlan>,
        f: impl FnOnce(Vec<&Value>) -> T,
    ) -> StoreResult<T> {
        let data = self
            .data
            .read()
            .map_err(|_| StoreError::Unavailable("Lock poisoned".to_string()))?;
        let records = data
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        let predicate = plan.and_then(QueryPlan::predicate);
        let matching = match &predicate {
            Some(predicate) => {
                let evaluator = Evaluator::new(predicate)?;
                records.iter().filter(|r| evaluator.matches(predicate, r)).collect()
            }
            None => records.iter().collect(),
        };

        Ok(f(matching))
    }
}

impl GridStore for MemoryStore {
    type Row = Value;

    fn count(&self, collection: &str, plan: Option<&QueryPlan>) -> StoreResult<usize> {
        self.with_matching(collection, plan, |rows| rows.len())
    }

    fn fetch(&self, collection: &str, plan: &QueryPlan, window: PageWindow) -> StoreResult<Vec<Value>> {
        self.with_matching(collection, Some(plan), |mut rows| {
            apply_ordering(&mut rows, plan);
            rows.into_iter()
                .skip(window.offset)
                .take(window.limit.unwrap_or(usize::MAX))
                .cloned()
                .collect()
        })
    }
}

/// Regex clauses compiled once per query
struct Evaluator {
    patterns: HashMap<String, Regex>,
}

impl Evaluator {
    fn new(predicate: &Predicate) -> StoreResult<Self> {
        let mut patterns = HashMap::new();
        for clause in predicate.clauses() {
            if clause.operator != FilterOperator::IRegex {
                continue;
            }
            let pattern = clause.value.as_str().unwrap_or_default();
            if patterns.contains_key(pattern) {
                continue;
            }
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| StoreError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })?;
            patterns.insert(pattern.to_string(), regex);
        }
        Ok(Self { patterns })
    }

    fn matches(&self, predicate: &Predicate, doc: &Value) -> bool {
        match predicate {
            Predicate::Clause(expr) => self.matches_clause(expr, doc),
            Predicate::And(children) => children.iter().all(|c| self.matches(c, doc)),
            Predicate::Or(children) => children.iter().any(|c| self.matches(c, doc)),
        }
    }

    fn matches_clause(&self, expr: &FilterExpr, doc: &Value) -> bool {
        let field_value = field_value(doc, &expr.field);

        match expr.operator {
            FilterOperator::Eq => {
                field_value == expr.value
                    || compare_json_values(&field_value, &expr.value) == Some(Ordering::Equal)
            }
            FilterOperator::Gt => compare_json_values(&field_value, &expr.value) == Some(Ordering::Greater),
            FilterOperator::Gte => matches!(
                compare_json_values(&field_value, &expr.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::Lt => compare_json_values(&field_value, &expr.value) == Some(Ordering::Less),
            FilterOperator::IContains => {
                let (Some(text), Some(term)) = (searchable_text(&field_value), expr.value.as_str()) else {
                    return false;
                };
                text.to_lowercase().contains(&term.to_lowercase())
            }
            FilterOperator::IRegex => {
                let pattern = expr.value.as_str().unwrap_or_default();
                match (searchable_text(&field_value), self.patterns.get(pattern)) {
                    (Some(text), Some(regex)) => regex.is_match(&text),
                    _ => false,
                }
            }
        }
    }
}

fn field_value(doc: &Value, field: &FieldPath) -> Value {
    resolve(doc, field).into_comparable()
}

/// Numbers and booleans compare numerically, strings lexically
fn compare_json_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (as_number(a), as_number(b)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => match (a, b) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        },
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn searchable_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Total order used for sorting: nulls, then numbers and booleans, then
/// strings, then everything else
fn sort_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) | Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) | Value::Object(_) => 3,
    }
}

fn apply_ordering(records: &mut [&Value], plan: &QueryPlan) {
    if plan.order().is_empty() {
        return;
    }

    records.sort_by(|a, b| {
        for clause in plan.order() {
            let a_val = field_value(a, &clause.field);
            let b_val = field_value(b, &clause.field);

            let cmp = compare_json_values(&a_val, &b_val)
                .unwrap_or_else(|| sort_rank(&a_val).cmp(&sort_rank(&b_val)));

            let cmp = match clause.direction {
                SortDirection::Asc => cmp,
                SortDirection::Desc => cmp.reverse(),
            };
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    });
}
