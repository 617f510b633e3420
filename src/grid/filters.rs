//! # Ad-hoc Filter Terms
//!
//! Independent key/value constraints supplied alongside the grid request as
//! a JSON object, e.g. `{"age:from": 18, "status": ["open", "closed"]}`.
//!
//! Each term compiles by shape, first match wins:
//!
//! 1. `field:from` → `field >= value`
//! 2. `field:to` → `field < value`
//! 3. list value → `field = a OR field = b ...`
//! 4. boolean or integer → `field > 0` when truthy, `field = 0` otherwise
//! 5. field ending in the hash suffix → equality with the SHA-256 hex digest
//! 6. anything else → case-insensitive containment
//!
//! Range and list terms become their own chained stages; the remaining
//! terms are AND-ed into a single stage placed after them.

use chrono::{FixedOffset, Offset, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::coerce::{coerce_value, Coerced};
use super::errors::{GridError, GridResult};
use super::path::FieldPath;
use super::predicate::{FilterExpr, Predicate};

/// Default suffix marking fields stored as SHA-256 digests
pub const DEFAULT_HASH_SUFFIX: &str = "sha256";

/// One ad-hoc filter constraint
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTerm {
    pub key: String,
    pub value: Value,
}

/// Range modifier of a term key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    From,
    To,
}

impl FilterTerm {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Split `field:modifier`
    pub fn field_and_modifier(&self) -> (&str, Option<&str>) {
        match self.key.split_once(':') {
            Some((field, modifier)) => (field, Some(modifier)),
            None => (self.key.as_str(), None),
        }
    }
}

/// Coercion and hashing settings for one view
#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// Offset timestamp filter values are written in
    pub source_offset: FixedOffset,
    pub hash_suffix: String,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            source_offset: Utc.fix(),
            hash_suffix: DEFAULT_HASH_SUFFIX.to_string(),
        }
    }
}

/// All ad-hoc terms of one request, in key order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    terms: Vec<FilterTerm>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the filter blob parameter.
    ///
    /// The blob is wrapped in `[...]` and the first element taken, so both a
    /// bare object and a comma-separated list of objects are accepted. It is
    /// a required declaration: absent, unparsable or empty blobs are rejected.
    pub fn from_blob(key: &str, raw: Option<&str>) -> GridResult<Self> {
        let raw = raw.ok_or_else(|| GridError::MissingFilters(key.to_string()))?;

        let wrapped: Vec<Value> = serde_json::from_str(&format!("[{}]", raw))
            .map_err(|e| GridError::InvalidFilters(format!("{}: {}", key, e)))?;

        let object = match wrapped.into_iter().next() {
            Some(Value::Object(object)) => object,
            Some(other) => {
                return Err(GridError::InvalidFilters(format!(
                    "{} must be a JSON object, got {}",
                    key, other
                )))
            }
            None => return Err(GridError::MissingFilters(key.to_string())),
        };

        if object.is_empty() {
            return Err(GridError::MissingFilters(key.to_string()));
        }

        Ok(Self::from_map(object))
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self {
            terms: map.into_iter().map(|(k, v)| FilterTerm::new(k, v)).collect(),
        }
    }

    /// Add a term, replacing any existing term with the same key
    pub fn set(&mut self, term: FilterTerm) {
        match self.terms.iter_mut().find(|t| t.key == term.key) {
            Some(existing) => *existing = term,
            None => self.terms.push(term),
        }
    }

    pub fn terms(&self) -> &[FilterTerm] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Compile into chained filter stages
    pub fn compile(&self, options: &FilterOptions) -> Vec<Predicate> {
        let mut stages = Vec::new();
        let mut combined = Vec::new();

        for term in &self.terms {
            let (raw_field, modifier) = term.field_and_modifier();
            let Some(field) = FieldPath::parse(raw_field) else {
                warn!(key = %term.key, "skipping filter term with invalid field path");
                continue;
            };

            let is_list = term.value.is_array();
            let values: Vec<Coerced> = match &term.value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| coerce_value(item, &options.source_offset))
                    .collect(),
                scalar => vec![coerce_value(scalar, &options.source_offset)],
            };

            let bound = match modifier {
                None => None,
                Some("from") => Some(RangeBound::From),
                Some("to") => Some(RangeBound::To),
                Some(other) => {
                    warn!(key = %term.key, modifier = other, "skipping filter term with unknown modifier");
                    continue;
                }
            };

            if let Some(bound) = bound {
                if let Some(first) = values.first() {
                    stages.push(range_clause(field, bound, first).into());
                }
                continue;
            }

            if is_list {
                let alternatives = values
                    .iter()
                    .map(|v| FilterExpr::eq(field.clone(), v.to_value()).into())
                    .collect();
                if let Some(any) = Predicate::any(alternatives) {
                    stages.push(any);
                }
                continue;
            }

            if let Some(value) = values.into_iter().next() {
                combined.push(scalar_clause(field, raw_field, value, options).into());
            }
        }

        if let Some(all) = Predicate::all(combined) {
            stages.push(all);
        }
        stages
    }
}

fn range_clause(field: FieldPath, bound: RangeBound, value: &Coerced) -> FilterExpr {
    match bound {
        RangeBound::From => FilterExpr::gte(field, value.to_value()),
        RangeBound::To => FilterExpr::lt(field, value.to_value()),
    }
}

fn scalar_clause(field: FieldPath, raw_field: &str, value: Coerced, options: &FilterOptions) -> FilterExpr {
    if let Some(flag) = value.as_flag() {
        return if flag {
            FilterExpr::gt(field, Value::from(0))
        } else {
            FilterExpr::eq(field, Value::from(0))
        };
    }
    if value == Coerced::Null {
        return FilterExpr::eq(field, Value::Null);
    }
    if raw_field.ends_with(options.hash_suffix.as_str()) {
        return FilterExpr::eq(field, Value::String(sha256_hex(&value.to_text())));
    }
    FilterExpr::icontains(field, &value.to_text())
}

/// Lowercase hex SHA-256 digest
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(blob: &str) -> Vec<Predicate> {
        FilterSet::from_blob("sFilters", Some(blob))
            .unwrap()
            .compile(&FilterOptions::default())
    }

    fn rendered(blob: &str) -> String {
        Predicate::all(compile(blob)).unwrap().to_string()
    }

    #[test]
    fn test_range_terms() {
        let stages = compile(r#"{"age:from": 18, "age:to": 65}"#);
        assert_eq!(stages.len(), 2);
        assert_eq!(rendered(r#"{"age:from": 18, "age:to": 65}"#), "age >= 18 AND age < 65");
    }

    #[test]
    fn test_range_string_values_coerce() {
        assert_eq!(
            rendered(r#"{"created:from": "01/02/2024 08:15 AM", "count:to": "10"}"#),
            "count < 10 AND created >= 2024-01-02T08:15:00"
        );
    }

    #[test]
    fn test_list_term() {
        let stages = compile(r#"{"status": ["open", "closed"]}"#);
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].to_string(), "status = open OR status = closed");
    }

    #[test]
    fn test_empty_list_is_pass_through() {
        let set = FilterSet::from_blob("sFilters", Some(r#"{"status": []}"#)).unwrap();
        assert!(set.compile(&FilterOptions::default()).is_empty());
    }

    #[test]
    fn test_flag_terms() {
        assert_eq!(rendered(r#"{"active": true}"#), "active > 0");
        assert_eq!(rendered(r#"{"active": false}"#), "active = 0");
        assert_eq!(rendered(r#"{"active": 0}"#), "active = 0");
        assert_eq!(rendered(r#"{"visits": "3"}"#), "visits > 0");
    }

    #[test]
    fn test_hash_suffix_term() {
        let stages = compile(r#"{"token_sha256": "secret"}"#);
        let expected = sha256_hex("secret");
        assert_eq!(stages[0].to_string(), format!("token_sha256 = {}", expected));
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn test_text_term_and_combined_stage() {
        let stages = compile(r#"{"name": "Jan", "active": true, "age:from": 30}"#);
        // range first, combined scalar stage last
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].to_string(), "age >= 30");
        assert_eq!(stages[1].to_string(), "active > 0 AND name~Jan");
    }

    #[test]
    fn test_unknown_modifier_is_skipped() {
        assert!(compile(r#"{"age:around": 5}"#).is_empty());
    }

    #[test]
    fn test_blob_rejections() {
        assert!(matches!(
            FilterSet::from_blob("sFilters", None),
            Err(GridError::MissingFilters(_))
        ));
        assert!(matches!(
            FilterSet::from_blob("sFilters", Some("{}")),
            Err(GridError::MissingFilters(_))
        ));
        assert!(matches!(
            FilterSet::from_blob("sFilters", Some("{nope")),
            Err(GridError::InvalidFilters(_))
        ));
        assert!(matches!(
            FilterSet::from_blob("sFilters", Some("42")),
            Err(GridError::InvalidFilters(_))
        ));
    }

    #[test]
    fn test_blob_takes_first_object() {
        let set = FilterSet::from_blob("sFilters", Some(r#"{"a": 1}, {"b": 2}"#)).unwrap();
        assert_eq!(set.terms(), &[FilterTerm::new("a", json!(1))]);
    }

    #[test]
    fn test_set_replaces_existing_key() {
        let mut set = FilterSet::from_blob("sFilters", Some(r#"{"user__id": [9]}"#)).unwrap();
        set.set(FilterTerm::new("user__id", json!(["42"])));
        assert_eq!(set.terms().len(), 1);
        let stages = set.compile(&FilterOptions::default());
        assert_eq!(stages[0].to_string(), "user.id = 42");
    }
}
