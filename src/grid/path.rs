//! # Field Paths
//!
//! Physical field paths and the accessor interface rows expose so that
//! nested paths can be walked without runtime reflection.

use std::fmt;

use serde_json::Value;

/// Sentinel projected for a value that is neither primitive nor identifiable
pub const UNRESOLVED_SENTINEL: &str = "ERROR";

/// Ordered list of field identifiers, e.g. `owner__profile__name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a path whose segments are separated by `__` or `.`
    pub fn parse(raw: &str) -> Option<Self> {
        let segments: Vec<String> = raw
            .split("__")
            .flat_map(|part| part.split('.'))
            .map(|s| s.trim().to_string())
            .collect();

        if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return None;
        }

        Some(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment of the path
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// What a row holds under one attribute name
pub enum Attribute<'a> {
    /// Primitive value
    Value(Value),
    /// Reference to a related row
    Relation(&'a dyn RowAccessor),
    /// Relation slot with no related row
    Empty,
    /// Neither a primitive nor a relation
    Opaque,
}

/// Attribute access on a result row
pub trait RowAccessor {
    /// Look up one attribute. `None` if the row has no such attribute.
    fn attribute(&self, name: &str) -> Option<Attribute<'_>>;

    /// Identifier a relation is reduced to when projected
    fn identifier(&self) -> Option<Value>;
}

/// Outcome of walking a path through a row
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value(Value),
    /// Missing attribute or missing relation along the way
    Null,
    /// Last segment was an object without an identifier
    Unidentified,
}

impl Resolved {
    /// Value used when projecting into an output record
    pub fn into_projected(self) -> Value {
        match self {
            Resolved::Value(v) => v,
            Resolved::Null => Value::Null,
            Resolved::Unidentified => Value::String(UNRESOLVED_SENTINEL.to_string()),
        }
    }

    /// Value used when evaluating predicates; unidentified objects compare as null
    pub fn into_comparable(self) -> Value {
        match self {
            Resolved::Value(v) => v,
            Resolved::Null | Resolved::Unidentified => Value::Null,
        }
    }
}

/// Walk `path` through `row`.
///
/// Intermediate segments must be relations; anything else short-circuits to
/// [`Resolved::Null`]. The last segment yields a primitive as-is, a relation
/// reduced to its identifier, or [`Resolved::Unidentified`].
pub fn resolve(row: &dyn RowAccessor, path: &FieldPath) -> Resolved {
    let segments = path.segments();
    let Some((leaf, parents)) = segments.split_last() else {
        return Resolved::Null;
    };

    let mut current = row;
    for segment in parents {
        match current.attribute(segment) {
            Some(Attribute::Relation(related)) => current = related,
            _ => return Resolved::Null,
        }
    }

    match current.attribute(leaf) {
        None | Some(Attribute::Empty) => Resolved::Null,
        Some(Attribute::Value(v)) => Resolved::Value(v),
        Some(Attribute::Relation(related)) => match related.identifier() {
            Some(id) => Resolved::Value(id),
            None => Resolved::Unidentified,
        },
        Some(Attribute::Opaque) => Resolved::Unidentified,
    }
}

/// JSON documents: nested objects are relations identified by their `id` key.
impl RowAccessor for Value {
    fn attribute(&self, name: &str) -> Option<Attribute<'_>> {
        let value = self.as_object()?.get(name)?;
        Some(match value {
            Value::Object(_) => Attribute::Relation(value),
            Value::Array(_) => Attribute::Opaque,
            other => Attribute::Value(other.clone()),
        })
    }

    fn identifier(&self) -> Option<Value> {
        self.get("id").filter(|id| !id.is_null()).cloned()
    }
}
