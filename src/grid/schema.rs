//! # Schema Capabilities
//!
//! Per-field type classification used to decide which fields accept regex
//! lookups, and to reject view configurations that reference fields the
//! store does not have.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::errors::{GridError, GridResult};
use super::mapping::FieldMapping;
use super::path::FieldPath;

/// Declared type of a stored field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Float,
    Decimal,
    Bool,
    DateTime,
    /// Reference to another record with its own fields
    Relation {
        #[serde(default)]
        fields: HashMap<String, FieldType>,
    },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Decimal => "decimal",
            FieldType::Bool => "bool",
            FieldType::DateTime => "datetime",
            FieldType::Relation { .. } => "relation",
        }
    }

    fn is_numeric_or_bool(&self) -> bool {
        matches!(
            self,
            FieldType::Int | FieldType::Float | FieldType::Decimal | FieldType::Bool
        )
    }
}

/// Which field types the store can run regex lookups on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegexSupport {
    #[default]
    All,
    /// Numeric and boolean columns reject regex
    TextOnly,
}

/// Schema capability collaborator
pub trait SchemaCapabilities: Send + Sync {
    /// Declared type of the field at `path`, if known
    fn field_type(&self, path: &FieldPath) -> Option<&FieldType>;

    /// Whether a regex lookup may be issued against `path`
    fn supports_regex(&self, path: &FieldPath) -> bool;

    /// Reject paths the backing collection cannot resolve
    fn check_path(&self, _path: &FieldPath) -> GridResult<()> {
        Ok(())
    }

    fn check_mapping(&self, mapping: &FieldMapping) -> GridResult<()> {
        for path in mapping.all_paths() {
            self.check_path(&path)?;
        }
        Ok(())
    }
}

/// Field-type declaration for one collection.
///
/// A schema with no declared fields accepts every path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub regex_support: RegexSupport,

    #[serde(default)]
    pub fields: HashMap<String, FieldType>,
}

impl Schema {
    pub fn new(fields: HashMap<String, FieldType>) -> Self {
        Self {
            regex_support: RegexSupport::All,
            fields,
        }
    }

    pub fn with_regex_support(mut self, support: RegexSupport) -> Self {
        self.regex_support = support;
        self
    }

    pub fn is_declared(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Walk `path` through nested relations
    fn lookup(&self, path: &FieldPath) -> Result<&FieldType, String> {
        let mut fields = &self.fields;
        let segments = path.segments();

        for (i, segment) in segments.iter().enumerate() {
            let field = fields
                .get(segment)
                .ok_or_else(|| format!("unknown field {:?} in {}", segment, path))?;

            if i + 1 == segments.len() {
                return Ok(field);
            }
            match field {
                FieldType::Relation { fields: nested } => fields = nested,
                other => {
                    return Err(format!(
                        "cannot traverse {} field {:?} in {}",
                        other.type_name(),
                        segment,
                        path
                    ))
                }
            }
        }

        Err(format!("empty path {}", path))
    }
}

impl SchemaCapabilities for Schema {
    fn field_type(&self, path: &FieldPath) -> Option<&FieldType> {
        self.lookup(path).ok()
    }

    fn supports_regex(&self, path: &FieldPath) -> bool {
        match self.regex_support {
            RegexSupport::All => true,
            RegexSupport::TextOnly => !self
                .field_type(path)
                .map(FieldType::is_numeric_or_bool)
                .unwrap_or(false),
        }
    }

    fn check_path(&self, path: &FieldPath) -> GridResult<()> {
        if !self.is_declared() {
            return Ok(());
        }
        self.lookup(path).map(|_| ()).map_err(GridError::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        serde_json::from_value(serde_json::json!({
            "regex_support": "text_only",
            "fields": {
                "name": {"type": "string"},
                "age": {"type": "int"},
                "active": {"type": "bool"},
                "owner": {"type": "relation", "fields": {
                    "id": {"type": "int"},
                    "email": {"type": "string"}
                }}
            }
        }))
        .unwrap()
    }

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    #[test]
    fn test_nested_lookup() {
        let schema = sample_schema();
        assert_eq!(schema.field_type(&path("owner__email")), Some(&FieldType::String));
        assert!(schema.field_type(&path("owner__phone")).is_none());
        assert!(schema.field_type(&path("name__first")).is_none());
    }

    #[test]
    fn test_text_only_regex_support() {
        let schema = sample_schema();
        assert!(schema.supports_regex(&path("name")));
        assert!(schema.supports_regex(&path("owner")));
        assert!(!schema.supports_regex(&path("age")));
        assert!(!schema.supports_regex(&path("owner__id")));
        assert!(!schema.supports_regex(&path("active")));

        let permissive = sample_schema().with_regex_support(RegexSupport::All);
        assert!(permissive.supports_regex(&path("age")));
    }

    #[test]
    fn test_check_mapping() {
        let schema = sample_schema();
        let good = FieldMapping::keyed([("who", "{name} <{owner__email}>"), ("age", "age")]).unwrap();
        assert!(schema.check_mapping(&good).is_ok());

        let bad = FieldMapping::keyed([("who", "{name} {owner__phone}")]).unwrap();
        assert!(matches!(schema.check_mapping(&bad), Err(GridError::Config(_))));

        assert!(Schema::default().check_mapping(&bad).is_ok());
    }
}
