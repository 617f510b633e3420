//! # Row Projector
//!
//! Maps result rows through the field mapping into output records whose
//! keys keep mapping order.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use super::mapping::{FieldMapping, FieldSpec, TemplatePart};
use super::path::{resolve, RowAccessor};

/// One output record, keys in mapping order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedRow {
    fields: Vec<(String, Value)>,
}

impl ProjectedRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: Value) {
        self.fields.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ProjectedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Text substituted for a template placeholder
fn placeholder_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Project one row
pub fn project_row(row: &dyn RowAccessor, mapping: &FieldMapping) -> ProjectedRow {
    let mut out = ProjectedRow::new();

    for (key, spec) in mapping.entries() {
        let value = match spec {
            FieldSpec::Path(path) => resolve(row, path).into_projected(),
            FieldSpec::Template(template) => {
                let mut text = String::new();
                for part in template.parts() {
                    match part {
                        TemplatePart::Literal(literal) => text.push_str(literal),
                        TemplatePart::Token(path) => {
                            text.push_str(&placeholder_text(resolve(row, path).into_projected()))
                        }
                    }
                }
                Value::String(text)
            }
        };
        out.push(key.into_owned(), value);
    }

    out
}

/// Project every row, preserving row order
pub fn project_rows<R: RowAccessor>(rows: &[R], mapping: &FieldMapping) -> Vec<ProjectedRow> {
    rows.iter().map(|row| project_row(row, mapping)).collect()
}
