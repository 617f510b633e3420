//! # Field Mapping
//!
//! Translates logical grid columns into physical field paths. A mapping entry
//! is either a literal path or a template such as `"{first} {last}"` whose
//! placeholders are themselves paths.

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

use super::errors::{GridError, GridResult};
use super::path::FieldPath;
use super::request::GridRequest;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^}]*)\}").expect("static placeholder pattern"))
}

/// Piece of a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Token(FieldPath),
}

/// Output value composed from several fields by placeholder substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    parts: Vec<TemplatePart>,
}

impl Template {
    /// Parse a template. Returns `Ok(None)` when `raw` has no placeholders.
    pub fn parse(raw: &str) -> GridResult<Option<Self>> {
        let mut parts = Vec::new();
        let mut cursor = 0;

        for caps in placeholder_regex().captures_iter(raw) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > cursor {
                parts.push(TemplatePart::Literal(raw[cursor..whole.start()].to_string()));
            }
            let path = FieldPath::parse(inner.as_str()).ok_or_else(|| {
                GridError::Config(format!("invalid placeholder {{{}}} in {:?}", inner.as_str(), raw))
            })?;
            parts.push(TemplatePart::Token(path));
            cursor = whole.end();
        }

        if parts.is_empty() {
            return Ok(None);
        }
        if cursor < raw.len() {
            parts.push(TemplatePart::Literal(raw[cursor..].to_string()));
        }

        Ok(Some(Self { parts }))
    }

    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    /// Embedded paths in declaration order
    pub fn tokens(&self) -> impl Iterator<Item = &FieldPath> {
        self.parts.iter().filter_map(|part| match part {
            TemplatePart::Token(path) => Some(path),
            TemplatePart::Literal(_) => None,
        })
    }
}

/// One mapping entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSpec {
    Path(FieldPath),
    Template(Template),
}

impl FieldSpec {
    pub fn parse(raw: &str) -> GridResult<Self> {
        if let Some(template) = Template::parse(raw)? {
            return Ok(FieldSpec::Template(template));
        }
        FieldPath::parse(raw)
            .map(FieldSpec::Path)
            .ok_or_else(|| GridError::Config(format!("invalid field path {:?}", raw)))
    }

    /// Physical paths this entry reads, in order
    pub fn paths(&self) -> Vec<FieldPath> {
        match self {
            FieldSpec::Path(path) => vec![path.clone()],
            FieldSpec::Template(template) => template.tokens().cloned().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for FieldSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FieldSpec::parse(&raw).map_err(de::Error::custom)
    }
}

/// How a request addresses a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef<'a> {
    Index(usize),
    Key(&'a str),
}

impl fmt::Display for ColumnRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(i) => write!(f, "#{}", i),
            ColumnRef::Key(key) => write!(f, "{:?}", key),
        }
    }
}

/// Ordered logical column → physical field configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMapping {
    /// List mapping, addressed by column index
    Positional(Vec<FieldSpec>),
    /// Dict mapping, addressed by the client's `columns[i][data]` key
    Keyed(Vec<(String, FieldSpec)>),
}

impl FieldMapping {
    /// Build a keyed mapping from `(key, spec)` string pairs
    pub fn keyed<I, K, V>(entries: I) -> GridResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| Ok((k.into(), FieldSpec::parse(v.as_ref())?)))
            .collect::<GridResult<Vec<_>>>()?;
        Ok(FieldMapping::Keyed(entries))
    }

    /// Build a positional mapping from spec strings
    pub fn positional<I, V>(specs: I) -> GridResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let specs = specs
            .into_iter()
            .map(|v| FieldSpec::parse(v.as_ref()))
            .collect::<GridResult<Vec<_>>>()?;
        Ok(FieldMapping::Positional(specs))
    }

    pub fn is_keyed(&self) -> bool {
        matches!(self, FieldMapping::Keyed(_))
    }

    pub fn len(&self) -> usize {
        match self {
            FieldMapping::Positional(specs) => specs.len(),
            FieldMapping::Keyed(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How `request` addresses column `index` under this mapping
    pub fn column_ref<'r>(&self, index: usize, request: &'r GridRequest) -> GridResult<ColumnRef<'r>> {
        match self {
            FieldMapping::Positional(_) => Ok(ColumnRef::Index(index)),
            FieldMapping::Keyed(_) => request
                .columns
                .get(index)
                .map(|column| ColumnRef::Key(column.data.as_str()))
                .ok_or_else(|| GridError::UnknownColumn(format!("#{}", index))),
        }
    }

    /// Mapping entry for a column reference
    pub fn spec(&self, column: ColumnRef<'_>) -> GridResult<&FieldSpec> {
        let found = match (self, column) {
            (FieldMapping::Positional(specs), ColumnRef::Index(i)) => specs.get(i),
            (FieldMapping::Keyed(entries), ColumnRef::Key(key)) => {
                entries.iter().find(|(k, _)| k == key).map(|(_, spec)| spec)
            }
            (FieldMapping::Keyed(entries), ColumnRef::Index(i)) => entries.get(i).map(|(_, spec)| spec),
            (FieldMapping::Positional(_), ColumnRef::Key(_)) => None,
        };
        found.ok_or_else(|| GridError::UnknownColumn(column.to_string()))
    }

    /// Physical paths for a column; templates expand to their tokens
    pub fn resolve(&self, column: ColumnRef<'_>) -> GridResult<Vec<FieldPath>> {
        Ok(self.spec(column)?.paths())
    }

    /// Physical paths for the column at `index` of `request`
    pub fn resolve_column(&self, index: usize, request: &GridRequest) -> GridResult<Vec<FieldPath>> {
        let column = self.column_ref(index, request)?;
        self.resolve(column)
    }

    /// Every physical path the mapping reads, in order, without duplicates
    pub fn all_paths(&self) -> Vec<FieldPath> {
        let mut paths: Vec<FieldPath> = Vec::new();
        for (_, spec) in self.entries() {
            for path in spec.paths() {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        paths
    }

    /// Output key and spec for every entry, in mapping order.
    ///
    /// Positional mappings use the column index as key.
    pub fn entries(&self) -> Box<dyn Iterator<Item = (Cow<'_, str>, &FieldSpec)> + '_> {
        match self {
            FieldMapping::Positional(specs) => Box::new(
                specs
                    .iter()
                    .enumerate()
                    .map(|(i, spec)| (Cow::Owned(i.to_string()), spec)),
            ),
            FieldMapping::Keyed(entries) => Box::new(
                entries
                    .iter()
                    .map(|(key, spec)| (Cow::Borrowed(key.as_str()), spec)),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for FieldMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = FieldMapping;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of field specs or a map of output key to field spec")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut specs = Vec::new();
                while let Some(spec) = seq.next_element::<FieldSpec>()? {
                    specs.push(spec);
                }
                Ok(FieldMapping::Positional(specs))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, FieldSpec)> = Vec::new();
                while let Some((key, spec)) = map.next_entry::<String, FieldSpec>()? {
                    if entries.iter().any(|(k, _)| *k == key) {
                        return Err(de::Error::custom(format!("duplicate output key {:?}", key)));
                    }
                    entries.push((key, spec));
                }
                Ok(FieldMapping::Keyed(entries))
            }
        }

        deserializer.deserialize_any(MappingVisitor)
    }
}
