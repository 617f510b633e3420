//! # Grid Request Parser
//!
//! Decodes the flat, index-keyed parameter set a grid client sends
//! (`columns[0][data]`, `order[0][dir]`, `search[value]`, ...) into a
//! [`GridRequest`].
//!
//! Parsing never fails. Absent or malformed values become their zero value,
//! and indexed sequences stop at the first missing index: clients omit
//! unused slots, so a gap ends the sequence rather than being an error.

use std::collections::HashMap;

use super::errors::{GridError, GridResult};
use super::mapping::{ColumnRef, FieldMapping};

/// Sort direction of one order entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `desc` (any case) is descending; anything else ascending
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Search box state, global or per column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSpec {
    pub value: String,
    pub regex: bool,
}

impl SearchSpec {
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// One column as declared by the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSpec {
    pub data: String,
    pub name: String,
    pub orderable: bool,
    pub searchable: bool,
    pub search: SearchSpec,
}

/// One sort entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSpec {
    pub column: usize,
    pub direction: SortDirection,
}

/// Parsed grid request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridRequest {
    pub columns: Vec<ColumnSpec>,
    pub orders: Vec<OrderSpec>,
    pub search: SearchSpec,
    pub start: usize,
    pub length: usize,
    /// Opaque token echoed back to the client
    pub draw: String,
}

impl GridRequest {
    /// Parse grid parameters from a HashMap
    pub fn parse(params: &HashMap<String, String>) -> Self {
        let text = |key: &str| params.get(key).cloned().unwrap_or_default();
        let flag = |key: &str| params.get(key).map(|v| parse_bool(v)).unwrap_or(false);
        let number = |key: &str| params.get(key).map(|v| parse_usize(v)).unwrap_or(0);

        let mut columns = Vec::new();
        for i in 0.. {
            let Some(data) = params.get(&format!("columns[{}][data]", i)) else {
                break;
            };
            columns.push(ColumnSpec {
                data: data.clone(),
                name: text(&format!("columns[{}][name]", i)),
                orderable: flag(&format!("columns[{}][orderable]", i)),
                searchable: flag(&format!("columns[{}][searchable]", i)),
                search: SearchSpec {
                    value: text(&format!("columns[{}][search][value]", i)),
                    regex: flag(&format!("columns[{}][search][regex]", i)),
                },
            });
        }

        let mut orders = Vec::new();
        for i in 0.. {
            let Some(column) = params.get(&format!("order[{}][column]", i)) else {
                break;
            };
            orders.push(OrderSpec {
                column: parse_usize(column),
                direction: params
                    .get(&format!("order[{}][dir]", i))
                    .map(|dir| SortDirection::parse(dir))
                    .unwrap_or_default(),
            });
        }

        GridRequest {
            columns,
            orders,
            search: SearchSpec {
                value: text("search[value]"),
                regex: flag("search[regex]"),
            },
            start: number("start"),
            length: number("length"),
            draw: text("draw"),
        }
    }

    /// Serialize back into the flat parameter form
    pub fn to_params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();

        for (i, column) in self.columns.iter().enumerate() {
            params.insert(format!("columns[{}][data]", i), column.data.clone());
            params.insert(format!("columns[{}][name]", i), column.name.clone());
            params.insert(format!("columns[{}][orderable]", i), column.orderable.to_string());
            params.insert(format!("columns[{}][searchable]", i), column.searchable.to_string());
            params.insert(format!("columns[{}][search][value]", i), column.search.value.clone());
            params.insert(format!("columns[{}][search][regex]", i), column.search.regex.to_string());
        }

        for (i, order) in self.orders.iter().enumerate() {
            params.insert(format!("order[{}][column]", i), order.column.to_string());
            params.insert(format!("order[{}][dir]", i), order.direction.as_str().to_string());
        }

        params.insert("search[value]".to_string(), self.search.value.clone());
        params.insert("search[regex]".to_string(), self.search.regex.to_string());
        params.insert("start".to_string(), self.start.to_string());
        params.insert("length".to_string(), self.length.to_string());
        params.insert("draw".to_string(), self.draw.clone());

        params
    }

    /// Check the request against the view's field mapping.
    ///
    /// Every order must point at a parsed column, and every column the
    /// pipeline will touch must exist in the mapping. Columns that are
    /// neither searched nor ordered are display-only and never looked up.
    pub fn validate(&self, mapping: &FieldMapping) -> GridResult<()> {
        for (i, order) in self.orders.iter().enumerate() {
            if order.column >= self.columns.len() && mapping.is_keyed() {
                return Err(GridError::invalid_field(
                    format!("order[{}][column]", i),
                    format!("column {} was not declared", order.column),
                ));
            }
            let column = mapping.column_ref(order.column, self)?;
            mapping.spec(column).map_err(|_| {
                GridError::invalid_field(
                    format!("order[{}][column]", i),
                    format!("column {} is not mapped", column),
                )
            })?;
        }

        for (i, column) in self.columns.iter().enumerate() {
            // orders were checked above
            if column.search.is_empty() {
                continue;
            }
            let column_ref = match mapping {
                FieldMapping::Keyed(_) => ColumnRef::Key(column.data.as_str()),
                FieldMapping::Positional(_) => ColumnRef::Index(i),
            };
            if mapping.spec(column_ref).is_err() {
                return Err(GridError::invalid_field(
                    format!("columns[{}][data]", i),
                    format!("column {} is not mapped", column_ref),
                ));
            }
        }

        Ok(())
    }

    /// Number of rows the client asked for, `None` meaning all of them
    pub fn page_length(&self) -> Option<usize> {
        (self.length > 0).then_some(self.length)
    }
}

/// Form-style boolean: empty, `false`, `0`, `off` and `no` are false
fn parse_bool(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty()
        || value.eq_ignore_ascii_case("false")
        || value == "0"
        || value.eq_ignore_ascii_case("off")
        || value.eq_ignore_ascii_case("no"))
}

/// Non-negative integer, zero when it does not parse
fn parse_usize(value: &str) -> usize {
    value.trim().parse().unwrap_or(0)
}
