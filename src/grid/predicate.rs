//! # Predicate AST
//!
//! Declarative filter and sort specification handed to the store. The grid
//! engine only builds these trees; evaluating them is the store's job.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::path::FieldPath;
use super::request::SortDirection;

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilterOperator {
    /// Equals
    #[serde(rename = "eq")]
    Eq,

    /// Greater than
    #[serde(rename = "gt")]
    Gt,

    /// Greater than or equal
    #[serde(rename = "gte")]
    Gte,

    /// Less than
    #[serde(rename = "lt")]
    Lt,

    /// Case-insensitive substring
    #[serde(rename = "icontains")]
    IContains,

    /// Case-insensitive regex
    #[serde(rename = "iregex")]
    IRegex,
}

impl FilterOperator {
    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::IContains => "icontains",
            FilterOperator::IRegex => "iregex",
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            FilterOperator::Eq => " = ",
            FilterOperator::Gt => " > ",
            FilterOperator::Gte => " >= ",
            FilterOperator::Lt => " < ",
            FilterOperator::IContains => "~",
            FilterOperator::IRegex => "~*",
        }
    }
}

/// A single field comparison
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    /// Field to filter on
    pub field: FieldPath,

    /// Comparison operator
    pub operator: FilterOperator,

    /// Value to compare against
    pub value: Value,
}

impl FilterExpr {
    /// Create a new filter expression
    pub fn new(field: FieldPath, operator: FilterOperator, value: Value) -> Self {
        Self {
            field,
            operator,
            value,
        }
    }

    pub fn eq(field: FieldPath, value: Value) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    pub fn gt(field: FieldPath, value: Value) -> Self {
        Self::new(field, FilterOperator::Gt, value)
    }

    pub fn gte(field: FieldPath, value: Value) -> Self {
        Self::new(field, FilterOperator::Gte, value)
    }

    pub fn lt(field: FieldPath, value: Value) -> Self {
        Self::new(field, FilterOperator::Lt, value)
    }

    pub fn icontains(field: FieldPath, term: &str) -> Self {
        Self::new(field, FilterOperator::IContains, Value::String(term.to_string()))
    }

    pub fn iregex(field: FieldPath, pattern: &str) -> Self {
        Self::new(field, FilterOperator::IRegex, Value::String(pattern.to_string()))
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.field, self.operator.symbol())?;
        match &self.value {
            Value::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other),
        }
    }
}

/// Boolean expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Clause(FilterExpr),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// AND the given predicates; a single one is returned unwrapped.
    /// `None` for an empty list.
    pub fn all(mut predicates: Vec<Predicate>) -> Option<Predicate> {
        match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => Some(Predicate::And(predicates)),
        }
    }

    /// OR the given predicates; a single one is returned unwrapped.
    /// `None` for an empty list.
    pub fn any(mut predicates: Vec<Predicate>) -> Option<Predicate> {
        match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => Some(Predicate::Or(predicates)),
        }
    }

    /// Visit every clause in the tree
    pub fn clauses(&self) -> Vec<&FilterExpr> {
        let mut out = Vec::new();
        self.collect_clauses(&mut out);
        out
    }

    fn collect_clauses<'a>(&'a self, out: &mut Vec<&'a FilterExpr>) {
        match self {
            Predicate::Clause(expr) => out.push(expr),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_clauses(out);
                }
            }
        }
    }
}

impl From<FilterExpr> for Predicate {
    fn from(expr: FilterExpr) -> Self {
        Predicate::Clause(expr)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Clause(expr) => write!(f, "{}", expr),
            Predicate::And(children) => write_joined(f, children, " AND ", |p| matches!(p, Predicate::Or(_))),
            Predicate::Or(children) => write_joined(f, children, " OR ", |p| matches!(p, Predicate::And(_))),
        }
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    children: &[Predicate],
    separator: &str,
    needs_parens: impl Fn(&Predicate) -> bool,
) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        if needs_parens(child) {
            write!(f, "({})", child)?;
        } else {
            write!(f, "{}", child)?;
        }
    }
    Ok(())
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub field: FieldPath,
    pub direction: SortDirection,
}

impl OrderClause {
    pub fn new(field: FieldPath, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Parse the `-field` / `field` shorthand
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.strip_prefix('-') {
            Some(rest) => FieldPath::parse(rest).map(|f| Self::new(f, SortDirection::Desc)),
            None => FieldPath::parse(raw).map(|f| Self::new(f, SortDirection::Asc)),
        }
    }
}

impl fmt::Display for OrderClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Asc => write!(f, "{}", self.field),
            SortDirection::Desc => write!(f, "-{}", self.field),
        }
    }
}

/// Everything the store needs to answer one grid request.
///
/// Filter stages are chained: a row must satisfy every stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    stages: Vec<Predicate>,
    order: Vec<OrderClause>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain another filter stage
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.stages.push(predicate);
        self
    }

    /// Chain a stage if there is one
    pub fn filter_opt(self, predicate: Option<Predicate>) -> Self {
        match predicate {
            Some(p) => self.filter(p),
            None => self,
        }
    }

    /// Replace the ordering
    pub fn order_by(mut self, order: Vec<OrderClause>) -> Self {
        self.order = order;
        self
    }

    pub fn stages(&self) -> &[Predicate] {
        &self.stages
    }

    pub fn order(&self) -> &[OrderClause] {
        &self.order
    }

    /// All stages as one predicate; `None` when the plan filters nothing
    pub fn predicate(&self) -> Option<Predicate> {
        let mut flat = Vec::new();
        for stage in &self.stages {
            match stage {
                Predicate::And(children) => flat.extend(children.iter().cloned()),
                other => flat.push(other.clone()),
            }
        }
        Predicate::all(flat)
    }

    pub fn is_unfiltered(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.predicate() {
            Some(p) => write!(f, "WHERE {}", p)?,
            None => f.write_str("WHERE TRUE")?,
        }
        if !self.order.is_empty() {
            let keys: Vec<String> = self.order.iter().map(ToString::to_string).collect();
            write!(f, " ORDER BY {}", keys.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    #[test]
    fn test_display_range() {
        let plan = QueryPlan::new()
            .filter(FilterExpr::gte(path("age"), json!(18)).into())
            .filter(FilterExpr::lt(path("age"), json!(65)).into());
        assert_eq!(plan.predicate().unwrap().to_string(), "age >= 18 AND age < 65");
    }

    #[test]
    fn test_display_nested_groups() {
        let term = |t: &str| {
            Predicate::Or(vec![
                FilterExpr::icontains(path("name"), t).into(),
                FilterExpr::icontains(path("email"), t).into(),
            ])
        };
        let predicate = Predicate::And(vec![term("foo"), term("bar")]);
        assert_eq!(
            predicate.to_string(),
            "(name~foo OR email~foo) AND (name~bar OR email~bar)"
        );
    }

    #[test]
    fn test_all_and_any_unwrap_single() {
        let clause: Predicate = FilterExpr::eq(path("a"), json!(1)).into();
        assert_eq!(Predicate::all(vec![clause.clone()]), Some(clause.clone()));
        assert_eq!(Predicate::any(vec![clause.clone()]), Some(clause));
        assert_eq!(Predicate::any(vec![]), None);
    }

    #[test]
    fn test_order_clause_shorthand() {
        let desc = OrderClause::parse("-created__at").unwrap();
        assert_eq!(desc.direction, SortDirection::Desc);
        assert_eq!(desc.to_string(), "-created.at");
        assert_eq!(OrderClause::parse("name").unwrap().direction, SortDirection::Asc);
        assert!(OrderClause::parse("-").is_none());
    }

    #[test]
    fn test_plan_display() {
        let plan = QueryPlan::new()
            .filter(FilterExpr::eq(path("status"), json!("open")).into())
            .order_by(vec![OrderClause::parse("-age").unwrap()]);
        assert_eq!(plan.to_string(), "WHERE status = open ORDER BY -age");
        assert_eq!(QueryPlan::new().to_string(), "WHERE TRUE");
    }
}
