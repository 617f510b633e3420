//! # Predicate Compiler
//!
//! Builds the [`QueryPlan`] for one request from three independent sources,
//! chained in this order:
//!
//! 1. ad-hoc filter terms
//! 2. the global search box, over every mapped field
//! 3. per-column search boxes, over that column's fields or a custom handler

use tracing::debug;

use super::errors::GridResult;
use super::filters::{FilterOptions, FilterSet};
use super::handlers::ColumnHandlers;
use super::mapping::FieldMapping;
use super::path::FieldPath;
use super::predicate::{FilterExpr, Predicate, QueryPlan};
use super::request::{GridRequest, SearchSpec};
use super::schema::SchemaCapabilities;

/// Search predicate over `fields`.
///
/// Regex mode ORs one case-insensitive regex clause per regex-capable field.
/// Plain mode splits on whitespace and requires every term to appear, case
/// insensitively, in at least one field. Empty searches and searches with no
/// eligible field produce nothing.
pub fn search_predicate(
    search: &SearchSpec,
    fields: &[FieldPath],
    schema: &dyn SchemaCapabilities,
) -> Option<Predicate> {
    if search.is_empty() || fields.is_empty() {
        return None;
    }

    if search.regex {
        let clauses = fields
            .iter()
            .filter(|field| schema.supports_regex(field))
            .map(|field| FilterExpr::iregex(field.clone(), &search.value).into())
            .collect();
        return Predicate::any(clauses);
    }

    let per_term = search
        .value
        .split_whitespace()
        .filter_map(|term| {
            let clauses = fields
                .iter()
                .map(|field| FilterExpr::icontains(field.clone(), term).into())
                .collect();
            Predicate::any(clauses)
        })
        .collect();
    Predicate::all(per_term)
}

/// Compiles filter and search predicates for one view
pub struct PlanCompiler<'a> {
    mapping: &'a FieldMapping,
    handlers: &'a ColumnHandlers,
    schema: &'a dyn SchemaCapabilities,
    filter_options: &'a FilterOptions,
}

impl<'a> PlanCompiler<'a> {
    pub fn new(
        mapping: &'a FieldMapping,
        handlers: &'a ColumnHandlers,
        schema: &'a dyn SchemaCapabilities,
        filter_options: &'a FilterOptions,
    ) -> Self {
        Self {
            mapping,
            handlers,
            schema,
            filter_options,
        }
    }

    /// Ad-hoc terms, then global search, then column search
    pub fn compile(&self, request: &GridRequest, filters: &FilterSet) -> GridResult<QueryPlan> {
        let mut plan = QueryPlan::new();
        for stage in filters.compile(self.filter_options) {
            plan = plan.filter(stage);
        }

        plan = plan.filter_opt(self.global_search(request));
        plan = self.column_search(request, plan)?;

        debug!(stages = plan.stages().len(), plan = %plan, "compiled grid filters");
        Ok(plan)
    }

    /// Global search box over every mapped field
    pub fn global_search(&self, request: &GridRequest) -> Option<Predicate> {
        search_predicate(&request.search, &self.mapping.all_paths(), self.schema)
    }

    /// Per-column search boxes, in column order
    pub fn column_search(&self, request: &GridRequest, mut plan: QueryPlan) -> GridResult<QueryPlan> {
        for (index, column) in request.columns.iter().enumerate() {
            if column.search.is_empty() {
                continue;
            }

            if let Some(custom) = self.handlers.search(index) {
                plan = custom(&column.search.value, plan);
                continue;
            }

            let fields = self.mapping.resolve_column(index, request)?;
            plan = plan.filter_opt(search_predicate(&column.search, &fields, self.schema));
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::grid::schema::{FieldType, RegexSupport, Schema};

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    fn plain(value: &str) -> SearchSpec {
        SearchSpec { value: value.to_string(), regex: false }
    }

    fn regex(value: &str) -> SearchSpec {
        SearchSpec { value: value.to_string(), regex: true }
    }

    fn request(pairs: &[(&str, &str)]) -> GridRequest {
        let params: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GridRequest::parse(&params)
    }

    fn typed_schema() -> Schema {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), FieldType::String);
        fields.insert("email".to_string(), FieldType::String);
        fields.insert("age".to_string(), FieldType::Int);
        Schema::new(fields).with_regex_support(RegexSupport::TextOnly)
    }

    #[test]
    fn test_plain_search_every_term_somewhere() {
        let fields = [path("name"), path("email")];
        let predicate = search_predicate(&plain("foo  bar"), &fields, &Schema::default()).unwrap();
        assert_eq!(
            predicate.to_string(),
            "(name~foo OR email~foo) AND (name~bar OR email~bar)"
        );
    }

    #[test]
    fn test_regex_search_skips_ineligible_fields() {
        let schema = typed_schema();
        let fields = [path("name"), path("age")];
        let predicate = search_predicate(&regex("^ja"), &fields, &schema).unwrap();
        assert_eq!(predicate.to_string(), "name~*^ja");

        assert!(search_predicate(&regex("^1"), &[path("age")], &schema).is_none());
    }

    #[test]
    fn test_empty_search_is_pass_through() {
        let fields = [path("name")];
        assert!(search_predicate(&plain(""), &fields, &Schema::default()).is_none());
        assert!(search_predicate(&plain("   "), &fields, &Schema::default()).is_none());
        assert!(search_predicate(&plain("x"), &[], &Schema::default()).is_none());
    }

    #[test]
    fn test_compile_chains_sources_in_order() {
        let mapping = FieldMapping::keyed([("name", "{first} {last}"), ("email", "email")]).unwrap();
        let handlers = ColumnHandlers::new();
        let schema = Schema::default();
        let options = FilterOptions::default();
        let compiler = PlanCompiler::new(&mapping, &handlers, &schema, &options);

        let req = request(&[
            ("columns[0][data]", "name"),
            ("columns[1][data]", "email"),
            ("columns[1][search][value]", "example.com"),
            ("search[value]", "jo"),
        ]);
        let filters = FilterSet::from_blob("sFilters", Some(r#"{"active": true}"#)).unwrap();

        let plan = compiler.compile(&req, &filters).unwrap();
        let stages: Vec<String> = plan.stages().iter().map(ToString::to_string).collect();
        assert_eq!(
            stages,
            vec![
                "active > 0",
                "first~jo OR last~jo OR email~jo",
                "email~example.com",
            ]
        );
    }

    #[test]
    fn test_custom_column_search_replaces_default() {
        let mapping = FieldMapping::positional(["name", "code"]).unwrap();
        let handlers = ColumnHandlers::new().with_search(1, |value, plan| {
            plan.filter(FilterExpr::eq(FieldPath::parse("code").unwrap(), value.to_uppercase().into()).into())
        });
        let schema = Schema::default();
        let options = FilterOptions::default();
        let compiler = PlanCompiler::new(&mapping, &handlers, &schema, &options);

        let req = request(&[
            ("columns[0][data]", "0"),
            ("columns[0][search][value]", "ann"),
            ("columns[1][data]", "1"),
            ("columns[1][search][value]", "ab12"),
        ]);
        let plan = compiler.column_search(&req, QueryPlan::new()).unwrap();
        let stages: Vec<String> = plan.stages().iter().map(ToString::to_string).collect();
        assert_eq!(stages, vec!["name~ann", "code = AB12"]);
    }
}
