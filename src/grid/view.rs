//! # Grid View
//!
//! One configured grid: its field mapping, per-column handlers, schema,
//! access policy and options. `handle` runs the whole request pipeline:
//!
//! authorize → load filters → parse/validate → compile → order → execute
//! → project → render

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Local;
use serde_json::Value;
use tracing::info;

use super::access::{AccessMode, AccessPolicy, Actor, Authorizer};
use super::compiler::PlanCompiler;
use super::errors::{GridError, GridResult};
use super::executor::execute;
use super::filters::{FilterOptions, FilterSet, FilterTerm};
use super::handlers::ColumnHandlers;
use super::mapping::FieldMapping;
use super::order::resolve_orders;
use super::path::FieldPath;
use super::predicate::QueryPlan;
use super::projector::project_rows;
use super::render::{export_filename, render_csv, GridResponse, PageResponse};
use super::request::GridRequest;
use super::schema::{Schema, SchemaCapabilities};
use crate::store::GridStore;

/// Param holding the ad-hoc filter blob
pub const DEFAULT_FILTER_KEY: &str = "sFilters";

/// Param whose presence restricts rows to the caller's own
pub const DEFAULT_SCOPE_KEY: &str = "mSearch";

/// Field compared against the caller's id when scoping
pub const DEFAULT_OWNER_FIELD: &str = "user__id";

/// Last-chance adjustment of the compiled filters
pub type PlanHook = Arc<dyn Fn(QueryPlan, &GridRequest) -> QueryPlan + Send + Sync>;

/// Request-level knobs of a view
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub filter_key: String,
    pub scope_key: String,
    pub owner_field: String,
    pub filter_options: FilterOptions,
    /// Replaces the CSV header row
    pub export_headers: Option<Vec<String>>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            filter_key: DEFAULT_FILTER_KEY.to_string(),
            scope_key: DEFAULT_SCOPE_KEY.to_string(),
            owner_field: DEFAULT_OWNER_FIELD.to_string(),
            filter_options: FilterOptions::default(),
            export_headers: None,
        }
    }
}

/// A built, immutable grid view
pub struct GridView {
    resource: String,
    collection: String,
    mapping: FieldMapping,
    handlers: ColumnHandlers,
    schema: Arc<dyn SchemaCapabilities>,
    authorizer: Arc<dyn Authorizer>,
    options: ViewOptions,
    adjust: Option<PlanHook>,
}

impl fmt::Debug for GridView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridView")
            .field("resource", &self.resource)
            .field("collection", &self.collection)
            .field("mapping", &self.mapping)
            .field("handlers", &self.handlers)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl GridView {
    pub fn builder(resource: impl Into<String>, mapping: FieldMapping) -> GridViewBuilder {
        GridViewBuilder::new(resource, mapping)
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    /// Run one grid request against `store`
    pub fn handle<S>(
        &self,
        store: &S,
        params: &HashMap<String, String>,
        actor: Option<&Actor>,
        mode: AccessMode,
    ) -> GridResult<GridResponse>
    where
        S: GridStore + ?Sized,
    {
        if !self.authorizer.authorize(actor, mode) {
            info!(resource = %self.resource, mode = mode.as_str(), "grid access denied");
            return Err(GridError::AccessDenied);
        }

        let mut filters = FilterSet::from_blob(
            &self.options.filter_key,
            params.get(&self.options.filter_key).map(String::as_str),
        )?;

        if params.contains_key(&self.options.scope_key) {
            let actor = actor.ok_or(GridError::AccessDenied)?;
            filters.set(FilterTerm::new(
                self.options.owner_field.clone(),
                Value::Array(vec![actor.id_value()]),
            ));
        }

        let request = GridRequest::parse(params);
        request.validate(&self.mapping)?;

        let compiler = PlanCompiler::new(
            &self.mapping,
            &self.handlers,
            self.schema.as_ref(),
            &self.options.filter_options,
        );
        let mut plan = compiler.compile(&request, &filters)?;
        if let Some(adjust) = &self.adjust {
            plan = adjust(plan, &request);
        }
        let plan = plan.order_by(resolve_orders(&request, &self.mapping, &self.handlers)?);

        let download = mode == AccessMode::Download;
        let page = execute(store, &self.collection, &plan, &request, download)?;
        let rows = project_rows(&page.rows, &self.mapping);

        info!(
            resource = %self.resource,
            mode = mode.as_str(),
            total = page.total_count,
            filtered = page.filtered_count,
            returned = rows.len(),
            "grid request served"
        );

        if download {
            let body = render_csv(&rows, self.options.export_headers.as_deref());
            Ok(GridResponse::Export {
                filename: export_filename(&self.resource, Local::now().naive_local()),
                body,
            })
        } else {
            Ok(GridResponse::Page(PageResponse::new(
                page.total_count,
                page.filtered_count,
                &request.draw,
                rows,
            )))
        }
    }
}

/// Assembles a [`GridView`]; `build` checks the mapping against the schema
pub struct GridViewBuilder {
    resource: String,
    collection: Option<String>,
    mapping: FieldMapping,
    handlers: ColumnHandlers,
    schema: Arc<dyn SchemaCapabilities>,
    authorizer: Arc<dyn Authorizer>,
    options: ViewOptions,
    adjust: Option<PlanHook>,
}

impl GridViewBuilder {
    pub fn new(resource: impl Into<String>, mapping: FieldMapping) -> Self {
        Self {
            resource: resource.into(),
            collection: None,
            mapping,
            handlers: ColumnHandlers::new(),
            schema: Arc::new(Schema::default()),
            authorizer: Arc::new(AccessPolicy::default()),
            options: ViewOptions::default(),
            adjust: None,
        }
    }

    /// Backing collection; defaults to the resource name
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn handlers(mut self, handlers: ColumnHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn schema(mut self, schema: Arc<dyn SchemaCapabilities>) -> Self {
        self.schema = schema;
        self
    }

    pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn options(mut self, options: ViewOptions) -> Self {
        self.options = options;
        self
    }

    pub fn adjust<F>(mut self, hook: F) -> Self
    where
        F: Fn(QueryPlan, &GridRequest) -> QueryPlan + Send + Sync + 'static,
    {
        self.adjust = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> GridResult<GridView> {
        if self.mapping.is_empty() {
            return Err(GridError::Config(format!(
                "view {:?} maps no fields",
                self.resource
            )));
        }
        self.schema.check_mapping(&self.mapping)?;

        if FieldPath::parse(&self.options.owner_field).is_none() {
            return Err(GridError::Config(format!(
                "invalid owner field {:?}",
                self.options.owner_field
            )));
        }

        let collection = self.collection.unwrap_or_else(|| self.resource.clone());
        Ok(GridView {
            resource: self.resource,
            collection,
            mapping: self.mapping,
            handlers: self.handlers,
            schema: self.schema,
            authorizer: self.authorizer,
            options: self.options,
            adjust: self.adjust,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::grid::access::AccessList;
    use crate::grid::predicate::FilterExpr;
    use crate::store::MemoryStore;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn create_test_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(
                "tickets",
                vec![
                    json!({"id": 1, "title": "Printer jam", "open": true, "user": {"id": 7, "name": "Ann"}}),
                    json!({"id": 2, "title": "VPN down", "open": true, "user": {"id": 8, "name": "Ben"}}),
                    json!({"id": 3, "title": "New laptop", "open": false, "user": {"id": 7, "name": "Ann"}}),
                ],
            )
            .unwrap();
        store
    }

    fn create_test_view() -> GridView {
        let mapping = FieldMapping::keyed([("id", "id"), ("title", "title"), ("owner", "{user__name} (#{user__id})")]).unwrap();
        GridView::builder("tickets", mapping)
            .authorizer(Arc::new(AccessPolicy::new(AccessList::Open(true), AccessList::Groups(vec![1]))))
            .build()
            .unwrap()
    }

    fn page(response: GridResponse) -> PageResponse {
        match response {
            GridResponse::Page(page) => page,
            other => panic!("expected page, got {:?}", other),
        }
    }

    #[test]
    fn test_page_request() {
        let view = create_test_view();
        let store = create_test_store();
        let actor = Actor::new("7", vec![]);
        let req = params(&[
            ("sFilters", r#"{"open": true}"#),
            ("columns[0][data]", "id"),
            ("order[0][column]", "0"),
            ("order[0][dir]", "desc"),
            ("draw", "3"),
        ]);

        let page = page(view.handle(&store, &req, Some(&actor), AccessMode::View).unwrap());
        assert_eq!(page.records_total, 3);
        assert_eq!(page.records_filtered, 2);
        assert_eq!(page.draw, 3);
        assert_eq!(page.data[0].get("id"), Some(&json!(2)));
        assert_eq!(page.data[1].get("owner"), Some(&json!("Ann (#7)")));
    }

    #[test]
    fn test_scope_trigger_injects_owner() {
        let view = create_test_view();
        let store = create_test_store();
        let actor = Actor::new("7", vec![]);
        let req = params(&[("sFilters", r#"{"title": ""}"#), ("mSearch", "")]);

        let page = page(view.handle(&store, &req, Some(&actor), AccessMode::View).unwrap());
        assert_eq!(page.records_filtered, 2);
        assert!(page.data.iter().all(|r| r.get("owner") == Some(&json!("Ann (#7)"))));
    }

    #[test]
    fn test_missing_filters() {
        let view = create_test_view();
        let store = create_test_store();
        let actor = Actor::new("7", vec![]);
        assert!(matches!(
            view.handle(&store, &params(&[]), Some(&actor), AccessMode::View),
            Err(GridError::MissingFilters(_))
        ));
    }

    #[test]
    fn test_download_requires_group() {
        let view = create_test_view();
        let store = create_test_store();
        let req = params(&[("sFilters", r#"{"open": false}"#)]);

        let outsider = Actor::new("7", vec![2]);
        assert!(matches!(
            view.handle(&store, &req, Some(&outsider), AccessMode::Download),
            Err(GridError::AccessDenied)
        ));

        let member = Actor::new("8", vec![1]);
        match view.handle(&store, &req, Some(&member), AccessMode::Download).unwrap() {
            GridResponse::Export { filename, body } => {
                assert!(filename.starts_with("tickets_"));
                assert!(filename.ends_with(".csv"));
                assert_eq!(body, "id,title,owner\r\n3,New laptop,Ann (#7)\r\n");
            }
            other => panic!("expected export, got {:?}", other),
        }
    }

    #[test]
    fn test_adjust_hook() {
        let mapping = FieldMapping::positional(["id", "title"]).unwrap();
        let view = GridView::builder("tickets", mapping)
            .adjust(|plan, _| plan.filter(FilterExpr::eq(FieldPath::parse("user__id").unwrap(), json!(8)).into()))
            .build()
            .unwrap();
        let store = create_test_store();
        let actor = Actor::new("1", vec![]);
        let req = params(&[("sFilters", r#"{"open": true}"#)]);

        let page = page(view.handle(&store, &req, Some(&actor), AccessMode::View).unwrap());
        assert_eq!(page.records_filtered, 1);
        assert_eq!(page.data[0].get("1"), Some(&json!("VPN down")));
    }

    #[test]
    fn test_build_rejects_unresolved_paths() {
        let schema: Schema = serde_json::from_value(json!({
            "fields": {"id": {"type": "int"}, "user": {"type": "relation", "fields": {"id": {"type": "int"}}}}
        }))
        .unwrap();
        let mapping = FieldMapping::positional(["id", "title"]).unwrap();
        let result = GridView::builder("tickets", mapping).schema(Arc::new(schema)).build();
        assert!(matches!(result, Err(GridError::Config(_))));
    }
}
