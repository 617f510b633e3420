//! # Grid Engine
//!
//! Server-side processing for tabular grid widgets. A [`GridView`] turns a
//! flat parameter map into a declarative [`QueryPlan`], runs it against a
//! [`GridStore`](crate::store::GridStore) and renders a JSON page or a CSV
//! export.
//!
//! Request flow:
//! 1. [`request`]: flat params → [`GridRequest`]
//! 2. [`mapping`] + [`compiler`] + [`order`]: request → [`QueryPlan`]
//! 3. [`executor`]: plan → counted, windowed [`ResultPage`]
//! 4. [`projector`] + [`render`]: rows → response

pub mod access;
pub mod coerce;
pub mod compiler;
pub mod errors;
pub mod executor;
pub mod filters;
pub mod handlers;
pub mod mapping;
pub mod order;
pub mod path;
pub mod predicate;
pub mod projector;
pub mod render;
pub mod request;
pub mod schema;
pub mod view;

pub use access::{AccessList, AccessMode, AccessPolicy, Actor, Authorizer};
pub use errors::{ErrorResponse, GridError, GridResult};
pub use executor::{Pagination, ResultPage};
pub use filters::{FilterOptions, FilterSet, FilterTerm};
pub use handlers::{ColumnHandler, ColumnHandlers, OrderHandler, SearchHandler};
pub use mapping::{FieldMapping, FieldSpec, Template};
pub use path::{Attribute, FieldPath, RowAccessor};
pub use predicate::{FilterExpr, FilterOperator, OrderClause, Predicate, QueryPlan};
pub use projector::ProjectedRow;
pub use render::{GridResponse, PageResponse};
pub use request::{ColumnSpec, GridRequest, OrderSpec, SearchSpec, SortDirection};
pub use schema::{FieldType, RegexSupport, Schema, SchemaCapabilities};
pub use view::{GridView, GridViewBuilder, ViewOptions};
