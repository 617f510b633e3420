//! # Column Handlers
//!
//! Per-column escape hatches for behaviour the generic compiler cannot
//! express. Handlers are registered by column index when the view is built.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::predicate::{OrderClause, QueryPlan};
use super::request::SortDirection;

/// Receives the raw column search string and the plan so far
pub type SearchFn = Arc<dyn Fn(&str, QueryPlan) -> QueryPlan + Send + Sync>;

/// Receives the requested direction and returns the sort keys to use
pub type OrderFn = Arc<dyn Fn(SortDirection) -> Vec<OrderClause> + Send + Sync>;

#[derive(Clone, Default)]
pub enum SearchHandler {
    #[default]
    Default,
    Custom(SearchFn),
}

#[derive(Clone, Default)]
pub enum OrderHandler {
    #[default]
    Default,
    Custom(OrderFn),
}

/// Search and order behaviour of one column
#[derive(Clone, Default)]
pub struct ColumnHandler {
    pub search: SearchHandler,
    pub order: OrderHandler,
}

impl fmt::Debug for ColumnHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = |custom: bool| if custom { "custom" } else { "default" };
        f.debug_struct("ColumnHandler")
            .field("search", &kind(matches!(self.search, SearchHandler::Custom(_))))
            .field("order", &kind(matches!(self.order, OrderHandler::Custom(_))))
            .finish()
    }
}

/// Column index → handler
#[derive(Clone, Debug, Default)]
pub struct ColumnHandlers {
    by_column: HashMap<usize, ColumnHandler>,
}

impl ColumnHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom search for `column`
    pub fn with_search<F>(mut self, column: usize, handler: F) -> Self
    where
        F: Fn(&str, QueryPlan) -> QueryPlan + Send + Sync + 'static,
    {
        self.by_column.entry(column).or_default().search = SearchHandler::Custom(Arc::new(handler));
        self
    }

    /// Register a custom ordering for `column`
    pub fn with_order<F>(mut self, column: usize, handler: F) -> Self
    where
        F: Fn(SortDirection) -> Vec<OrderClause> + Send + Sync + 'static,
    {
        self.by_column.entry(column).or_default().order = OrderHandler::Custom(Arc::new(handler));
        self
    }

    pub fn search(&self, column: usize) -> Option<&SearchFn> {
        match self.by_column.get(&column).map(|h| &h.search) {
            Some(SearchHandler::Custom(f)) => Some(f),
            _ => None,
        }
    }

    pub fn order(&self, column: usize) -> Option<&OrderFn> {
        match self.by_column.get(&column).map(|h| &h.order) {
            Some(OrderHandler::Custom(f)) => Some(f),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_column.is_empty()
    }
}
