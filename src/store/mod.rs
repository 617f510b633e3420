//! # Store Boundary
//!
//! The data store collaborator. A store receives a declarative
//! [`QueryPlan`] and answers counts and windowed fetches; how it evaluates
//! the plan is its own business.

pub mod memory;

use thiserror::Error;

use crate::grid::path::RowAccessor;
use crate::grid::predicate::QueryPlan;

pub use memory::MemoryStore;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store failures. None of these are handled by the grid engine; they
/// surface to the transport as request failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Failed to load data: {0}")]
    Load(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Rows to return from a filtered, ordered result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: usize,
    /// `None` returns every row from `offset` on
    pub limit: Option<usize>,
}

impl PageWindow {
    pub fn all() -> Self {
        Self {
            offset: 0,
            limit: None,
        }
    }

    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }
}

/// Queryable collections
pub trait GridStore: Send + Sync {
    type Row: RowAccessor;

    /// Rows in `collection` matching `plan`; every row when `plan` is `None`
    fn count(&self, collection: &str, plan: Option<&QueryPlan>) -> StoreResult<usize>;

    /// Matching rows in plan order, cut to `window`
    fn fetch(&self, collection: &str, plan: &QueryPlan, window: PageWindow) -> StoreResult<Vec<Self::Row>>;
}
