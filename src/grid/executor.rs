//! # Query Executor
//!
//! Applies a compiled plan to the store and cuts out the requested page.
//!
//! Pages are 1-indexed: `page = start / length + 1`, so a `start` that is
//! not a multiple of `length` snaps back to the start of its page. A
//! `length` of zero means every row. Exports ignore paging altogether.

use tracing::debug;

use super::errors::GridResult;
use super::predicate::QueryPlan;
use super::request::GridRequest;
use crate::store::{GridStore, PageWindow};

/// Which page of a result the client gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-indexed page number
    pub page: usize,
    pub window: PageWindow,
}

impl Pagination {
    /// Page containing row `start` when pages are `length` rows long
    pub fn for_request(start: usize, length: Option<usize>) -> Self {
        match length {
            None => Self {
                page: 1,
                window: PageWindow::all(),
            },
            Some(length) => {
                let page_index = start / length;
                Self {
                    page: page_index.saturating_add(1),
                    window: PageWindow::new(page_index * length, length),
                }
            }
        }
    }

    /// Whole result as a single page
    pub fn everything() -> Self {
        Self::for_request(0, None)
    }
}

/// One executed page
#[derive(Debug, Clone)]
pub struct ResultPage<R> {
    pub rows: Vec<R>,
    /// Rows in the collection before any filtering
    pub total_count: usize,
    /// Rows matching the plan, before paging
    pub filtered_count: usize,
    pub pagination: Pagination,
}

/// Count, page and fetch `plan` against `collection`.
///
/// With `download` set, `start`/`length` are ignored and every matching row
/// is returned.
pub fn execute<S>(
    store: &S,
    collection: &str,
    plan: &QueryPlan,
    request: &GridRequest,
    download: bool,
) -> GridResult<ResultPage<S::Row>>
where
    S: GridStore + ?Sized,
{
    let total_count = store.count(collection, None)?;
    let filtered_count = if plan.is_unfiltered() {
        total_count
    } else {
        store.count(collection, Some(plan))?
    };

    let pagination = if download {
        Pagination::everything()
    } else {
        Pagination::for_request(request.start, request.page_length())
    };

    let rows = store.fetch(collection, plan, pagination.window)?;

    debug!(
        collection,
        total_count,
        filtered_count,
        page = pagination.page,
        returned = rows.len(),
        "executed grid query"
    );

    Ok(ResultPage {
        rows,
        total_count,
        filtered_count,
        pagination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::grid::path::FieldPath;
    use crate::grid::predicate::FilterExpr;
    use crate::store::MemoryStore;

    fn numbered_store(n: i64) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert("items", (0..n).map(|i| json!({"id": i, "even": i % 2 == 0})))
            .unwrap();
        store
    }

    #[test]
    fn test_page_number_from_start() {
        let p = Pagination::for_request(20, Some(10));
        assert_eq!(p.page, 3);
        assert_eq!(p.window, PageWindow::new(20, 10));

        let snapped = Pagination::for_request(25, Some(10));
        assert_eq!(snapped.page, 3);
        assert_eq!(snapped.window.offset, 20);
    }

    #[test]
    fn test_huge_start_does_not_overflow() {
        let p = Pagination::for_request(usize::MAX, Some(1));
        assert_eq!(p.page, usize::MAX);
        assert_eq!(p.window, PageWindow::new(usize::MAX, 1));

        let p = Pagination::for_request(usize::MAX, Some(10));
        assert_eq!(p.window.offset, usize::MAX - usize::MAX % 10);
    }

    #[test]
    fn test_huge_start_yields_empty_page() {
        let store = numbered_store(5);
        let request = GridRequest::parse(&[
            ("start".to_string(), usize::MAX.to_string()),
            ("length".to_string(), "1".to_string()),
        ]
        .into_iter()
        .collect());

        let page = execute(&store, "items", &QueryPlan::new(), &request, false).unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.filtered_count, 5);
    }

    #[test]
    fn test_zero_length_means_all_rows() {
        let p = Pagination::for_request(40, None);
        assert_eq!(p.page, 1);
        assert_eq!(p.window, PageWindow::all());
    }

    #[test]
    fn test_execute_counts_and_window() {
        let store = numbered_store(70);
        let request = GridRequest {
            start: 20,
            length: 10,
            ..Default::default()
        };
        let plan = QueryPlan::new().filter(FilterExpr::gt(FieldPath::parse("even").unwrap(), json!(0)).into());

        let page = execute(&store, "items", &plan, &request, false).unwrap();
        assert_eq!(page.total_count, 70);
        assert_eq!(page.filtered_count, 35);
        assert_eq!(page.pagination.page, 3);
        assert_eq!(page.rows.len(), 10);
    }

    #[test]
    fn test_download_ignores_paging() {
        let store = numbered_store(70);
        let request = GridRequest {
            start: 20,
            length: 10,
            ..Default::default()
        };
        let plan = QueryPlan::new().filter(FilterExpr::eq(FieldPath::parse("even").unwrap(), json!(0)).into());

        let page = execute(&store, "items", &plan, &request, true).unwrap();
        assert_eq!(page.filtered_count, 35);
        assert_eq!(page.rows.len(), page.filtered_count);
    }
}
