//! # Order Resolver
//!
//! Turns the request's sort entries into order clauses. Template columns
//! sort by each embedded field in token order, all sharing the column's
//! direction.

use super::errors::GridResult;
use super::handlers::ColumnHandlers;
use super::mapping::FieldMapping;
use super::predicate::OrderClause;
use super::request::GridRequest;

/// Resolve every order entry of `request`, in request order.
///
/// No entries means no explicit ordering; the store default applies.
pub fn resolve_orders(
    request: &GridRequest,
    mapping: &FieldMapping,
    handlers: &ColumnHandlers,
) -> GridResult<Vec<OrderClause>> {
    let mut clauses = Vec::new();

    for order in &request.orders {
        if let Some(custom) = handlers.order(order.column) {
            clauses.extend(custom(order.direction));
            continue;
        }

        let fields = mapping.resolve_column(order.column, request)?;
        clauses.extend(
            fields
                .into_iter()
                .map(|field| OrderClause::new(field, order.direction)),
        );
    }

    Ok(clauses)
}
