//! Query-filter composition.
//!
//! [`QueryOptions`] bundles the optional transformations a read accepts:
//! a condition, ordering, eager-load joins, the global-filter bypass and
//! the tracking mode. [`compose`] applies them to a base query in a fixed
//! order:
//!
//! 1. tracking mode — must be set before materialization;
//! 2. global soft-delete filter, unless bypassed — injected before the
//!    caller's condition so a bypass is not moot;
//! 3. the condition;
//! 4. ordering — after filtering, before paging;
//! 5. eager-load joins.

use stowage_db::{
    expr::Col, query::SelectQuery, Filter, OrderBy, Predicate, SortDirection,
};

use crate::entity::Entity;

/// Per-call query configuration with named fields and documented
/// defaults: no condition, no ordering, no joins, global filters applied,
/// tracking on.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub(crate) filter: Option<Filter>,
    pub(crate) order: Vec<OrderBy>,
    pub(crate) joins: Vec<String>,
    pub(crate) ignore_filters: bool,
    pub(crate) untracked: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrows the query by a predicate. Repeated calls combine with
    /// `AND`.
    pub fn filter(mut self, predicate: impl Predicate) -> Self {
        let rendered = Filter::new(predicate);
        self.filter = Some(match self.filter {
            Some(existing) => existing.and_with(rendered),
            None => rendered,
        });
        self
    }

    /// Orders the results. Repeated calls append further sort keys.
    pub fn order_by<T>(mut self, col: Col<T>, direction: SortDirection) -> Self {
        self.order.push(OrderBy::new(col, direction));
        self
    }

    /// Attaches an eager-load join, e.g.
    /// `"JOIN companies ON employees.company_id = companies.id"`.
    pub fn join(mut self, join: impl Into<String>) -> Self {
        self.joins.push(join.into());
        self
    }

    /// Bypasses the global soft-delete filter for this call.
    pub fn ignore_filters(mut self) -> Self {
        self.ignore_filters = true;
        self
    }

    /// Returns detached results that are not registered with the change
    /// tracker.
    pub fn untracked(mut self) -> Self {
        self.untracked = true;
        self
    }

    pub(crate) fn is_tracked(&self) -> bool {
        !self.untracked
    }
}

/// Applies a filter specification to a base query in the fixed order
/// described at module level. Purely declarative; nothing executes here.
pub(crate) fn compose<E: Entity>(
    mut query: SelectQuery<E>,
    options: &QueryOptions,
) -> SelectQuery<E> {
    if options.untracked {
        query = query.tracking(false);
    }

    if !options.ignore_filters {
        if let Some(column) = E::DELETED_COLUMN {
            query = query.filter(Col::<String>::new(column).is_null());
        }
    }

    if let Some(filter) = &options.filter {
        query = query.with_filter(filter.clone());
    }

    for order in &options.order {
        query = query.with_order(order.clone());
    }

    for join in &options.joins {
        query = query.join(join.clone());
    }

    query
}

#[cfg(test)]
mod tests {
    use stowage_db::Predicate as _;

    use super::*;

    #[test]
    fn defaults_track_and_apply_filters() {
        let options = QueryOptions::new();
        assert!(options.is_tracked());
        assert!(!options.ignore_filters);
        assert!(options.filter.is_none());
        assert!(options.order.is_empty());
        assert!(options.joins.is_empty());
    }

    #[test]
    fn repeated_filters_combine_with_and() {
        let options = QueryOptions::new()
            .filter(Col::<String>::new("name").eq("John".to_string()))
            .filter(Col::<i64>::new("age").gt(21));
        let filter = options.filter.unwrap();
        assert_eq!(filter.sql(), "(name = ? AND age > ?)");
        assert_eq!(filter.params().len(), 2);
    }
}
