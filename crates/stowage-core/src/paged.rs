//! Paged query results.

use serde::Serialize;

/// One page of results plus the total count across all pages.
///
/// The total is computed from the full filtered set before skip/take, so
/// it is identical for every page of the same specification.
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    /// The rows of the current page.
    pub results: Vec<T>,
    /// Total matching rows across all pages.
    pub total_count: i64,
    /// 1-based page index.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
}

impl<T> Paged<T> {
    /// Total number of pages.
    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        let total = u64::try_from(self.total_count).unwrap_or(0);
        ((total + u64::from(self.page_size) - 1) / u64::from(self.page_size)) as u32
    }

    /// Whether a page precedes this one.
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Whether a page follows this one.
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}
