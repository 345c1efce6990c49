//! List queries and result pages.

use serde::{Deserialize, Serialize};

/// Filter and window for a list call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive search term.
    pub search: Option<String>,
    /// Rows to skip.
    pub offset: u64,
    /// Maximum rows to return; `None` returns everything.
    pub limit: Option<u64>,
}

impl ListQuery {
    /// Unfiltered, unbounded query.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Sets the search term.
    #[must_use]
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = crate::search::normalize_term(&term.into());
        self
    }

    /// Restricts to a window.
    #[must_use]
    pub fn with_window(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// Applies the window to an already filtered and ordered sequence.
    pub fn window<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let skipped = items
            .into_iter()
            .skip(usize::try_from(self.offset).unwrap_or(usize::MAX));
        match self.limit {
            Some(limit) => skipped
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => skipped.collect(),
        }
    }
}

/// One window of results with the unwindowed total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in this window.
    pub items: Vec<T>,
    /// Matching rows before windowing.
    pub total: u64,
}

impl<T> Page<T> {
    /// Creates a page.
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }

    /// Maps every item.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window() {
        let q = ListQuery::all().with_window(2, 2);
        assert_eq!(q.window(1..=5), vec![3, 4]);
        assert_eq!(ListQuery::all().window(1..=3), vec![1, 2, 3]);
        assert!(ListQuery::all().with_window(10, 5).window(1..=3).is_empty());
    }

    #[test]
    fn test_blank_search_is_dropped() {
        assert_eq!(ListQuery::all().with_search("   ").search, None);
        assert_eq!(
            ListQuery::all().with_search(" gibson ").search.as_deref(),
            Some("gibson")
        );
    }

    #[test]
    fn test_page_map() {
        let page = Page::new(vec![1, 2], 7).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total, 7);
    }
}
