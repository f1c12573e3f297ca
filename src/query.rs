use crate::backend::{Filter, Order, Select};
use crate::task::{Status, StatusFilter};

pub const CREATED_AT: &str = "created_at";

/// Current list filters. Only the debounced term ever reaches a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub status_filter: StatusFilter,
    pub search_term: String,
    pub debounced_search_term: String,
}

/// The part of the filter state that decides which rows are fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub status: Option<Status>,
    pub title_contains: Option<String>,
}

impl TaskQuery {
    pub fn from_filter(filter: &FilterState) -> Self {
        Self {
            status: filter.status_filter.status(),
            title_contains: Some(filter.debounced_search_term.clone()).filter(|t| !t.is_empty()),
        }
    }

    /// Build the store request: optional status equality, optional
    /// case-insensitive title match, newest first.
    pub fn to_select(&self, table: &str) -> Select {
        let mut filters = Vec::new();
        if let Some(status) = self.status {
            filters.push(Filter::eq("status", status.as_str()));
        }
        if let Some(ref needle) = self.title_contains {
            filters.push(Filter::ilike("title", needle.as_str()));
        }
        Select {
            table: table.to_string(),
            filters,
            order: Some(Order::desc(CREATED_AT)),
        }
    }
}
