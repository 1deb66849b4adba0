//! Pagination types for the audit listing endpoints.

use serde::{Deserialize, Serialize};

/// `limit`/`skip` query parameters with clamped accessors.
#[derive(Debug, Deserialize, Default, Clone, Copy)]
pub struct PaginationQuery {
    /// Maximum number of items to return (default: 50, max: 100)
    #[serde(default)]
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    #[serde(default)]
    pub skip: Option<i64>,
}

impl PaginationQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 100)
    }

    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }
}

/// Paginated response wrapper.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    pub limit: i64,
    pub skip: i64,
    /// True when more items exist past this page
    pub has_more: bool,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, limit: i64, skip: i64) -> Self {
        let has_more = skip + (items.len() as i64) < total;
        Self {
            items,
            total,
            limit,
            skip,
            has_more,
        }
    }
}
