//! Pagination types for history endpoints.

use serde::{Deserialize, Serialize};

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Request parameters for paginated history queries.
///
/// Defaults to the ten most recent rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Number of rows per page.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageRequest {
    /// Creates a page request for the given page and limit.
    #[must_use]
    pub const fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Returns true when `page >= 1` and `1 <= limit <= MAX_PAGE_LIMIT`.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.page >= 1 && self.limit >= 1 && self.limit <= MAX_PAGE_LIMIT
    }

    /// Calculates the offset for database queries.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Returns the limit for database queries.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.limit)
    }
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
