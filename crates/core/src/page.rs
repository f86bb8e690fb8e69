//! Offset-based pagination shared by every list endpoint.

use serde::{Deserialize, Serialize};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

/// Sort direction for list queries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Page/limit query parameters, normalized on construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl PageQuery {
    /// 1-based page number, never 0.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(DEFAULT_PAGE).max(1)
    }

    /// Rows per page, clamped to [1, 100].
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Rows to skip for the current page.
    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.limit()
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: None, limit: None }
    }
}

/// Pagination envelope returned next to every list payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(query: &PageQuery, total: u64) -> Self {
        let limit = query.limit();
        Self {
            page: query.page(),
            limit,
            total,
            total_pages: total.div_ceil(u64::from(limit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_and_limit_are_normalized() {
        let q = PageQuery { page: Some(0), limit: Some(0) };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 1);

        let q = PageQuery { page: None, limit: Some(10_000) };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 100);
    }

    #[test]
    fn offset_skips_previous_pages() {
        let q = PageQuery { page: Some(3), limit: Some(25) };
        assert_eq!(q.offset(), 50);
    }

    #[test]
    fn total_pages_rounds_up() {
        let q = PageQuery { page: Some(1), limit: Some(10) };
        assert_eq!(Pagination::new(&q, 0).total_pages, 0);
        assert_eq!(Pagination::new(&q, 10).total_pages, 1);
        assert_eq!(Pagination::new(&q, 11).total_pages, 2);
    }
}
