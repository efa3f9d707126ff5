/// Database models for HRMS
///
/// Each model owns its SQL. Every company-owned table carries `company_id`,
/// and list operations take the caller's company filter (`None` =
/// unrestricted) so visibility is enforced inside the query.
///
/// # Models
///
/// - `company`, `user`, `user_company`, `refresh_token`, `permission`
/// - `department`, `section`, `designation`, `degree`, `line`, `shift`
/// - `employee`, `address`, `roster`

pub mod address;
pub mod company;
pub mod degree;
pub mod department;
pub mod designation;
pub mod employee;
pub mod line;
pub mod permission;
pub mod refresh_token;
pub mod roster;
pub mod section;
pub mod shift;
pub mod user;
pub mod user_company;

use serde::{Deserialize, Serialize};

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Upper bound for `page_size`
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination parameters as they arrive in a query string
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    /// 1-based page number, never below 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`
    pub fn page_size(&self) -> i64 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn limit(&self) -> i64 {
        self.page_size()
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.page_size())
    }
}

/// One page of results plus the total row count
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: &PageRequest, total: i64) -> Self {
        Self {
            items,
            page: request.page(),
            page_size: request.page_size(),
            total,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
        }
    }

    /// Number of pages needed for `total` rows
    pub fn total_pages(&self) -> i64 {
        if self.total == 0 {
            0
        } else {
            (self.total + self.page_size - 1) / self.page_size
        }
    }
}

/// Trims a search term and drops it when empty
pub fn normalize_search(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let request = PageRequest::default();
        assert_eq!(request.page(), 1);
        assert_eq!(request.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn test_page_request_clamping() {
        assert_eq!(PageRequest::new(0, 0).page(), 1);
        assert_eq!(PageRequest::new(0, 0).page_size(), 1);
        assert_eq!(PageRequest::new(-4, 500).page_size(), MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(3, 25).offset(), 50);
    }

    #[test]
    fn test_page_map_and_total_pages() {
        let page = Page::new(vec![1, 2, 3], &PageRequest::new(1, 3), 7);
        assert_eq!(page.total_pages(), 3);

        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20, 30]);
        assert_eq!(mapped.total, 7);

        let empty: Page<i32> = Page::new(vec![], &PageRequest::default(), 0);
        assert_eq!(empty.total_pages(), 0);
    }

    #[test]
    fn test_normalize_search() {
        assert_eq!(normalize_search(None), None);
        assert_eq!(normalize_search(Some("   ")), None);
        assert_eq!(normalize_search(Some(" dhaka ")), Some("dhaka".to_string()));
    }
}
