//! Pagination types shared by list endpoints

use serde::{Deserialize, Serialize};

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create pagination parameters, clamping the page to >= 1 and the
    /// page size to 1..=100
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Row offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let per_page = self.per_page as i64;
        ((self.total + per_page - 1) / per_page) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_clamping() {
        assert_eq!(ListParams::new(0, 0), ListParams { page: 1, per_page: 1 });
        assert_eq!(ListParams::new(3, 500).per_page, 100);
    }

    #[test]
    fn test_offset_and_limit() {
        let params = ListParams::new(3, 20);
        assert_eq!(params.offset(), 40);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn test_total_pages() {
        let params = ListParams::new(1, 10);
        assert_eq!(PagedResult::<()>::new(vec![], 0, &params).total_pages(), 0);
        assert_eq!(PagedResult::<()>::new(vec![], 10, &params).total_pages(), 1);
        assert_eq!(PagedResult::<()>::new(vec![], 11, &params).total_pages(), 2);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_params_always_in_bounds(page in any::<u32>(), per_page in any::<u32>()) {
            let params = ListParams::new(page, per_page);
            prop_assert!(params.page >= 1);
            prop_assert!((1..=100).contains(&params.per_page));
            prop_assert!(params.offset() >= 0);
        }

        #[test]
        fn prop_pages_cover_total(total in 0i64..100_000, per_page in 1u32..=100) {
            let params = ListParams::new(1, per_page);
            let result = PagedResult::<()>::new(vec![], total, &params);
            let pages = result.total_pages() as i64;

            prop_assert!(pages * per_page as i64 >= total);
            prop_assert!(pages == 0 || (pages - 1) * (per_page as i64) < total);
        }
    }
}
