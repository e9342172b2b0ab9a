//! Data models for Libris

pub mod enums;
pub mod item;
pub mod loan;
pub mod patron;

// Re-export commonly used types
pub use enums::{LoanStatus, PatronRole, PatronStatus, ShelfStatus};
pub use item::{CreateItem, Item, ItemQuery, UpdateItem};
pub use loan::{AdminLoanUpdate, Loan, LoanPolicy, LoanQuery};
pub use patron::{Patron, UserClaims};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    /// Page defaults to 1, per_page to 20 and is clamped to 1..=100
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    /// Rows to skip. Saturates instead of overflowing on absurd page numbers.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_clamping() {
        assert_eq!(Page::new(None, None), Page { page: 1, per_page: 20 });
        assert_eq!(Page::new(Some(0), Some(500)), Page { page: 1, per_page: 100 });
        let third = Page::new(Some(3), Some(10));
        assert_eq!(third.offset(), 20);
        assert_eq!(third.limit(), 10);
    }

    #[test]
    fn test_huge_page_saturates() {
        let page = Page::new(Some(i64::MAX), Some(100));
        assert_eq!(page.offset(), i64::MAX);
        assert_eq!(Page::new(Some(i64::MIN), None).offset(), 0);
    }
}
