//! Item (catalog entry) model and related types.
//!
//! An item is one title with a tracked number of copies. `total` is the number
//! of copies owned, `available` the number currently on the shelf; the
//! difference is the number of active loans.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::ShelfStatus;

/// Full item model (DB + API)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    pub id: i64,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub category: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub location: Option<String>,
    pub cover: Option<String>,
    pub summary: Option<String>,
    pub total: i32,
    pub available: i32,
    pub status: ShelfStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Copies currently out on loan
    pub fn on_loan(&self) -> i32 {
        self.total - self.available
    }

    /// On the shelf with at least one copy to hand out
    pub fn is_lendable(&self) -> bool {
        self.status == ShelfStatus::OnShelf && self.available > 0
    }
}

/// Row to insert when cataloguing a new item
#[derive(Debug, Clone)]
pub struct NewItem {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub location: Option<String>,
    pub cover: Option<String>,
    pub summary: Option<String>,
    pub total: i32,
    pub available: i32,
    pub status: ShelfStatus,
    pub created_at: DateTime<Utc>,
}

/// Create item request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 10, max = 13))]
    pub isbn: String,
    #[validate(length(min = 1, max = 128))]
    pub title: String,
    #[validate(length(min = 1, max = 64))]
    pub author: String,
    #[validate(length(min = 1, max = 64))]
    pub publisher: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub category: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[validate(length(min = 1, max = 32))]
    pub location: Option<String>,
    #[validate(url)]
    pub cover: Option<String>,
    #[validate(length(max = 1000))]
    pub summary: Option<String>,
    #[validate(range(min = 0))]
    pub total: i32,
}

impl CreateItem {
    /// New catalog row: every copy starts on the shelf
    pub fn into_new_item(self, now: DateTime<Utc>) -> NewItem {
        NewItem {
            isbn: self.isbn,
            title: self.title,
            author: self.author,
            publisher: self.publisher,
            category: self.category,
            price: self.price,
            location: self.location,
            cover: self.cover,
            summary: self.summary,
            total: self.total,
            available: self.total,
            status: ShelfStatus::OnShelf,
            created_at: now,
        }
    }
}

/// Update item request. Absent fields are left unchanged; the ISBN is immutable.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateItem {
    #[validate(length(min = 1, max = 128))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub author: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub publisher: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub category: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[validate(length(min = 1, max = 32))]
    pub location: Option<String>,
    #[validate(url)]
    pub cover: Option<String>,
    #[validate(length(max = 1000))]
    pub summary: Option<String>,
    #[validate(range(min = 0))]
    pub total: Option<i32>,
}

/// Shelf status change request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ShelfStatusUpdate {
    pub status: ShelfStatus,
}

/// Stock adjustment request (acquisitions are positive, write-offs negative)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StockAdjustment {
    pub delta: i32,
}

/// Item search parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ItemQuery {
    /// Matches title, author, publisher or ISBN
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub status: Option<ShelfStatus>,
    /// Only items with at least one copy on the shelf
    pub available_only: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ItemQuery {
    /// Lower-cased keyword, if non-blank
    pub fn keyword_pattern(&self) -> Option<String> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase)
    }

    /// In-memory evaluation of the filter, mirroring the SQL conditions
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(keyword) = self.keyword_pattern() {
            let hit = [
                Some(item.title.as_str()),
                Some(item.author.as_str()),
                item.publisher.as_deref(),
                Some(item.isbn.as_str()),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&keyword));
            if !hit {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if item.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if item.status != status {
                return false;
            }
        }
        if self.available_only.unwrap_or(false) && item.available <= 0 {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Item {
        let at = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        Item {
            id: 1,
            isbn: "9780132350884".into(),
            title: "Clean Code".into(),
            author: "Robert C. Martin".into(),
            publisher: Some("Prentice Hall".into()),
            category: Some("Software".into()),
            price: None,
            location: Some("Shelf B2".into()),
            cover: None,
            summary: None,
            total: 3,
            available: 1,
            status: ShelfStatus::OnShelf,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_keyword_matches_any_text_field() {
        let item = sample();
        let by_author = ItemQuery { keyword: Some("martin".into()), ..Default::default() };
        let by_isbn = ItemQuery { keyword: Some("0132350".into()), ..Default::default() };
        let miss = ItemQuery { keyword: Some("tolkien".into()), ..Default::default() };

        assert!(by_author.matches(&item));
        assert!(by_isbn.matches(&item));
        assert!(!miss.matches(&item));
    }

    #[test]
    fn test_available_only_filter() {
        let mut item = sample();
        let query = ItemQuery { available_only: Some(true), ..Default::default() };
        assert!(query.matches(&item));
        item.available = 0;
        assert!(!query.matches(&item));
        assert_eq!(item.on_loan(), 3);
        assert!(!item.is_lendable());
    }

    #[test]
    fn test_create_item_validation() {
        let request = CreateItem {
            isbn: "123".into(),
            title: "Short ISBN".into(),
            author: "Nobody".into(),
            publisher: None,
            category: None,
            price: None,
            location: None,
            cover: None,
            summary: None,
            total: -1,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("isbn"));
        assert!(fields.contains_key("total"));
    }
}
