//! Catalog management service

use std::sync::Arc;

use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        item::{CreateItem, Item, ItemQuery, UpdateItem},
        ShelfStatus,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Search items with filters
    pub async fn list_items(&self, query: &ItemQuery) -> AppResult<(Vec<Item>, i64)> {
        self.repository.list_items(query).await
    }

    /// Get item by ID
    pub async fn get_item(&self, id: i64) -> AppResult<Item> {
        self.repository
            .get_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    /// Catalog a new item with every copy on the shelf
    pub async fn create_item(&self, request: CreateItem) -> AppResult<Item> {
        request.validate()?;
        check_price(request.price)?;

        let mut tx = self.repository.begin().await?;
        if tx.find_item_by_isbn(&request.isbn).await?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "Item with ISBN {} already exists",
                request.isbn
            )));
        }

        let item = tx.insert_item(&request.into_new_item(self.clock.now())).await?;
        tx.commit().await?;

        tracing::info!(item_id = item.id, isbn = %item.isbn, total = item.total, "Item catalogued");
        Ok(item)
    }

    /// Update descriptive fields and, optionally, the number of copies owned.
    ///
    /// A new `total` moves `available` by the same amount, so copies on loan
    /// stay accounted for. Shrinking below the number on loan is refused.
    pub async fn update_item(&self, id: i64, update: UpdateItem) -> AppResult<Item> {
        update.validate()?;
        check_price(update.price)?;

        let mut tx = self.repository.begin().await?;
        let mut item = tx
            .lock_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;

        if let Some(total) = update.total {
            let available = item.available + (total - item.total);
            if available < 0 {
                return Err(AppError::InvalidState(format!(
                    "Item {} has {} copies on loan, total cannot drop to {}",
                    id,
                    item.on_loan(),
                    total
                )));
            }
            item.total = total;
            item.available = available;
        }

        if let Some(title) = update.title {
            item.title = title;
        }
        if let Some(author) = update.author {
            item.author = author;
        }
        if update.publisher.is_some() {
            item.publisher = update.publisher;
        }
        if update.category.is_some() {
            item.category = update.category;
        }
        if update.price.is_some() {
            item.price = update.price;
        }
        if update.location.is_some() {
            item.location = update.location;
        }
        if update.cover.is_some() {
            item.cover = update.cover;
        }
        if update.summary.is_some() {
            item.summary = update.summary;
        }
        item.updated_at = self.clock.now();

        tx.save_item(&item).await?;
        tx.commit().await?;
        Ok(item)
    }

    /// Withdraw an item from the catalog. Refused while any copy is on loan.
    pub async fn delete_item(&self, id: i64) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        let item = tx
            .lock_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;

        if item.available != item.total {
            return Err(AppError::InvalidState(format!(
                "Item {} has {} copies on loan",
                id,
                item.on_loan()
            )));
        }

        tx.delete_item(id, self.clock.now()).await?;
        tx.commit().await?;

        tracing::info!(item_id = id, "Item deleted");
        Ok(())
    }

    /// Put an item on or take it off the shelf. Loans already out are unaffected.
    pub async fn set_shelf_status(&self, id: i64, status: ShelfStatus) -> AppResult<Item> {
        let mut tx = self.repository.begin().await?;
        let mut item = tx
            .lock_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;

        item.status = status;
        item.updated_at = self.clock.now();

        tx.save_item(&item).await?;
        tx.commit().await?;
        Ok(item)
    }

    /// Acquire (`delta > 0`) or write off (`delta < 0`) copies on the shelf
    pub async fn adjust_stock(&self, id: i64, delta: i32) -> AppResult<Item> {
        let mut tx = self.repository.begin().await?;
        let mut item = tx
            .lock_item(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;

        let grown = (item.total.checked_add(delta), item.available.checked_add(delta));
        let (total, available) = match grown {
            (Some(total), Some(available)) if total >= 0 && available >= 0 => (total, available),
            _ => {
                return Err(AppError::InvalidState(format!(
                    "Item {} has {} of {} copies on the shelf, cannot adjust by {}",
                    id, item.available, item.total, delta
                )));
            }
        };

        item.total = total;
        item.available = available;
        item.updated_at = self.clock.now();

        tx.save_item(&item).await?;
        tx.commit().await?;

        tracing::info!(item_id = id, delta, total, available, "Stock adjusted");
        Ok(item)
    }
}

fn check_price(price: Option<Decimal>) -> AppResult<()> {
    match price {
        Some(price) if price < Decimal::ZERO => {
            Err(AppError::Validation("Price cannot be negative".to_string()))
        }
        _ => Ok(()),
    }
}
