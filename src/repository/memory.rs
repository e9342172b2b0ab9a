//! In-memory store.
//!
//! Intended for tests and local development. A transaction owns the store-wide
//! mutex for its whole lifetime and edits a private copy of the state, so
//! transactions are fully serialized and an uncommitted one leaves no trace.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::{AppError, AppResult},
    models::{
        item::{Item, ItemQuery, NewItem},
        loan::{Loan, LoanQuery, NewLoan, SortOrder},
        patron::Patron,
        LoanStatus, Page, PatronRole, PatronStatus,
    },
};

use super::{Store, StoreTx};

#[derive(Debug, Clone, Default)]
struct Tables {
    patrons: BTreeMap<i64, Patron>,
    items: BTreeMap<i64, Item>,
    deleted_items: BTreeMap<i64, Item>,
    loans: BTreeMap<i64, Loan>,
    next_patron_id: i64,
    next_item_id: i64,
    next_loan_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn active_loan(&self, patron_id: i64, item_id: i64) -> Option<&Loan> {
        self.loans.values().find(|l| {
            l.patron_id == patron_id && l.item_id == item_id && l.status == LoanStatus::Active
        })
    }

    fn duplicate_active(patron_id: i64, item_id: i64) -> AppError {
        AppError::AlreadyExists(format!(
            "Patron {} already has an active loan of item {}",
            patron_id, item_id
        ))
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a patron. Membership management lives outside the lending core,
    /// so this is the only way to create one here.
    pub async fn add_patron(&self, username: &str, role: PatronRole, status: PatronStatus) -> Patron {
        let mut tables = self.tables.lock().await;
        let id = Tables::next_id(&mut tables.next_patron_id);
        let patron = Patron {
            id,
            username: username.to_string(),
            role,
            status,
            created_at: Utc::now(),
        };
        tables.patrons.insert(id, patron.clone());
        patron
    }

    pub async fn set_patron_status(&self, id: i64, status: PatronStatus) {
        if let Some(patron) = self.tables.lock().await.patrons.get_mut(&id) {
            patron.status = status;
        }
    }
}

fn paginate<T: Clone>(rows: Vec<T>, page: Page) -> Vec<T> {
    rows.into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
        .collect()
}

fn newest_first(a: &Loan, b: &Loan) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn get_patron(&self, id: i64) -> AppResult<Option<Patron>> {
        Ok(self.tables.lock().await.patrons.get(&id).cloned())
    }

    async fn get_item(&self, id: i64) -> AppResult<Option<Item>> {
        Ok(self.tables.lock().await.items.get(&id).cloned())
    }

    async fn list_items(&self, query: &ItemQuery) -> AppResult<(Vec<Item>, i64)> {
        let tables = self.tables.lock().await;
        let matching: Vec<Item> = tables
            .items
            .values()
            .filter(|item| query.matches(item))
            .cloned()
            .collect();
        let total = matching.len() as i64;
        Ok((paginate(matching, Page::new(query.page, query.per_page)), total))
    }

    async fn get_loan(&self, id: i64) -> AppResult<Option<Loan>> {
        Ok(self.tables.lock().await.loans.get(&id).cloned())
    }

    async fn list_loans(&self, query: &LoanQuery) -> AppResult<(Vec<Loan>, i64)> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<Loan> = tables
            .loans
            .values()
            .filter(|loan| query.matches(loan))
            .cloned()
            .collect();
        match query.order.unwrap_or_default() {
            SortOrder::Desc => matching.sort_by(newest_first),
            SortOrder::Asc => matching.sort_by(|a, b| newest_first(b, a)),
        }
        let total = matching.len() as i64;
        Ok((paginate(matching, Page::new(query.page, query.per_page)), total))
    }

    async fn list_patron_loans(
        &self,
        patron_id: i64,
        status: Option<LoanStatus>,
    ) -> AppResult<Vec<Loan>> {
        let tables = self.tables.lock().await;
        let mut loans: Vec<Loan> = tables
            .loans
            .values()
            .filter(|l| l.patron_id == patron_id && status.map_or(true, |s| l.status == s))
            .cloned()
            .collect();
        loans.sort_by(newest_first);
        Ok(loans)
    }

    async fn list_overdue_loans(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>> {
        let tables = self.tables.lock().await;
        let mut loans: Vec<Loan> = tables
            .loans
            .values()
            .filter(|l| l.is_overdue(now))
            .cloned()
            .collect();
        loans.sort_by(|a, b| a.due_at.cmp(&b.due_at).then(a.id.cmp(&b.id)));
        Ok(loans)
    }
}

/// Exclusive transaction over the in-memory tables
pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn get_patron(&mut self, id: i64) -> AppResult<Option<Patron>> {
        Ok(self.working.patrons.get(&id).cloned())
    }

    async fn lock_item(&mut self, id: i64) -> AppResult<Option<Item>> {
        Ok(self.working.items.get(&id).cloned())
    }

    async fn find_item_by_isbn(&mut self, isbn: &str) -> AppResult<Option<Item>> {
        Ok(self.working.items.values().find(|i| i.isbn == isbn).cloned())
    }

    async fn insert_item(&mut self, new: &NewItem) -> AppResult<Item> {
        if self.working.items.values().any(|i| i.isbn == new.isbn) {
            return Err(AppError::AlreadyExists(format!(
                "Item with ISBN {} already exists",
                new.isbn
            )));
        }
        let id = Tables::next_id(&mut self.working.next_item_id);
        let item = Item {
            id,
            isbn: new.isbn.clone(),
            title: new.title.clone(),
            author: new.author.clone(),
            publisher: new.publisher.clone(),
            category: new.category.clone(),
            price: new.price,
            location: new.location.clone(),
            cover: new.cover.clone(),
            summary: new.summary.clone(),
            total: new.total,
            available: new.available,
            status: new.status,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        self.working.items.insert(id, item.clone());
        Ok(item)
    }

    async fn save_item(&mut self, item: &Item) -> AppResult<()> {
        if item.total < 0 || item.available < 0 || item.available > item.total {
            return Err(AppError::InvalidState(format!(
                "Item {} stock out of bounds (available {}, total {})",
                item.id, item.available, item.total
            )));
        }
        match self.working.items.get_mut(&item.id) {
            Some(stored) => {
                *stored = item.clone();
                Ok(())
            }
            None => Err(AppError::Internal(format!("Locked item {} was not saved", item.id))),
        }
    }

    async fn adjust_available(
        &mut self,
        id: i64,
        delta: i32,
        now: DateTime<Utc>,
    ) -> AppResult<Item> {
        let item = self
            .working
            .items
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;
        let available = item.available + delta;
        if available < 0 || available > item.total {
            return Err(AppError::InvalidState(format!(
                "Adjusting available copies of item {} by {} would leave the range 0..=total",
                id, delta
            )));
        }
        item.available = available;
        item.updated_at = now;
        Ok(item.clone())
    }

    async fn delete_item(&mut self, id: i64, now: DateTime<Utc>) -> AppResult<()> {
        let mut item = self
            .working
            .items
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;
        item.updated_at = now;
        self.working.deleted_items.insert(id, item);
        Ok(())
    }

    async fn lock_loan(&mut self, id: i64) -> AppResult<Option<Loan>> {
        Ok(self.working.loans.get(&id).cloned())
    }

    async fn lock_active_loan(&mut self, patron_id: i64, item_id: i64) -> AppResult<Option<Loan>> {
        Ok(self.working.active_loan(patron_id, item_id).cloned())
    }

    async fn latest_loan(&mut self, patron_id: i64, item_id: i64) -> AppResult<Option<Loan>> {
        Ok(self
            .working
            .loans
            .values()
            .filter(|l| l.patron_id == patron_id && l.item_id == item_id)
            .min_by(|a, b| newest_first(a, b))
            .cloned())
    }

    async fn insert_loan(&mut self, new: &NewLoan) -> AppResult<Loan> {
        if self.working.active_loan(new.patron_id, new.item_id).is_some() {
            return Err(Tables::duplicate_active(new.patron_id, new.item_id));
        }
        let id = Tables::next_id(&mut self.working.next_loan_id);
        let loan = Loan {
            id,
            patron_id: new.patron_id,
            item_id: new.item_id,
            borrowed_at: new.borrowed_at,
            due_at: new.due_at,
            returned_at: None,
            status: LoanStatus::Active,
            fine: Decimal::ZERO,
            remark: None,
            renew_count: 0,
            created_at: new.borrowed_at,
            updated_at: new.borrowed_at,
        };
        self.working.loans.insert(id, loan.clone());
        Ok(loan)
    }

    async fn save_loan(&mut self, loan: &Loan) -> AppResult<()> {
        if loan.status == LoanStatus::Active {
            if let Some(other) = self.working.active_loan(loan.patron_id, loan.item_id) {
                if other.id != loan.id {
                    return Err(Tables::duplicate_active(loan.patron_id, loan.item_id));
                }
            }
        }
        match self.working.loans.get_mut(&loan.id) {
            Some(stored) => {
                *stored = loan.clone();
                Ok(())
            }
            None => Err(AppError::Internal(format!("Locked loan {} was not saved", loan.id))),
        }
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
