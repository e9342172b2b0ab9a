//! Repository layer: store contracts and their adapters.
//!
//! [`Store`] serves plain reads and opens transactions. Every state change goes
//! through a [`StoreTx`]: its `lock_*` reads take the row locks the following
//! writes depend on, and nothing is visible to other callers until
//! [`StoreTx::commit`]. Dropping a transaction without committing rolls it back.
//!
//! Transactions that touch both an item and one of its loans lock the item
//! first (`lock_item`, then `lock_loan` / `lock_active_loan`). Taking them in
//! the other order can deadlock against a concurrent borrow on Postgres.

pub mod items;
pub mod loans;
pub mod memory;
pub mod patrons;
pub mod postgres;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        item::{Item, ItemQuery, NewItem},
        loan::{Loan, LoanQuery, NewLoan},
        patron::Patron,
        LoanStatus,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Read access and transaction factory
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    async fn get_patron(&self, id: i64) -> AppResult<Option<Patron>>;

    /// Live (not deleted) item by id
    async fn get_item(&self, id: i64) -> AppResult<Option<Item>>;

    async fn list_items(&self, query: &ItemQuery) -> AppResult<(Vec<Item>, i64)>;

    async fn get_loan(&self, id: i64) -> AppResult<Option<Loan>>;

    async fn list_loans(&self, query: &LoanQuery) -> AppResult<(Vec<Loan>, i64)>;

    /// Loans of one patron, newest first
    async fn list_patron_loans(
        &self,
        patron_id: i64,
        status: Option<LoanStatus>,
    ) -> AppResult<Vec<Loan>>;

    /// Active loans whose due date is before `now`
    async fn list_overdue_loans(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>>;
}

/// One all-or-nothing unit of work
#[async_trait]
pub trait StoreTx: Send {
    async fn get_patron(&mut self, id: i64) -> AppResult<Option<Patron>>;

    /// Live item by id, locked until the transaction ends.
    ///
    /// Must come before any loan lock taken in the same transaction.
    async fn lock_item(&mut self, id: i64) -> AppResult<Option<Item>>;

    async fn find_item_by_isbn(&mut self, isbn: &str) -> AppResult<Option<Item>>;

    /// Fails with `AlreadyExists` when a live item holds the same ISBN
    async fn insert_item(&mut self, item: &NewItem) -> AppResult<Item>;

    /// Write back every mutable column of a locked item
    async fn save_item(&mut self, item: &Item) -> AppResult<()>;

    /// Atomically add `delta` to `available`.
    ///
    /// Fails with `InvalidState`, changing nothing, when the result would leave
    /// `0..=total`.
    async fn adjust_available(&mut self, id: i64, delta: i32, now: DateTime<Utc>)
        -> AppResult<Item>;

    async fn delete_item(&mut self, id: i64, now: DateTime<Utc>) -> AppResult<()>;

    /// Loan by id, locked until the transaction ends
    async fn lock_loan(&mut self, id: i64) -> AppResult<Option<Loan>>;

    /// The active loan of a (patron, item) pair, locked until the transaction ends
    async fn lock_active_loan(&mut self, patron_id: i64, item_id: i64) -> AppResult<Option<Loan>>;

    /// Most recent loan of a (patron, item) pair in any status
    async fn latest_loan(&mut self, patron_id: i64, item_id: i64) -> AppResult<Option<Loan>>;

    /// Fails with `AlreadyExists` when the pair already has an active loan
    async fn insert_loan(&mut self, loan: &NewLoan) -> AppResult<Loan>;

    /// Write back every mutable column of a locked loan.
    ///
    /// Fails with `AlreadyExists` when this would give the pair a second active loan.
    async fn save_loan(&mut self, loan: &Loan) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Shared handle on the configured store
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn Store>,
}

impl Repository {
    pub fn new(store: impl Store + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Repository backed by PostgreSQL
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self::new(PgStore::new(pool))
    }
}

impl Deref for Repository {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}
