//! PostgreSQL-backed store.
//!
//! Transactions run at READ COMMITTED. Check-then-act is made atomic by row
//! locks (`SELECT ... FOR UPDATE`), guarded counter updates, and the partial
//! unique index on active loans.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        item::{Item, ItemQuery, NewItem},
        loan::{Loan, LoanQuery, NewLoan},
        patron::Patron,
        LoanStatus,
    },
};

use super::{items, loans, patrons, Store, StoreTx};

/// Turn a unique-constraint violation into `AlreadyExists`
pub(crate) fn map_unique_violation(err: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::AlreadyExists(message())
        }
        _ => AppError::Database(err),
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn get_patron(&self, id: i64) -> AppResult<Option<Patron>> {
        let mut conn = self.pool.acquire().await?;
        patrons::get_by_id(&mut conn, id).await
    }

    async fn get_item(&self, id: i64) -> AppResult<Option<Item>> {
        let mut conn = self.pool.acquire().await?;
        items::get_by_id(&mut conn, id).await
    }

    async fn list_items(&self, query: &ItemQuery) -> AppResult<(Vec<Item>, i64)> {
        let mut conn = self.pool.acquire().await?;
        items::search(&mut conn, query).await
    }

    async fn get_loan(&self, id: i64) -> AppResult<Option<Loan>> {
        let mut conn = self.pool.acquire().await?;
        loans::get_by_id(&mut conn, id).await
    }

    async fn list_loans(&self, query: &LoanQuery) -> AppResult<(Vec<Loan>, i64)> {
        let mut conn = self.pool.acquire().await?;
        loans::search(&mut conn, query).await
    }

    async fn list_patron_loans(
        &self,
        patron_id: i64,
        status: Option<LoanStatus>,
    ) -> AppResult<Vec<Loan>> {
        let mut conn = self.pool.acquire().await?;
        loans::list_for_patron(&mut conn, patron_id, status).await
    }

    async fn list_overdue_loans(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>> {
        let mut conn = self.pool.acquire().await?;
        loans::list_overdue(&mut conn, now).await
    }
}

/// Open Postgres transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn get_patron(&mut self, id: i64) -> AppResult<Option<Patron>> {
        patrons::get_by_id(&mut self.tx, id).await
    }

    async fn lock_item(&mut self, id: i64) -> AppResult<Option<Item>> {
        items::lock_by_id(&mut self.tx, id).await
    }

    async fn find_item_by_isbn(&mut self, isbn: &str) -> AppResult<Option<Item>> {
        items::get_by_isbn(&mut self.tx, isbn).await
    }

    async fn insert_item(&mut self, item: &NewItem) -> AppResult<Item> {
        items::insert(&mut self.tx, item).await
    }

    async fn save_item(&mut self, item: &Item) -> AppResult<()> {
        items::save(&mut self.tx, item).await
    }

    async fn adjust_available(
        &mut self,
        id: i64,
        delta: i32,
        now: DateTime<Utc>,
    ) -> AppResult<Item> {
        items::adjust_available(&mut self.tx, id, delta, now).await
    }

    async fn delete_item(&mut self, id: i64, now: DateTime<Utc>) -> AppResult<()> {
        items::soft_delete(&mut self.tx, id, now).await
    }

    async fn lock_loan(&mut self, id: i64) -> AppResult<Option<Loan>> {
        loans::lock_by_id(&mut self.tx, id).await
    }

    async fn lock_active_loan(&mut self, patron_id: i64, item_id: i64) -> AppResult<Option<Loan>> {
        loans::lock_active(&mut self.tx, patron_id, item_id).await
    }

    async fn latest_loan(&mut self, patron_id: i64, item_id: i64) -> AppResult<Option<Loan>> {
        loans::latest_for_pair(&mut self.tx, patron_id, item_id).await
    }

    async fn insert_loan(&mut self, loan: &NewLoan) -> AppResult<Loan> {
        loans::insert(&mut self.tx, loan).await
    }

    async fn save_loan(&mut self, loan: &Loan) -> AppResult<()> {
        loans::save(&mut self.tx, loan).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
