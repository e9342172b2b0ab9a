//! Lending service: borrow, return, renew and loan corrections.
//!
//! Every mutation runs in a single store transaction. The preconditions are
//! evaluated on rows locked by that transaction, and the counter update and
//! the loan write commit together or not at all.

use std::sync::Arc;

use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        loan::{AdminLoanUpdate, Loan, LoanPolicy, LoanQuery, NewLoan},
        LoanStatus, ShelfStatus,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
    policy: LoanPolicy,
    clock: Arc<dyn Clock>,
}

impl LendingService {
    pub fn new(repository: Repository, policy: LoanPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            policy,
            clock,
        }
    }

    /// Lend one copy of an item to a patron
    pub async fn borrow_item(&self, patron_id: i64, item_id: i64) -> AppResult<Loan> {
        let now = self.clock.now();
        let mut tx = self.repository.begin().await?;

        let patron = tx
            .get_patron(patron_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Patron with id {} not found", patron_id)))?;
        if !patron.is_enabled() {
            return Err(AppError::PermissionDenied(format!(
                "Patron {} is disabled",
                patron_id
            )));
        }

        let item = tx
            .lock_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;
        if !item.is_lendable() {
            let reason = if item.status == ShelfStatus::OffShelf {
                "is off the shelf"
            } else {
                "has no copies available"
            };
            return Err(AppError::ItemUnavailable(format!("Item {} {}", item_id, reason)));
        }

        if tx.lock_active_loan(patron_id, item_id).await?.is_some() {
            tracing::warn!(patron_id, item_id, "Rejected duplicate borrow");
            return Err(AppError::AlreadyExists(format!(
                "Patron {} already has an active loan of item {}",
                patron_id, item_id
            )));
        }

        tx.adjust_available(item_id, -1, now).await?;
        let loan = tx
            .insert_loan(&NewLoan {
                patron_id,
                item_id,
                borrowed_at: now,
                due_at: self.policy.due_date(now),
            })
            .await?;

        tx.commit().await?;

        tracing::info!(
            loan_id = loan.id,
            patron_id,
            item_id,
            due_at = %loan.due_at,
            "Item borrowed"
        );
        Ok(loan)
    }

    /// Close the patron's active loan of an item and put the copy back on the shelf
    pub async fn return_item(&self, patron_id: i64, item_id: i64) -> AppResult<Loan> {
        let now = self.clock.now();
        let mut tx = self.repository.begin().await?;

        // Item before loan, the same order borrow takes them in
        tx.lock_item(item_id).await?;
        let mut loan = match tx.lock_active_loan(patron_id, item_id).await? {
            Some(loan) => loan,
            None => {
                return Err(match tx.latest_loan(patron_id, item_id).await? {
                    Some(latest) => AppError::NotBorrowed(format!(
                        "Loan {} of item {} is {}, not active",
                        latest.id, item_id, latest.status
                    )),
                    None => AppError::NotFound(format!(
                        "No loan of item {} by patron {}",
                        item_id, patron_id
                    )),
                });
            }
        };

        loan.status = LoanStatus::Returned;
        loan.returned_at = Some(now);
        loan.fine = self.policy.fine_for(loan.due_at, now);
        loan.updated_at = now;

        tx.save_loan(&loan).await?;
        tx.adjust_available(item_id, 1, now).await?;
        tx.commit().await?;

        tracing::info!(
            loan_id = loan.id,
            patron_id,
            item_id,
            fine = %loan.fine,
            "Item returned"
        );
        Ok(loan)
    }

    /// Restart the loan period from now
    pub async fn renew_loan(&self, loan_id: i64) -> AppResult<Loan> {
        let now = self.clock.now();
        let mut tx = self.repository.begin().await?;

        let mut loan = tx
            .lock_loan(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;
        if loan.status != LoanStatus::Active {
            return Err(AppError::NotBorrowed(format!(
                "Loan {} is {}, only active loans can be renewed",
                loan_id, loan.status
            )));
        }

        loan.due_at = self.policy.due_date(now);
        loan.renew_count += 1;
        loan.updated_at = now;

        tx.save_loan(&loan).await?;
        tx.commit().await?;

        tracing::info!(loan_id, due_at = %loan.due_at, renewals = loan.renew_count, "Loan renewed");
        Ok(loan)
    }

    /// Overwrite due date, status, fine and remark as given. No inventory change.
    pub async fn admin_update_loan(&self, loan_id: i64, update: AdminLoanUpdate) -> AppResult<Loan> {
        update.validate()?;
        if update.fine < Decimal::ZERO {
            return Err(AppError::Validation("Fine cannot be negative".to_string()));
        }

        let now = self.clock.now();
        let mut tx = self.repository.begin().await?;

        let mut loan = tx
            .lock_loan(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        let previous = loan.status;
        loan.due_at = update.due_at;
        loan.status = update.status;
        loan.fine = update.fine;
        loan.remark = update.remark;
        loan.updated_at = now;

        tx.save_loan(&loan).await?;
        tx.commit().await?;

        tracing::info!(loan_id, from = %previous, to = %loan.status, "Loan corrected by administrator");
        Ok(loan)
    }

    /// Get loan by ID
    pub async fn get_loan(&self, loan_id: i64) -> AppResult<Loan> {
        self.repository
            .get_loan(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    /// Search loans, newest first unless asked otherwise
    pub async fn list_loans(&self, query: &LoanQuery) -> AppResult<(Vec<Loan>, i64)> {
        if let (Some(from), Some(to)) = (query.borrowed_from, query.borrowed_to) {
            if from > to {
                return Err(AppError::BadRequest(format!(
                    "borrowed_from {} is after borrowed_to {}",
                    from, to
                )));
            }
        }
        self.repository.list_loans(query).await
    }

    /// Loans of one patron
    pub async fn list_patron_loans(
        &self,
        patron_id: i64,
        status: Option<LoanStatus>,
    ) -> AppResult<Vec<Loan>> {
        self.repository
            .get_patron(patron_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Patron with id {} not found", patron_id)))?;
        self.repository.list_patron_loans(patron_id, status).await
    }

    /// Active loans already past their due date
    pub async fn list_overdue_loans(&self) -> AppResult<Vec<Loan>> {
        self.repository.list_overdue_loans(self.clock.now()).await
    }
}
