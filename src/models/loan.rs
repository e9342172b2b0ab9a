//! Loan (borrow) model and related types

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::LoanStatus;
use crate::config::LendingConfig;

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i64,
    pub patron_id: i64,
    pub item_id: i64,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    #[schema(value_type = String)]
    pub fine: Decimal,
    pub remark: Option<String>,
    pub renew_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// Active and past its due date. Computed at read time, the stored status is not changed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == LoanStatus::Active && self.due_at < now
    }
}

/// Row to insert when a copy is lent
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub patron_id: i64,
    pub item_id: i64,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

/// Administrative correction of a loan. Every field is written as given.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdminLoanUpdate {
    pub due_at: DateTime<Utc>,
    pub status: LoanStatus,
    #[schema(value_type = String)]
    #[serde(default)]
    pub fine: Decimal,
    #[validate(length(max = 256))]
    pub remark: Option<String>,
}

/// Sort direction on creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Loan search parameters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    pub patron_id: Option<i64>,
    pub item_id: Option<i64>,
    pub status: Option<LoanStatus>,
    /// Borrowed at or after this instant
    pub borrowed_from: Option<DateTime<Utc>>,
    /// Borrowed at or before this instant
    pub borrowed_to: Option<DateTime<Utc>>,
    pub order: Option<SortOrder>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl LoanQuery {
    /// In-memory evaluation of the filter, mirroring the SQL conditions
    pub fn matches(&self, loan: &Loan) -> bool {
        self.patron_id.map_or(true, |id| loan.patron_id == id)
            && self.item_id.map_or(true, |id| loan.item_id == id)
            && self.status.map_or(true, |s| loan.status == s)
            && self.borrowed_from.map_or(true, |from| loan.borrowed_at >= from)
            && self.borrowed_to.map_or(true, |to| loan.borrowed_at <= to)
    }
}

/// Loan period and fine rate
#[derive(Debug, Clone, PartialEq)]
pub struct LoanPolicy {
    pub loan_period: Duration,
    pub daily_fine_rate: Decimal,
}

impl LoanPolicy {
    pub fn due_date(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        from + self.loan_period
    }

    /// Fine owed when a loan due at `due_at` comes back at `returned_at`.
    ///
    /// Only whole days count: 71 hours late is two days.
    pub fn fine_for(&self, due_at: DateTime<Utc>, returned_at: DateTime<Utc>) -> Decimal {
        if returned_at <= due_at {
            return Decimal::ZERO;
        }
        let days = (returned_at - due_at).num_days();
        Decimal::from(days) * self.daily_fine_rate
    }
}

impl From<&LendingConfig> for LoanPolicy {
    fn from(config: &LendingConfig) -> Self {
        Self {
            loan_period: Duration::days(config.loan_period_days),
            daily_fine_rate: config.daily_fine_rate,
        }
    }
}

impl Default for LoanPolicy {
    fn default() -> Self {
        LoanPolicy::from(&LendingConfig::default())
    }
}
