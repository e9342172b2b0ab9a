//! Loans queries for PostgreSQL

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        loan::{Loan, LoanQuery, NewLoan, SortOrder},
        LoanStatus, Page,
    },
};

use super::postgres::map_unique_violation;

const LOAN_COLUMNS: &str = "id, patron_id, item_id, borrowed_at, due_at, returned_at, status, \
                            fine, remark, renew_count, created_at, updated_at";

/// Get loan by ID
pub async fn get_by_id(conn: &mut PgConnection, id: i64) -> AppResult<Option<Loan>> {
    let sql = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1");
    let loan = sqlx::query_as::<_, Loan>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(loan)
}

/// Get loan by ID and hold its row lock
pub async fn lock_by_id(conn: &mut PgConnection, id: i64) -> AppResult<Option<Loan>> {
    let sql = format!("SELECT {LOAN_COLUMNS} FROM loans WHERE id = $1 FOR UPDATE");
    let loan = sqlx::query_as::<_, Loan>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(loan)
}

/// Active loan of a (patron, item) pair, locked.
///
/// A concurrent transaction that closes the same loan makes this return `None`
/// once it commits, since the status condition is re-checked after the lock wait.
pub async fn lock_active(
    conn: &mut PgConnection,
    patron_id: i64,
    item_id: i64,
) -> AppResult<Option<Loan>> {
    let sql = format!(
        "SELECT {LOAN_COLUMNS} FROM loans \
         WHERE patron_id = $1 AND item_id = $2 AND status = $3 FOR UPDATE"
    );
    let loan = sqlx::query_as::<_, Loan>(&sql)
        .bind(patron_id)
        .bind(item_id)
        .bind(LoanStatus::Active)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(loan)
}

/// Most recent loan of a (patron, item) pair
pub async fn latest_for_pair(
    conn: &mut PgConnection,
    patron_id: i64,
    item_id: i64,
) -> AppResult<Option<Loan>> {
    let sql = format!(
        "SELECT {LOAN_COLUMNS} FROM loans WHERE patron_id = $1 AND item_id = $2 \
         ORDER BY created_at DESC, id DESC LIMIT 1"
    );
    let loan = sqlx::query_as::<_, Loan>(&sql)
        .bind(patron_id)
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(loan)
}

/// Create a new active loan
pub async fn insert(conn: &mut PgConnection, loan: &NewLoan) -> AppResult<Loan> {
    let sql = format!(
        r#"
        INSERT INTO loans (patron_id, item_id, borrowed_at, due_at, status, fine, renew_count,
                           created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 0, 0, $3, $3)
        RETURNING {LOAN_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Loan>(&sql)
        .bind(loan.patron_id)
        .bind(loan.item_id)
        .bind(loan.borrowed_at)
        .bind(loan.due_at)
        .bind(LoanStatus::Active)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                format!(
                    "Patron {} already has an active loan of item {}",
                    loan.patron_id, loan.item_id
                )
            })
        })
}

/// Write back the mutable loan columns
pub async fn save(conn: &mut PgConnection, loan: &Loan) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE loans
        SET due_at = $2, returned_at = $3, status = $4, fine = $5, remark = $6,
            renew_count = $7, updated_at = $8
        WHERE id = $1
        "#,
    )
    .bind(loan.id)
    .bind(loan.due_at)
    .bind(loan.returned_at)
    .bind(loan.status)
    .bind(loan.fine)
    .bind(&loan.remark)
    .bind(loan.renew_count)
    .bind(loan.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        map_unique_violation(e, || {
            format!(
                "Patron {} already has an active loan of item {}",
                loan.patron_id, loan.item_id
            )
        })
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::Internal(format!("Locked loan {} was not saved", loan.id)));
    }
    Ok(())
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &LoanQuery) {
    builder.push(" WHERE 1=1");

    if let Some(patron_id) = query.patron_id {
        builder.push(" AND patron_id = ").push_bind(patron_id);
    }
    if let Some(item_id) = query.item_id {
        builder.push(" AND item_id = ").push_bind(item_id);
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(from) = query.borrowed_from {
        builder.push(" AND borrowed_at >= ").push_bind(from);
    }
    if let Some(to) = query.borrowed_to {
        builder.push(" AND borrowed_at <= ").push_bind(to);
    }
}

/// Search loans with filters and pagination
pub async fn search(conn: &mut PgConnection, query: &LoanQuery) -> AppResult<(Vec<Loan>, i64)> {
    let page = Page::new(query.page, query.per_page);

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM loans");
    push_filters(&mut count, query);
    let (total,): (i64,) = count.build_query_as().fetch_one(&mut *conn).await?;

    let order = match query.order.unwrap_or_default() {
        SortOrder::Asc => " ORDER BY created_at ASC, id ASC",
        SortOrder::Desc => " ORDER BY created_at DESC, id DESC",
    };

    let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {LOAN_COLUMNS} FROM loans"));
    push_filters(&mut select, query);
    select
        .push(order)
        .push(" LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let loans = select
        .build_query_as::<Loan>()
        .fetch_all(&mut *conn)
        .await?;

    Ok((loans, total))
}

/// Get loans for a patron
pub async fn list_for_patron(
    conn: &mut PgConnection,
    patron_id: i64,
    status: Option<LoanStatus>,
) -> AppResult<Vec<Loan>> {
    let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {LOAN_COLUMNS} FROM loans"));
    select.push(" WHERE patron_id = ").push_bind(patron_id);
    if let Some(status) = status {
        select.push(" AND status = ").push_bind(status);
    }
    select.push(" ORDER BY created_at DESC, id DESC");

    let loans = select
        .build_query_as::<Loan>()
        .fetch_all(&mut *conn)
        .await?;

    Ok(loans)
}

/// Active loans past their due date
pub async fn list_overdue(conn: &mut PgConnection, now: DateTime<Utc>) -> AppResult<Vec<Loan>> {
    let sql = format!(
        "SELECT {LOAN_COLUMNS} FROM loans WHERE status = $1 AND due_at < $2 ORDER BY due_at, id"
    );
    let loans = sqlx::query_as::<_, Loan>(&sql)
        .bind(LoanStatus::Active)
        .bind(now)
        .fetch_all(&mut *conn)
        .await?;
    Ok(loans)
}
