//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{
        loan::{AdminLoanUpdate, Loan, LoanQuery},
        LoanStatus, UserClaims,
    },
    AppState,
};

use super::{AuthenticatedUser, LoanPage, PaginatedResponse};

/// Borrow or return request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoanRequest {
    /// Item ID
    pub item_id: i64,
    /// Patron ID. Defaults to the caller; naming another patron requires administrator privileges.
    pub patron_id: Option<i64>,
}

impl LoanRequest {
    fn patron_for(&self, claims: &UserClaims) -> AppResult<i64> {
        let patron_id = self.patron_id.unwrap_or(claims.patron_id);
        claims.require_self_or_admin(patron_id)?;
        Ok(patron_id)
    }
}

/// Filter for a patron's loans
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatronLoansQuery {
    pub status: Option<LoanStatus>,
}

/// Borrow an item
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = LoanRequest,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 403, description = "Patron disabled or not the caller"),
        (status = 404, description = "Patron or item not found"),
        (status = 409, description = "No copy available or item already borrowed by this patron")
    )
)]
pub async fn borrow_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<LoanRequest>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    let patron_id = request.patron_for(&claims)?;

    let loan = state.services.lending.borrow_item(patron_id, request.item_id).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed item
#[utoipa::path(
    post,
    path = "/loans/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = LoanRequest,
    responses(
        (status = 200, description = "Item returned, fine computed", body = Loan),
        (status = 404, description = "No loan for this patron and item"),
        (status = 409, description = "Latest loan is not active")
    )
)]
pub async fn return_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<LoanRequest>,
) -> AppResult<Json<Loan>> {
    let patron_id = request.patron_for(&claims)?;

    let loan = state.services.lending.return_item(patron_id, request.item_id).await?;
    Ok(Json(loan))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan renewed", body = Loan),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan is not active")
    )
)]
pub async fn renew_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i64>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.lending.get_loan(loan_id).await?;
    claims.require_self_or_admin(loan.patron_id)?;

    let renewed = state.services.lending.renew_loan(loan_id).await?;
    Ok(Json(renewed))
}

/// Search loans. Members only ever see their own.
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "Matching loans", body = LoanPage)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(mut query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<Loan>>> {
    if !claims.is_admin() {
        query.patron_id = Some(claims.patron_id);
    }

    let (loans, total) = state.services.lending.list_loans(&query).await?;
    Ok(Json(PaginatedResponse::new(loans, total, query.page, query.per_page)))
}

/// Get loan details
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = Loan),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i64>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.lending.get_loan(loan_id).await?;
    claims.require_self_or_admin(loan.patron_id)?;
    Ok(Json(loan))
}

/// Active loans past their due date
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue loans, earliest due first", body = Vec<Loan>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn list_overdue_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Loan>>> {
    claims.require_admin()?;

    let loans = state.services.lending.list_overdue_loans().await?;
    Ok(Json(loans))
}

/// Correct a loan record
#[utoipa::path(
    put,
    path = "/admin/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Loan ID")
    ),
    request_body = AdminLoanUpdate,
    responses(
        (status = 200, description = "Loan updated", body = Loan),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn admin_update_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i64>,
    Json(update): Json<AdminLoanUpdate>,
) -> AppResult<Json<Loan>> {
    claims.require_admin()?;

    let loan = state.services.lending.admin_update_loan(loan_id, update).await?;
    Ok(Json(loan))
}

/// Get loans for a specific patron
#[utoipa::path(
    get,
    path = "/patrons/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Patron ID"),
        PatronLoansQuery
    ),
    responses(
        (status = 200, description = "Patron's loans, newest first", body = Vec<Loan>),
        (status = 404, description = "Patron not found")
    )
)]
pub async fn get_patron_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(patron_id): Path<i64>,
    Query(query): Query<PatronLoansQuery>,
) -> AppResult<Json<Vec<Loan>>> {
    claims.require_self_or_admin(patron_id)?;

    let loans = state
        .services
        .lending
        .list_patron_loans(patron_id, query.status)
        .await?;
    Ok(Json(loans))
}
