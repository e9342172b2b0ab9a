//! Shared domain enums.
//!
//! Each enum is stored as SMALLINT; the discriminants are the storage codes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// LoanStatus
// ---------------------------------------------------------------------------

/// Loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum LoanStatus {
    Cancelled = 0,
    Active = 1,
    Returned = 2,
    Overdue = 3,
}

impl From<LoanStatus> for i16 {
    fn from(s: LoanStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Cancelled => "cancelled",
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
            LoanStatus::Overdue => "overdue",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// ShelfStatus
// ---------------------------------------------------------------------------

/// Whether an item can currently be lent at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum ShelfStatus {
    OffShelf = 0,
    OnShelf = 1,
}

impl Default for ShelfStatus {
    fn default() -> Self {
        ShelfStatus::OnShelf
    }
}

impl From<ShelfStatus> for i16 {
    fn from(s: ShelfStatus) -> Self {
        s as i16
    }
}

// ---------------------------------------------------------------------------
// PatronStatus
// ---------------------------------------------------------------------------

/// Membership account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum PatronStatus {
    Disabled = 0,
    Enabled = 1,
}

impl From<PatronStatus> for i16 {
    fn from(s: PatronStatus) -> Self {
        s as i16
    }
}

// ---------------------------------------------------------------------------
// PatronRole
// ---------------------------------------------------------------------------

/// Patron role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum PatronRole {
    Member = 0,
    Admin = 1,
}

impl From<PatronRole> for i16 {
    fn from(r: PatronRole) -> Self {
        r as i16
    }
}

impl std::fmt::Display for PatronRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PatronRole::Member => "member",
            PatronRole::Admin => "admin",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loan_status_codes() {
        assert_eq!(i16::from(LoanStatus::Cancelled), 0);
        assert_eq!(i16::from(LoanStatus::Active), 1);
        assert_eq!(i16::from(LoanStatus::Returned), 2);
        assert_eq!(i16::from(LoanStatus::Overdue), 3);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&LoanStatus::Active).unwrap(), "\"active\"");
        assert_eq!(serde_json::to_string(&ShelfStatus::OffShelf).unwrap(), "\"off_shelf\"");
        let parsed: LoanStatus = serde_json::from_str("\"overdue\"").unwrap();
        assert_eq!(parsed, LoanStatus::Overdue);
    }

    #[test]
    fn test_shelf_status_codes() {
        assert_eq!(i16::from(ShelfStatus::OffShelf), 0);
        assert_eq!(i16::from(ShelfStatus::OnShelf), 1);
        assert_eq!(ShelfStatus::default(), ShelfStatus::OnShelf);
    }
}
