//! Patron (membership) model and JWT claims

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::{PatronRole, PatronStatus};
use crate::error::AppError;

/// Patron record. Credentials are held by the authentication service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Patron {
    pub id: i64,
    pub username: String,
    pub role: PatronRole,
    pub status: PatronStatus,
    pub created_at: DateTime<Utc>,
}

impl Patron {
    pub fn is_enabled(&self) -> bool {
        self.status == PatronStatus::Enabled
    }
}

/// JWT Claims for authenticated patrons
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub patron_id: i64,
    pub role: PatronRole,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn new(patron_id: i64, username: &str, role: PatronRole, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: username.to_string(),
            patron_id,
            role,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == PatronRole::Admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied("Administrator privileges required".to_string()))
        }
    }

    /// The caller must be the patron concerned or an administrator
    pub fn require_self_or_admin(&self, patron_id: i64) -> Result<(), AppError> {
        if self.is_admin() || self.patron_id == patron_id {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(
                "Only the borrower or an administrator may access this record".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_keeps_identity() {
        let claims = UserClaims::new(42, "reader", PatronRole::Member, Duration::hours(1));
        let token = claims.create_token("secret").unwrap();
        let decoded = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.patron_id, 42);
        assert_eq!(decoded.role, PatronRole::Member);
        assert!(UserClaims::from_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_ownership_checks() {
        let member = UserClaims::new(5, "member", PatronRole::Member, Duration::hours(1));
        let admin = UserClaims::new(1, "admin", PatronRole::Admin, Duration::hours(1));

        assert!(member.require_self_or_admin(5).is_ok());
        assert!(matches!(member.require_self_or_admin(6), Err(AppError::PermissionDenied(_))));
        assert!(member.require_admin().is_err());
        assert!(admin.require_self_or_admin(6).is_ok());
        assert!(admin.require_admin().is_ok());
    }
}
