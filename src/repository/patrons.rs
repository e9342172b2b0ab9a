//! Patrons queries for PostgreSQL

use sqlx::PgConnection;

use crate::{error::AppResult, models::patron::Patron};

/// Get patron by ID
pub async fn get_by_id(conn: &mut PgConnection, id: i64) -> AppResult<Option<Patron>> {
    let patron = sqlx::query_as::<_, Patron>(
        "SELECT id, username, role, status, created_at FROM patrons WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(patron)
}
