//! Items queries for PostgreSQL.
//!
//! Functions take a bare connection so the same query runs on a pooled
//! connection for reads and inside a transaction for writes.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        item::{Item, ItemQuery, NewItem},
        Page,
    },
};

use super::postgres::map_unique_violation;

const ITEM_COLUMNS: &str = "id, isbn, title, author, publisher, category, price, location, \
                            cover, summary, total, available, status, created_at, updated_at";

/// Get live item by ID
pub async fn get_by_id(conn: &mut PgConnection, id: i64) -> AppResult<Option<Item>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 AND deleted_at IS NULL");
    let item = sqlx::query_as::<_, Item>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

/// Get live item by ID and hold its row lock
pub async fn lock_by_id(conn: &mut PgConnection, id: i64) -> AppResult<Option<Item>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
    );
    let item = sqlx::query_as::<_, Item>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

/// Get live item by ISBN
pub async fn get_by_isbn(conn: &mut PgConnection, isbn: &str) -> AppResult<Option<Item>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE isbn = $1 AND deleted_at IS NULL");
    let item = sqlx::query_as::<_, Item>(&sql)
        .bind(isbn)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ItemQuery) {
    builder.push(" WHERE deleted_at IS NULL");

    if let Some(keyword) = query.keyword_pattern() {
        let pattern = format!("%{}%", keyword);
        builder
            .push(" AND (LOWER(title) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(author) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(COALESCE(publisher, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(isbn) LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(ref category) = query.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }

    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }

    if query.available_only.unwrap_or(false) {
        builder.push(" AND available > 0");
    }
}

/// Search items with filters and pagination
pub async fn search(conn: &mut PgConnection, query: &ItemQuery) -> AppResult<(Vec<Item>, i64)> {
    let page = Page::new(query.page, query.per_page);

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items");
    push_filters(&mut count, query);
    let (total,): (i64,) = count.build_query_as().fetch_one(&mut *conn).await?;

    let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {ITEM_COLUMNS} FROM items"));
    push_filters(&mut select, query);
    select
        .push(" ORDER BY id LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

    let items = select
        .build_query_as::<Item>()
        .fetch_all(&mut *conn)
        .await?;

    Ok((items, total))
}

/// Create a new item
pub async fn insert(conn: &mut PgConnection, item: &NewItem) -> AppResult<Item> {
    let sql = format!(
        r#"
        INSERT INTO items (
            isbn, title, author, publisher, category, price, location, cover, summary,
            total, available, status, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
        RETURNING {ITEM_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Item>(&sql)
        .bind(&item.isbn)
        .bind(&item.title)
        .bind(&item.author)
        .bind(&item.publisher)
        .bind(&item.category)
        .bind(item.price)
        .bind(&item.location)
        .bind(&item.cover)
        .bind(&item.summary)
        .bind(item.total)
        .bind(item.available)
        .bind(item.status)
        .bind(item.created_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            map_unique_violation(e, || format!("Item with ISBN {} already exists", item.isbn))
        })
}

/// Write back descriptive fields and inventory counters
pub async fn save(conn: &mut PgConnection, item: &Item) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE items
        SET title = $2, author = $3, publisher = $4, category = $5, price = $6,
            location = $7, cover = $8, summary = $9, total = $10, available = $11,
            status = $12, updated_at = $13
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(item.id)
    .bind(&item.title)
    .bind(&item.author)
    .bind(&item.publisher)
    .bind(&item.category)
    .bind(item.price)
    .bind(&item.location)
    .bind(&item.cover)
    .bind(&item.summary)
    .bind(item.total)
    .bind(item.available)
    .bind(item.status)
    .bind(item.updated_at)
    .execute(&mut *conn)
    .await?;

    // Callers hold the row lock, so a miss means the row vanished underneath it
    if result.rows_affected() == 0 {
        return Err(AppError::Internal(format!("Locked item {} was not saved", item.id)));
    }
    Ok(())
}

/// Guarded counter update: applies only while `0 <= available + delta <= total`
pub async fn adjust_available(
    conn: &mut PgConnection,
    id: i64,
    delta: i32,
    now: DateTime<Utc>,
) -> AppResult<Item> {
    let sql = format!(
        r#"
        UPDATE items
        SET available = available + $2, updated_at = $3
        WHERE id = $1 AND deleted_at IS NULL
          AND available + $2 >= 0 AND available + $2 <= total
        RETURNING {ITEM_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Item>(&sql)
        .bind(id)
        .bind(delta)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            AppError::InvalidState(format!(
                "Adjusting available copies of item {} by {} would leave the range 0..=total",
                id, delta
            ))
        })
}

/// Soft delete
pub async fn soft_delete(conn: &mut PgConnection, id: i64, now: DateTime<Utc>) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE items SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Item with id {} not found", id)));
    }

    Ok(())
}
