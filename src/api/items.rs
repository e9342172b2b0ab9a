//! Item (catalog) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::item::{CreateItem, Item, ItemQuery, ShelfStatusUpdate, StockAdjustment, UpdateItem},
    AppState,
};

use super::{AuthenticatedUser, ItemPage, PaginatedResponse};

/// List items with search and pagination
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    params(ItemQuery),
    responses(
        (status = 200, description = "List of items", body = ItemPage)
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<PaginatedResponse<Item>>> {
    let (items, total) = state.services.catalog.list_items(&query).await?;
    Ok(Json(PaginatedResponse::new(items, total, query.page, query.per_page)))
}

/// Get item details by ID
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = Item),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Item>> {
    let item = state.services.catalog.get_item(id).await?;
    Ok(Json(item))
}

/// Catalog a new item
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Administrator privileges required"),
        (status = 409, description = "ISBN already catalogued")
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<Item>)> {
    claims.require_admin()?;

    let created = state.services.catalog.create_item(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing item
#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 404, description = "Item not found"),
        (status = 422, description = "Total below the number of copies on loan")
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(update): Json<UpdateItem>,
) -> AppResult<Json<Item>> {
    claims.require_admin()?;

    let updated = state.services.catalog.update_item(id, update).await?;
    Ok(Json(updated))
}

/// Delete an item
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not found"),
        (status = 422, description = "Copies still on loan")
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Put an item on or off the shelf
#[utoipa::path(
    put,
    path = "/items/{id}/status",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    request_body = ShelfStatusUpdate,
    responses(
        (status = 200, description = "Shelf status changed", body = Item),
        (status = 404, description = "Item not found")
    )
)]
pub async fn set_shelf_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<ShelfStatusUpdate>,
) -> AppResult<Json<Item>> {
    claims.require_admin()?;

    let item = state.services.catalog.set_shelf_status(id, request.status).await?;
    Ok(Json(item))
}

/// Acquire or write off copies
#[utoipa::path(
    put,
    path = "/items/{id}/stock",
    tag = "items",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    request_body = StockAdjustment,
    responses(
        (status = 200, description = "Stock adjusted", body = Item),
        (status = 404, description = "Item not found"),
        (status = 422, description = "Not enough copies on the shelf")
    )
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<StockAdjustment>,
) -> AppResult<Json<Item>> {
    claims.require_admin()?;

    let item = state.services.catalog.adjust_stock(id, request.delta).await?;
    Ok(Json(item))
}
