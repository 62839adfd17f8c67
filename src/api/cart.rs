//! Cart endpoints.
//!
//! The merge-on-add invariant (one row per user/product) is enforced by the
//! unique key plus an atomic upsert, so concurrent adds of the same product
//! can never produce duplicate entries or lose an increment.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::PaginatedResponse;
use crate::auth::AuthUser;
use crate::domain::cart::{CartItem, CartLine};
use crate::error::{is_foreign_key_violation, ApiError, ApiResult};
use crate::extract::ValidatedJson;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuantityRequest {
    #[validate(range(min = 1, message = "Quantity must be a positive integer."))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CartParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<AddToCartRequest>,
) -> ApiResult<(StatusCode, Json<CartItem>)> {
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(req.product_id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(ApiError::NotFound("Product"));
    }

    let item = sqlx::query_as::<_, CartItem>(
        "INSERT INTO cart_items (id, user_id, product_id, quantity) VALUES ($1, $2, $3, 1) \
         ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = cart_items.quantity + 1 \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user.user_id)
    .bind(req.product_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        // The product can vanish between the existence check and the upsert.
        if is_foreign_key_violation(&e) {
            ApiError::NotFound("Product")
        } else {
            e.into()
        }
    })?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(cart_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateQuantityRequest>,
) -> ApiResult<Json<CartItem>> {
    sqlx::query_as::<_, CartItem>(
        "UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2 RETURNING *",
    )
    .bind(cart_id)
    .bind(user.user_id)
    .bind(req.quantity)
    .fetch_optional(&state.db)
    .await?
    .map(Json)
    .ok_or(ApiError::NotFound("Cart item"))
}

pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(cart_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(cart_id)
        .bind(user.user_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Cart item"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Cart view enriched with live product data; the returned price and stock
/// are the current catalog values, not an order snapshot.
pub async fn list_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<CartParams>,
) -> ApiResult<Json<PaginatedResponse<CartLine>>> {
    let pagination = super::Pagination {
        page: params.page,
        limit: params.limit,
    };
    let (page, limit, offset) = pagination.window();
    let search = params.search.filter(|s| !s.trim().is_empty());

    let lines = sqlx::query_as::<_, CartLine>(
        "SELECT c.id, c.product_id, c.quantity, p.title, p.price, p.stock, p.category, p.images \
         FROM cart_items c JOIN products p ON p.id = c.product_id \
         WHERE c.user_id = $1 \
           AND ($2::TEXT IS NULL OR p.title ILIKE '%' || $2 || '%' OR p.category ILIKE '%' || $2 || '%') \
         ORDER BY c.created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(user.user_id)
    .bind(&search)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM cart_items c JOIN products p ON p.id = c.product_id \
         WHERE c.user_id = $1 \
           AND ($2::TEXT IS NULL OR p.title ILIKE '%' || $2 || '%' OR p.category ILIKE '%' || $2 || '%')",
    )
    .bind(user.user_id)
    .bind(&search)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(PaginatedResponse {
        data: lines,
        total: total.0,
        page,
    }))
}
