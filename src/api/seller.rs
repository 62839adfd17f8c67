//! Seller-facing catalog management. Every operation is scoped to the
//! caller's own products; touching another seller's product is forbidden.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::auth::AuthUser;
use crate::domain::product::Product;
use crate::error::{ApiError, ApiResult};
use crate::extract::ValidatedJson;
use crate::state::AppState;

fn positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        return Err(ValidationError::new("positive_price"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 2, max = 200, message = "Title must be 2-200 characters."))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "Description is required."))]
    pub description: String,
    #[validate(custom(function = "positive_price", message = "Price must be positive."))]
    pub price: Decimal,
    #[validate(length(min = 1, max = 100, message = "Category is required."))]
    pub category: String,
    #[validate(length(min = 1, max = 100, message = "Sub-category is required."))]
    pub sub_category: String,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub stock: i32,
}

pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Product>>> {
    let products =
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE seller_id = $1 ORDER BY created_at DESC")
            .bind(user.user_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(products))
}

pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<ProductRequest>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    if req.stock < 0 {
        return Err(ApiError::Validation("Stock cannot be negative.".into()));
    }
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, title, description, price, category, sub_category, sizes, images, stock, seller_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.price)
    .bind(&req.category)
    .bind(&req.sub_category)
    .bind(&req.sizes)
    .bind(&req.images)
    .bind(req.stock)
    .bind(user.user_id)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ProductRequest>,
) -> ApiResult<Json<Product>> {
    if req.stock < 0 {
        return Err(ApiError::Validation("Stock cannot be negative.".into()));
    }
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT seller_id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&state.db)
        .await?;
    match existing {
        None => return Err(ApiError::NotFound("Product")),
        Some((seller_id,)) if seller_id != user.user_id => return Err(ApiError::Forbidden),
        Some(_) => {}
    }

    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET title = $2, description = $3, price = $4, category = $5, \
         sub_category = $6, sizes = $7, images = $8, stock = $9 WHERE id = $1 RETURNING *",
    )
    .bind(product_id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.price)
    .bind(&req.category)
    .bind(&req.sub_category)
    .bind(&req.sizes)
    .bind(&req.images)
    .bind(req.stock)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT seller_id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&state.db)
        .await?;
    match existing {
        None => return Err(ApiError::NotFound("Product")),
        Some((seller_id,)) if seller_id != user.user_id => return Err(ApiError::Forbidden),
        Some(_) => {}
    }

    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(product_id)
        .execute(&state.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
