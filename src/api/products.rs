//! Public catalog browsing.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::PaginatedResponse;
use crate::domain::product::Product;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CatalogParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<CatalogParams>,
) -> ApiResult<Json<PaginatedResponse<Product>>> {
    let pagination = super::Pagination {
        page: params.page,
        limit: params.limit,
    };
    let (page, limit, offset) = pagination.window();
    let search = params.search.filter(|s| !s.trim().is_empty());
    let category = params.category.filter(|s| !s.trim().is_empty());

    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products \
         WHERE ($1::TEXT IS NULL OR title ILIKE '%' || $1 || '%') \
           AND ($2::TEXT IS NULL OR category = $2) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(&search)
    .bind(&category)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products \
         WHERE ($1::TEXT IS NULL OR title ILIKE '%' || $1 || '%') \
           AND ($2::TEXT IS NULL OR category = $2)",
    )
    .bind(&search)
    .bind(&category)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(PaginatedResponse {
        data: products,
        total: total.0,
        page,
    }))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Json<Product>> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Product"))
}
