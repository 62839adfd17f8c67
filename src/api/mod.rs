//! HTTP surface: routing and shared response envelopes.

use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod seller;
pub mod wishlists;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl Pagination {
    /// Clamped (page, limit, offset) for SQL binding.
    pub fn window(&self) -> (u32, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = i64::from(self.limit.unwrap_or(10).clamp(1, 100));
        let offset = i64::from(page - 1) * limit;
        (page, limit, offset)
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }),
        )
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/products", get(products::list_products))
        .route("/api/products/:product_id", get(products::get_product))
        .route(
            "/api/products/:product_id/reviews",
            get(reviews::product_reviews),
        )
        .route(
            "/api/seller/products",
            get(seller::list_products).post(seller::create_product),
        )
        .route(
            "/api/seller/products/:product_id",
            put(seller::update_product).delete(seller::delete_product),
        )
        .route("/api/cart", get(cart::list_cart).post(cart::add_to_cart))
        .route(
            "/api/cart/:cart_id",
            put(cart::update_quantity).delete(cart::remove_item),
        )
        .route("/api/order", post(orders::place_order))
        .route("/api/order/stripe", post(orders::place_order_stripe))
        .route("/api/order/verify-stripe", get(orders::verify_stripe))
        .route("/api/orders", get(orders::user_orders))
        .route("/api/admin/orders", get(orders::admin_orders))
        .route(
            "/api/admin/order/status/:order_id",
            put(orders::update_status),
        )
        .route(
            "/api/wishlists",
            get(wishlists::list_wishlists).post(wishlists::create_wishlist),
        )
        .route(
            "/api/wishlist/:wishlist_id",
            get(wishlists::get_wishlist).delete(wishlists::delete_wishlist),
        )
        .route(
            "/api/wishlist/products",
            post(wishlists::add_product).put(wishlists::move_product),
        )
        .route(
            "/api/wishlist/:wishlist_id/products/:product_id",
            delete(wishlists::remove_product),
        )
        .route("/api/reviews", post(reviews::create_review))
        .route(
            "/api/reviews/:review_id",
            put(reviews::update_review).delete(reviews::delete_review),
        )
        .route("/api/users/:user_id/reviews", get(reviews::user_reviews))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        let p = Pagination {
            page: None,
            limit: None,
        };
        assert_eq!(p.window(), (1, 10, 0));

        let p = Pagination {
            page: Some(3),
            limit: Some(20),
        };
        assert_eq!(p.window(), (3, 20, 40));

        let p = Pagination {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(p.window(), (1, 100, 0));
    }
}
