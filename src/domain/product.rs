use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub sub_category: String,
    pub sizes: Vec<String>,
    pub images: Vec<String>,
    pub stock: i32,
    pub seller_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Compact projection used when products are embedded in other responses
/// (wishlist contents, order lines).
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct ProductSummary {
    pub id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub stock: i32,
}
