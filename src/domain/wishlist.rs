use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Name of the wishlist created for every user at signup. The oldest
/// wishlist is the default target for unaddressed adds.
pub const DEFAULT_WISHLIST_NAME: &str = "Default";

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Wishlist {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
