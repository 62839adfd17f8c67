//! Wishlist endpoints.
//!
//! Product membership is a set: adds are idempotent upserts
//! (`ON CONFLICT DO NOTHING`), and moving a product between wishlists is a
//! remove-then-conditional-add in one transaction that reports whether the
//! target already held the product.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::domain::product::ProductSummary;
use crate::domain::wishlist::{Wishlist, DEFAULT_WISHLIST_NAME};
use crate::error::{is_foreign_key_violation, is_unique_violation, ApiError, ApiResult};
use crate::extract::ValidatedJson;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWishlistRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    pub name: String,
    #[validate(length(max = 500, message = "Description is too long."))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddProductRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MoveProductRequest {
    pub wishlist_id: Uuid,
    pub new_wishlist_id: Uuid,
    pub product_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct WishlistWithProducts {
    #[serde(flatten)]
    pub wishlist: Wishlist,
    pub products: Vec<ProductSummary>,
}

#[derive(Debug, Serialize)]
pub struct MoveProductResponse {
    pub message: String,
    pub duplicate: bool,
}

pub async fn list_wishlists(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Wishlist>>> {
    let wishlists =
        sqlx::query_as::<_, Wishlist>("SELECT * FROM wishlists WHERE user_id = $1 ORDER BY created_at ASC")
            .bind(user.user_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(wishlists))
}

pub async fn create_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateWishlistRequest>,
) -> ApiResult<(StatusCode, Json<Wishlist>)> {
    let wishlist = sqlx::query_as::<_, Wishlist>(
        "INSERT INTO wishlists (id, user_id, name, description) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user.user_id)
    .bind(req.name.trim())
    .bind(&req.description)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("You already have a wishlist with this name.".into())
        } else {
            e.into()
        }
    })?;
    Ok((StatusCode::CREATED, Json(wishlist)))
}

pub async fn get_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wishlist_id): Path<Uuid>,
) -> ApiResult<Json<WishlistWithProducts>> {
    let wishlist: Option<Wishlist> =
        sqlx::query_as("SELECT * FROM wishlists WHERE id = $1 AND user_id = $2")
            .bind(wishlist_id)
            .bind(user.user_id)
            .fetch_optional(&state.db)
            .await?;
    let Some(wishlist) = wishlist else {
        return Err(ApiError::NotFound("Wishlist"));
    };

    let products = sqlx::query_as::<_, ProductSummary>(
        "SELECT p.id, p.title, p.price, p.images, p.stock \
         FROM wishlist_items wi JOIN products p ON p.id = wi.product_id \
         WHERE wi.wishlist_id = $1 ORDER BY wi.added_at DESC",
    )
    .bind(wishlist.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(WishlistWithProducts { wishlist, products }))
}

/// The target must be owned by the caller and must not be their last
/// wishlist; every user keeps at least one.
fn check_wishlist_delete(owned: &[Uuid], target: Uuid) -> Result<(), ApiError> {
    if !owned.contains(&target) {
        return Err(ApiError::NotFound("Wishlist"));
    }
    if owned.len() <= 1 {
        return Err(ApiError::Conflict("Cannot delete your only wishlist.".into()));
    }
    Ok(())
}

pub async fn delete_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(wishlist_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let mut tx = state.db.begin().await?;

    // Lock the user's entire wishlist set, not just the target row, so two
    // concurrent deletes of the last two wishlists serialize and the loser
    // sees a count of one.
    let owned: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM wishlists WHERE user_id = $1 FOR UPDATE")
            .bind(user.user_id)
            .fetch_all(&mut *tx)
            .await?;
    check_wishlist_delete(&owned, wishlist_id)?;

    sqlx::query("DELETE FROM wishlists WHERE id = $1")
        .bind(wishlist_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Adds a product to the caller's oldest wishlist. A repeat add of the
/// same product is a no-op, not a duplicate.
pub async fn add_product(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<AddProductRequest>,
) -> ApiResult<Json<Wishlist>> {
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(req.product_id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(ApiError::NotFound("Product"));
    }

    let mut tx = state.db.begin().await?;

    let oldest: Option<Wishlist> = sqlx::query_as(
        "SELECT * FROM wishlists WHERE user_id = $1 ORDER BY created_at ASC LIMIT 1",
    )
    .bind(user.user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let wishlist = match oldest {
        Some(w) => w,
        None => {
            // Signup seeds a Default wishlist; recreate it if it is gone.
            sqlx::query_as::<_, Wishlist>(
                "INSERT INTO wishlists (id, user_id, name) VALUES ($1, $2, $3) RETURNING *",
            )
            .bind(Uuid::now_v7())
            .bind(user.user_id)
            .bind(DEFAULT_WISHLIST_NAME)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    sqlx::query(
        "INSERT INTO wishlist_items (wishlist_id, product_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(wishlist.id)
    .bind(req.product_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        // The product can vanish between the existence check and the insert.
        if is_foreign_key_violation(&e) {
            ApiError::NotFound("Product")
        } else {
            e.into()
        }
    })?;

    tx.commit().await?;
    Ok(Json(wishlist))
}

/// Moves a product between two of the caller's wishlists: removal from the
/// source must succeed, insertion into the target is skipped when already
/// present, and the caller is told about the duplicate.
pub async fn move_product(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<MoveProductRequest>,
) -> ApiResult<Json<MoveProductResponse>> {
    let mut tx = state.db.begin().await?;

    for id in [req.wishlist_id, req.new_wishlist_id] {
        let owned: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM wishlists WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user.user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if owned.is_none() {
            return Err(ApiError::NotFound("Wishlist"));
        }
    }

    let removed = sqlx::query(
        "DELETE FROM wishlist_items WHERE wishlist_id = $1 AND product_id = $2",
    )
    .bind(req.wishlist_id)
    .bind(req.product_id)
    .execute(&mut *tx)
    .await?;
    if removed.rows_affected() == 0 {
        return Err(ApiError::Validation(
            "Product not found in the source wishlist.".into(),
        ));
    }

    let inserted = sqlx::query(
        "INSERT INTO wishlist_items (wishlist_id, product_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(req.new_wishlist_id)
    .bind(req.product_id)
    .execute(&mut *tx)
    .await?;
    let duplicate = inserted.rows_affected() == 0;

    tx.commit().await?;

    let message = if duplicate {
        "Product moved, but it was already in the target wishlist."
    } else {
        "Product moved to another wishlist successfully."
    };
    Ok(Json(MoveProductResponse {
        message: message.into(),
        duplicate,
    }))
}

pub async fn remove_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path((wishlist_id, product_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let owned: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM wishlists WHERE id = $1 AND user_id = $2")
            .bind(wishlist_id)
            .bind(user.user_id)
            .fetch_optional(&state.db)
            .await?;
    if owned.is_none() {
        return Err(ApiError::NotFound("Wishlist"));
    }

    let removed = sqlx::query(
        "DELETE FROM wishlist_items WHERE wishlist_id = $1 AND product_id = $2",
    )
    .bind(wishlist_id)
    .bind(product_id)
    .execute(&state.db)
    .await?;
    if removed.rows_affected() == 0 {
        return Err(ApiError::NotFound("Product"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_wishlist_cannot_be_deleted() {
        let only = Uuid::now_v7();
        assert!(matches!(
            check_wishlist_delete(&[only], only),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn unowned_wishlist_is_not_found() {
        let owned = [Uuid::now_v7(), Uuid::now_v7()];
        assert!(matches!(
            check_wishlist_delete(&owned, Uuid::now_v7()),
            Err(ApiError::NotFound("Wishlist"))
        ));
    }

    #[test]
    fn delete_is_allowed_when_another_wishlist_remains() {
        let owned = [Uuid::now_v7(), Uuid::now_v7()];
        assert!(check_wishlist_delete(&owned, owned[1]).is_ok());
    }
}
