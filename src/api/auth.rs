//! Signup and login. Token issuance is a thin wrapper; the interesting
//! part is that signup also seeds the user's Default wishlist in the same
//! transaction.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, mint_token, verify_password};
use crate::domain::user::User;
use crate::domain::wishlist::DEFAULT_WISHLIST_NAME;
use crate::error::{is_unique_violation, ApiError, ApiResult};
use crate::extract::ValidatedJson;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 50, message = "First name is required."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "Last name is required."))]
    pub last_name: String,
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
}

pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let password_hash = hash_password(&req.password)?;
    let name = format!("{} {}", req.first_name.trim(), req.last_name.trim());

    let mut tx = state.db.begin().await?;

    let user: User = sqlx::query_as(
        "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&name)
    .bind(req.email.trim().to_lowercase())
    .bind(&password_hash)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("An account with this email already exists.".into())
        } else {
            e.into()
        }
    })?;

    // Every user owns at least one wishlist from day one.
    sqlx::query("INSERT INTO wishlists (id, user_id, name) VALUES ($1, $2, $3)")
        .bind(Uuid::now_v7())
        .bind(user.id)
        .bind(DEFAULT_WISHLIST_NAME)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let token = mint_token(&state.config.jwt_secret, user.id, user.role)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully.".into(),
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(req.email.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?;

    let Some(user) = user else {
        return Err(ApiError::Unauthorized);
    };
    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let token = mint_token(&state.config.jwt_secret, user.id, user.role)?;
    Ok(Json(AuthResponse {
        message: "You logged in successfully.".into(),
        token,
    }))
}
