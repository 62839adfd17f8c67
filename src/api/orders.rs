//! Order endpoints: checkout entry points, payment callback, listings and
//! the admin status transition. The workflow itself lives in `checkout`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::PaginatedResponse;
use crate::auth::{AdminUser, AuthUser};
use crate::checkout::{self, PaymentVerification};
use crate::domain::order::{Order, OrderItem, OrderStatus};
use crate::error::ApiResult;
use crate::extract::ValidatedJson;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[validate(length(min = 10, max = 500, message = "Address must be between 10-500 characters."))]
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct OrderPlacedResponse {
    pub message: String,
    pub order_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub session_url: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "orderId")]
    pub order_id: Uuid,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

pub async fn place_order(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<PlaceOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderPlacedResponse>)> {
    let order = checkout::place_order(&state, user.user_id, req.address.trim()).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderPlacedResponse {
            message: "Order placed successfully.".into(),
            order_id: order.id,
        }),
    ))
}

pub async fn place_order_stripe(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<PlaceOrderRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let session = checkout::place_order_card(&state, user.user_id, req.address.trim()).await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            message: "Payment session created.".into(),
            session_url: session.url,
        }),
    ))
}

pub async fn verify_stripe(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> ApiResult<Response> {
    let outcome = checkout::verify_payment(&state, params.order_id, params.success).await?;
    Ok(match outcome {
        PaymentVerification::Confirmed | PaymentVerification::AlreadyConfirmed => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "Payment successful.",
                "orderId": params.order_id,
            })),
        )
            .into_response(),
        PaymentVerification::Cancelled => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn attach_items(
    db: &sqlx::PgPool,
    orders: Vec<Order>,
) -> sqlx::Result<Vec<OrderWithItems>> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items: Vec<OrderItem> =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = ANY($1)")
            .bind(&ids)
            .fetch_all(db)
            .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderWithItems { order, items }
        })
        .collect())
}

pub async fn user_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<OrderListParams>,
) -> ApiResult<Json<PaginatedResponse<OrderWithItems>>> {
    let pagination = super::Pagination {
        page: params.page,
        limit: params.limit,
    };
    let (page, limit, offset) = pagination.window();

    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 AND ($2::order_status IS NULL OR status = $2) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(user.user_id)
    .bind(params.status)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    let total: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders WHERE user_id = $1 AND ($2::order_status IS NULL OR status = $2)",
    )
    .bind(user.user_id)
    .bind(params.status)
    .fetch_one(&state.db)
    .await?;

    let data = attach_items(&state.db, orders).await?;
    Ok(Json(PaginatedResponse {
        data,
        total: total.0,
        page,
    }))
}

pub async fn admin_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<OrderListParams>,
) -> ApiResult<Json<PaginatedResponse<OrderWithItems>>> {
    let pagination = super::Pagination {
        page: params.page,
        limit: params.limit,
    };
    let (page, limit, offset) = pagination.window();

    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE ($1::order_status IS NULL OR status = $1) \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(params.status)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    let total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)")
            .bind(params.status)
            .fetch_one(&state.db)
            .await?;

    let data = attach_items(&state.db, orders).await?;
    Ok(Json(PaginatedResponse {
        data,
        total: total.0,
        page,
    }))
}

pub async fn update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(order_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateStatusRequest>,
) -> ApiResult<Json<Order>> {
    let order = checkout::update_status(&state, order_id, req.status).await?;
    Ok(Json(order))
}
