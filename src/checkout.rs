//! Order workflow: cart snapshot, stock reconciliation, payment branching
//! and status transitions.
//!
//! Cash-on-delivery orders commit everything at creation: order persisted,
//! stock decremented and cart cleared in one transaction. Card orders are
//! provisional placeholders until the payment callback confirms them; no
//! stock or cart is touched for a session the buyer abandons.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::domain::cart::CartLine;
use crate::domain::order::{Order, OrderItem, OrderStatus, PaymentMethod};
use crate::error::{ApiError, ApiResult};
use crate::events;
use crate::payments::{CheckoutSession, SessionLine, SessionRequest};
use crate::state::AppState;
use crate::stock::{self, Demand};

/// Flat delivery charge added to every order, in major currency units.
pub const DELIVERY_CHARGE: i64 = 10;

pub fn delivery_charge() -> Decimal {
    Decimal::from(DELIVERY_CHARGE)
}

/// Sum of line totals plus the delivery charge, computed once at order
/// creation from the snapshot prices.
pub fn order_total(lines: &[CartLine]) -> Decimal {
    lines
        .iter()
        .map(|l| l.price * Decimal::from(l.quantity))
        .sum::<Decimal>()
        + delivery_charge()
}

/// Payment-session lines: one per order line at `round(price * 100)` minor
/// units, plus a single delivery-charge line.
pub fn session_lines(lines: &[CartLine]) -> Vec<SessionLine> {
    let mut items: Vec<SessionLine> = lines
        .iter()
        .map(|l| SessionLine {
            name: l.title.clone(),
            unit_amount: (l.price * Decimal::from(100))
                .round()
                .to_i64()
                .unwrap_or(0),
            quantity: i64::from(l.quantity),
        })
        .collect();
    items.push(SessionLine {
        name: "Delivery Charges".into(),
        unit_amount: DELIVERY_CHARGE * 100,
        quantity: 1,
    });
    items
}

/// Success and cancel callback URLs with the order id embedded, so the
/// external redirect can be correlated back to the provisional order.
pub fn callback_urls(origin: &str, order_id: Uuid) -> (String, String) {
    (
        format!("{origin}/api/order/verify-stripe?success=true&orderId={order_id}"),
        format!("{origin}/api/order/verify-stripe?success=false&orderId={order_id}"),
    )
}

#[derive(Debug, Serialize)]
struct OrderEvent {
    order_id: Uuid,
    user_id: Uuid,
    total_amount: Decimal,
    payment_method: PaymentMethod,
}

#[derive(Debug, Serialize)]
struct StatusEvent {
    order_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
}

/// Loads the cart joined with live product data, locking the product rows
/// for the rest of the transaction so validation and decrement see the same
/// stock values.
async fn load_cart_for_update(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> sqlx::Result<Vec<CartLine>> {
    sqlx::query_as::<_, CartLine>(
        "SELECT c.id, c.product_id, c.quantity, p.title, p.price, p.stock, p.category, p.images \
         FROM cart_items c JOIN products p ON p.id = c.product_id \
         WHERE c.user_id = $1 ORDER BY c.created_at DESC FOR UPDATE OF p",
    )
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await
}

async fn user_email(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> ApiResult<String> {
    let email: Option<(String,)> = sqlx::query_as("SELECT email FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
    email.map(|(e,)| e).ok_or(ApiError::NotFound("User"))
}

async fn insert_order(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    address: &str,
    method: PaymentMethod,
    total: Decimal,
) -> sqlx::Result<Order> {
    sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, user_id, address, payment_method, payment, status, total_amount) \
         VALUES ($1, $2, $3, $4, FALSE, 'placed', $5) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(address)
    .bind(method)
    .bind(total)
    .fetch_one(&mut **tx)
    .await
}

async fn insert_order_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    lines: &[CartLine],
) -> sqlx::Result<()> {
    for line in lines {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, quantity, price) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::now_v7())
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.price)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn clear_cart(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn send_order_mail(state: &AppState, email: String, order: &Order) {
    let mailer = state.mailer.clone();
    let body = format!(
        "Your order {} for {} has been received.",
        order.id, order.total_amount
    );
    tokio::spawn(async move {
        mailer.send(&email, "Order confirmation", &body).await;
    });
}

/// Cash-on-delivery checkout. Everything happens in one transaction:
/// either the order row, the stock decrements and the cart clear all
/// commit, or none do.
pub async fn place_order(state: &AppState, user_id: Uuid, address: &str) -> ApiResult<Order> {
    let mut tx = state.db.begin().await?;

    let email = user_email(&mut tx, user_id).await?;
    let lines = load_cart_for_update(&mut tx, user_id).await?;
    if lines.is_empty() {
        return Err(ApiError::Validation("Cart is empty.".into()));
    }

    let shortages = stock::find_shortages(&lines);
    if !shortages.is_empty() {
        return Err(ApiError::OutOfStock(shortages));
    }

    let total = order_total(&lines);
    let order = insert_order(&mut tx, user_id, address, PaymentMethod::Cod, total).await?;
    insert_order_items(&mut tx, order.id, &lines).await?;

    let demands: Vec<Demand> = lines.iter().map(Demand::from).collect();
    stock::decrement_stock(&mut tx, &demands).await?;
    clear_cart(&mut tx, user_id).await?;

    tx.commit().await?;

    events::publish(
        state,
        events::ORDER_PLACED,
        &OrderEvent {
            order_id: order.id,
            user_id,
            total_amount: order.total_amount,
            payment_method: PaymentMethod::Cod,
        },
    );
    send_order_mail(state, email, &order);

    Ok(order)
}

/// Card checkout. The order is persisted as a provisional placeholder and
/// stock stays untouched; the payment callback finishes or discards it.
/// If session creation fails the placeholder is removed again so no
/// unconfirmable order is ever exposed.
pub async fn place_order_card(
    state: &AppState,
    user_id: Uuid,
    address: &str,
) -> ApiResult<CheckoutSession> {
    let mut tx = state.db.begin().await?;

    user_email(&mut tx, user_id).await?;
    let lines = load_cart_for_update(&mut tx, user_id).await?;
    if lines.is_empty() {
        return Err(ApiError::Validation("Cart is empty.".into()));
    }

    let shortages = stock::find_shortages(&lines);
    if !shortages.is_empty() {
        return Err(ApiError::OutOfStock(shortages));
    }

    let total = order_total(&lines);
    let order = insert_order(&mut tx, user_id, address, PaymentMethod::Card, total).await?;
    insert_order_items(&mut tx, order.id, &lines).await?;
    tx.commit().await?;

    let (success_url, cancel_url) = callback_urls(&state.config.public_origin, order.id);
    let session = state
        .payments
        .create_checkout_session(SessionRequest {
            line_items: session_lines(&lines),
            success_url,
            cancel_url,
        })
        .await;

    match session {
        Ok(session) => Ok(session),
        Err(err) => {
            // The placeholder must not outlive a failed session.
            sqlx::query("DELETE FROM orders WHERE id = $1 AND payment = FALSE")
                .bind(order.id)
                .execute(&state.db)
                .await?;
            Err(ApiError::Gateway(err))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentVerification {
    /// This call confirmed the payment and committed stock and cart.
    Confirmed,
    /// A previous call already confirmed it; nothing was changed.
    AlreadyConfirmed,
    /// The buyer cancelled; the provisional order was deleted.
    Cancelled,
}

/// What the cancel callback should do, decided from the order's persisted
/// `(payment, payment_method)` state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CancelAction {
    /// Delete the provisional order.
    Delete,
    /// Unknown or already discarded; cancellation is idempotent.
    AlreadyGone,
}

fn classify_cancel(order: Option<(bool, PaymentMethod)>) -> ApiResult<CancelAction> {
    match order {
        None => Ok(CancelAction::AlreadyGone),
        Some((_, PaymentMethod::Cod)) => Err(ApiError::Conflict(
            "Order is not a card-payment order.".into(),
        )),
        Some((true, PaymentMethod::Card)) => Err(ApiError::Conflict(
            "Order is already paid and cannot be cancelled.".into(),
        )),
        Some((false, PaymentMethod::Card)) => Ok(CancelAction::Delete),
    }
}

/// Outcome for a success callback that lost the conditional UPDATE, again
/// from the persisted `(payment, payment_method)` state. Confirmed card
/// orders are acknowledged without any side effect; everything else is
/// rejected.
fn classify_unconfirmed(order: Option<(bool, PaymentMethod)>) -> ApiResult<PaymentVerification> {
    match order {
        Some((true, PaymentMethod::Card)) => Ok(PaymentVerification::AlreadyConfirmed),
        Some((_, PaymentMethod::Cod)) => Err(ApiError::Conflict(
            "Order is not a card-payment order.".into(),
        )),
        _ => Err(ApiError::NotFound("Order")),
    }
}

/// Payment result callback. The conditional UPDATE on `payment = FALSE AND
/// payment_method = 'card'` is the idempotency guard: only the request that
/// flips the flag applies the stock decrement and cart clear, so repeated
/// success callbacks cannot double-decrement. Cash-on-delivery orders never
/// match the guard (their stock was committed at creation), so a callback
/// naming a COD id can neither re-decrement nor delete it.
pub async fn verify_payment(
    state: &AppState,
    order_id: Uuid,
    success: bool,
) -> ApiResult<PaymentVerification> {
    if !success {
        let order: Option<(bool, PaymentMethod)> =
            sqlx::query_as("SELECT payment, payment_method FROM orders WHERE id = $1")
                .bind(order_id)
                .fetch_optional(&state.db)
                .await?;
        if classify_cancel(order)? == CancelAction::Delete {
            sqlx::query(
                "DELETE FROM orders WHERE id = $1 AND payment = FALSE \
                 AND payment_method = 'card'",
            )
            .bind(order_id)
            .execute(&state.db)
            .await?;
        }
        return Ok(PaymentVerification::Cancelled);
    }

    let mut tx = state.db.begin().await?;

    let order: Option<Order> = sqlx::query_as(
        "UPDATE orders SET payment = TRUE, status = 'processing' \
         WHERE id = $1 AND payment = FALSE AND payment_method = 'card' RETURNING *",
    )
    .bind(order_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(order) = order else {
        let current: Option<(bool, PaymentMethod)> =
            sqlx::query_as("SELECT payment, payment_method FROM orders WHERE id = $1")
                .bind(order_id)
                .fetch_optional(&state.db)
                .await?;
        return classify_unconfirmed(current);
    };

    let items: Vec<OrderItem> =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1")
            .bind(order.id)
            .fetch_all(&mut *tx)
            .await?;
    let demands: Vec<Demand> = items.iter().map(Demand::from).collect();
    stock::decrement_stock(&mut tx, &demands).await?;
    clear_cart(&mut tx, order.user_id).await?;

    tx.commit().await?;

    events::publish(
        state,
        events::ORDER_PAID,
        &OrderEvent {
            order_id: order.id,
            user_id: order.user_id,
            total_amount: order.total_amount,
            payment_method: order.payment_method,
        },
    );

    Ok(PaymentVerification::Confirmed)
}

/// Gate for admin status changes: rejects disallowed transitions and says
/// whether stock must be restored. Restoration happens exactly when an
/// order moves into `refund`; `refund` itself has no outgoing transitions,
/// so a refunded order can never be restored twice.
fn restock_on_transition(from: OrderStatus, to: OrderStatus) -> ApiResult<bool> {
    if !from.can_transition(to) {
        return Err(ApiError::Conflict(format!(
            "Cannot change order status from {from} to {to}."
        )));
    }
    Ok(to == OrderStatus::Refund)
}

/// Admin status change, gated by the transition table. A move to `refund`
/// restores stock for every line in the same transaction as the status
/// write.
pub async fn update_status(
    state: &AppState,
    order_id: Uuid,
    next: OrderStatus,
) -> ApiResult<Order> {
    let mut tx = state.db.begin().await?;

    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(order) = order else {
        return Err(ApiError::NotFound("Order"));
    };

    if restock_on_transition(order.status, next)? {
        let items: Vec<OrderItem> =
            sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1")
                .bind(order.id)
                .fetch_all(&mut *tx)
                .await?;
        let demands: Vec<Demand> = items.iter().map(Demand::from).collect();
        stock::restore_stock(&mut tx, &demands).await?;
    }

    let updated: Order =
        sqlx::query_as("UPDATE orders SET status = $2 WHERE id = $1 RETURNING *")
            .bind(order.id)
            .bind(next)
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;

    events::publish(
        state,
        events::ORDER_STATUS_CHANGED,
        &StatusEvent {
            order_id: order.id,
            from: order.status,
            to: next,
        },
    );

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(title: &str, price: Decimal, quantity: i32, stock: i32) -> CartLine {
        CartLine {
            id: Uuid::now_v7(),
            product_id: Uuid::now_v7(),
            quantity,
            title: title.into(),
            price,
            stock,
            category: "tops".into(),
            images: vec![],
        }
    }

    #[test]
    fn total_is_line_sum_plus_delivery() {
        // 2 x 20 + 10 delivery = 50
        let lines = vec![line("a", Decimal::from(20), 2, 5)];
        assert_eq!(order_total(&lines), Decimal::from(50));
    }

    #[test]
    fn total_over_multiple_lines() {
        let lines = vec![
            line("a", Decimal::new(1999, 2), 3, 10), // 59.97
            line("b", Decimal::from(5), 1, 10),      // 5.00
        ];
        assert_eq!(order_total(&lines), Decimal::new(7497, 2));
    }

    #[test]
    fn session_lines_use_minor_units_and_append_delivery() {
        let lines = vec![line("Linen Shirt", Decimal::new(1999, 2), 2, 5)];
        let items = session_lines(&lines);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Linen Shirt");
        assert_eq!(items[0].unit_amount, 1999);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].name, "Delivery Charges");
        assert_eq!(items[1].unit_amount, DELIVERY_CHARGE * 100);
        assert_eq!(items[1].quantity, 1);
    }

    #[test]
    fn session_line_amounts_are_rounded() {
        // 10.005 rounds to 1000 minor units (banker's rounding on the half)
        let lines = vec![line("a", Decimal::new(10005, 3), 1, 5)];
        let items = session_lines(&lines);
        assert_eq!(items[0].unit_amount, 1000);
    }

    #[test]
    fn repeated_success_callback_is_acknowledged_without_side_effects() {
        // The first callback wins the conditional UPDATE and leaves the
        // order at (payment = TRUE, card); a repeat must only acknowledge.
        let outcome = classify_unconfirmed(Some((true, PaymentMethod::Card)));
        assert_eq!(outcome.unwrap(), PaymentVerification::AlreadyConfirmed);
    }

    #[test]
    fn success_callback_rejects_cod_orders() {
        // COD stock is committed at creation; confirming one again would
        // decrement it a second time.
        assert!(matches!(
            classify_unconfirmed(Some((false, PaymentMethod::Cod))),
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            classify_unconfirmed(Some((true, PaymentMethod::Cod))),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn success_callback_on_unknown_order_is_not_found() {
        assert!(matches!(
            classify_unconfirmed(None),
            Err(ApiError::NotFound("Order"))
        ));
    }

    #[test]
    fn cancel_callback_only_deletes_unpaid_card_orders() {
        assert_eq!(
            classify_cancel(Some((false, PaymentMethod::Card))).unwrap(),
            CancelAction::Delete
        );
        assert_eq!(classify_cancel(None).unwrap(), CancelAction::AlreadyGone);
        assert!(matches!(
            classify_cancel(Some((true, PaymentMethod::Card))),
            Err(ApiError::Conflict(_))
        ));
        // A COD order's stock was already taken; deleting it would lose it.
        assert!(matches!(
            classify_cancel(Some((false, PaymentMethod::Cod))),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn stock_is_restored_exactly_on_refund() {
        assert!(restock_on_transition(OrderStatus::Delivered, OrderStatus::Refund).unwrap());
        assert!(restock_on_transition(OrderStatus::Placed, OrderStatus::Refund).unwrap());
        assert!(!restock_on_transition(OrderStatus::Placed, OrderStatus::Processing).unwrap());
        assert!(!restock_on_transition(OrderStatus::Shipped, OrderStatus::Delivered).unwrap());
    }

    #[test]
    fn refund_is_terminal_so_restoration_cannot_repeat() {
        for next in [
            OrderStatus::Placed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refund,
        ] {
            assert!(restock_on_transition(OrderStatus::Refund, next).is_err());
        }
    }

    #[test]
    fn callback_urls_embed_order_id() {
        let id = Uuid::now_v7();
        let (success, cancel) = callback_urls("https://shop.example", id);
        assert_eq!(
            success,
            format!("https://shop.example/api/order/verify-stripe?success=true&orderId={id}")
        );
        assert_eq!(
            cancel,
            format!("https://shop.example/api/order/verify-stripe?success=false&orderId={id}")
        );
    }
}
