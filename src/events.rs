//! Order lifecycle events over NATS, published fire-and-forget when a
//! client is configured.

use serde::Serialize;

use crate::state::AppState;

pub const ORDER_PLACED: &str = "orders.placed";
pub const ORDER_PAID: &str = "orders.paid";
pub const ORDER_STATUS_CHANGED: &str = "orders.status_changed";

pub fn publish<T: Serialize>(state: &AppState, subject: &'static str, payload: &T) {
    let Some(client) = state.nats.clone() else {
        return;
    };
    let Ok(bytes) = serde_json::to_vec(payload) else {
        return;
    };
    tokio::spawn(async move {
        if let Err(err) = client.publish(subject.to_string(), bytes.into()).await {
            tracing::warn!(error = %err, subject, "failed to publish event");
        }
    });
}
