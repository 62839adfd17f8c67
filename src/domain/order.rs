//! Order rows and the status state machine.
//!
//! The status field is a real finite state machine, not an ad hoc string:
//! every write goes through [`OrderStatus::can_transition`] first.
//! `refund` is reachable from every other state (it is the only exit from
//! `delivered` and `cancelled`) and triggers stock restoration.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery: stock committed at order creation.
    Cod,
    /// External card payment: stock committed at payment confirmation.
    Card,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Placed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refund,
}

impl OrderStatus {
    /// Exhaustive transition table.
    ///
    /// Forward chain `placed -> processing -> shipped -> delivered`,
    /// cancellation from any pre-delivery state, refund from anywhere.
    /// `refund` itself is terminal.
    pub fn can_transition(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Refund, _) => false,
            (_, Refund) => true,
            (Placed, Processing) | (Processing, Shipped) | (Shipped, Delivered) => true,
            (Placed | Processing | Shipped, Cancelled) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Placed => "placed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refund => "refund",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address: String,
    pub payment_method: PaymentMethod,
    pub payment: bool,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of a cart line taken at order creation. `price` is the price
/// at purchase and never tracks the live catalog.
#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;

    #[test]
    fn forward_chain_is_allowed() {
        assert!(Placed.can_transition(Processing));
        assert!(Processing.can_transition(Shipped));
        assert!(Shipped.can_transition(Delivered));
    }

    #[test]
    fn skipping_forward_states_is_rejected() {
        assert!(!Placed.can_transition(Shipped));
        assert!(!Placed.can_transition(Delivered));
        assert!(!Processing.can_transition(Delivered));
    }

    #[test]
    fn cancellation_only_before_delivery() {
        assert!(Placed.can_transition(Cancelled));
        assert!(Processing.can_transition(Cancelled));
        assert!(Shipped.can_transition(Cancelled));
        assert!(!Delivered.can_transition(Cancelled));
        assert!(!Cancelled.can_transition(Cancelled));
    }

    #[test]
    fn refund_is_the_only_exit_from_terminal_states() {
        assert!(Delivered.can_transition(Refund));
        assert!(Cancelled.can_transition(Refund));
        assert!(!Delivered.can_transition(Processing));
        assert!(!Cancelled.can_transition(Placed));
        assert!(!Delivered.can_transition(Shipped));
    }

    #[test]
    fn refund_is_terminal() {
        for next in [Placed, Processing, Shipped, Delivered, Cancelled, Refund] {
            assert!(!Refund.can_transition(next));
        }
    }

    #[test]
    fn no_self_transitions() {
        for s in [Placed, Processing, Shipped, Delivered, Cancelled] {
            assert!(!s.can_transition(s));
        }
    }
}
