//! Stock reconciliation.
//!
//! Validates demanded quantities against available stock and applies or
//! reverses decrements. Every adjustment is a single conditional UPDATE so
//! concurrent checkouts can never drive stock observably negative, and both
//! appliers run inside the caller's transaction.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::domain::cart::CartLine;
use crate::domain::order::OrderItem;
use crate::error::StockShortage;

/// Quantity demanded of (or returned to) one product.
#[derive(Clone, Copy, Debug)]
pub struct Demand {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl From<&CartLine> for Demand {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
        }
    }
}

impl From<&OrderItem> for Demand {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
        }
    }
}

/// Returns every line whose requested quantity exceeds the available stock.
/// An empty result means the whole order can be fulfilled; any entry means
/// the whole order is rejected (no partial fulfillment).
pub fn find_shortages(lines: &[CartLine]) -> Vec<StockShortage> {
    lines
        .iter()
        .filter(|line| line.quantity > line.stock)
        .map(|line| StockShortage {
            product_id: line.product_id,
            title: line.title.clone(),
            requested: line.quantity,
            available: line.stock,
        })
        .collect()
}

/// Subtracts each demand from stock, clamped at zero. Products that no
/// longer exist are skipped, never aborting the surrounding workflow.
pub async fn decrement_stock(
    tx: &mut Transaction<'_, Postgres>,
    demands: &[Demand],
) -> sqlx::Result<()> {
    for d in demands {
        sqlx::query("UPDATE products SET stock = GREATEST(stock - $2, 0) WHERE id = $1")
            .bind(d.product_id)
            .bind(d.quantity)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Adds each demand back to stock; used when an order moves to refund.
/// Missing products are skipped, same as [`decrement_stock`].
pub async fn restore_stock(
    tx: &mut Transaction<'_, Postgres>,
    demands: &[Demand],
) -> sqlx::Result<()> {
    for d in demands {
        sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(d.product_id)
            .bind(d.quantity)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(title: &str, quantity: i32, stock: i32) -> CartLine {
        CartLine {
            id: Uuid::now_v7(),
            product_id: Uuid::now_v7(),
            quantity,
            title: title.into(),
            price: Decimal::from(20),
            stock,
            category: "tops".into(),
            images: vec![],
        }
    }

    #[test]
    fn sufficient_stock_yields_no_shortages() {
        let lines = vec![line("a", 2, 5), line("b", 1, 1)];
        assert!(find_shortages(&lines).is_empty());
    }

    #[test]
    fn exact_stock_is_sufficient() {
        let lines = vec![line("a", 3, 3)];
        assert!(find_shortages(&lines).is_empty());
    }

    #[test]
    fn only_insufficient_lines_are_reported() {
        let lines = vec![line("ok", 1, 5), line("short", 3, 1), line("gone", 2, 0)];
        let shortages = find_shortages(&lines);
        assert_eq!(shortages.len(), 2);
        assert_eq!(shortages[0].title, "short");
        assert_eq!(shortages[0].requested, 3);
        assert_eq!(shortages[0].available, 1);
        assert_eq!(shortages[1].title, "gone");
    }
}
