use serde::Serialize;
use tracing::debug;

use crate::model::{EnrichedOrders, OrderRecord};

/// Status value that marks an order as not actionable. Exact, case-sensitive.
pub const CANCELLED_STATUS: &str = "Cancelled";

/// Why a row was dropped. Each dropped row is counted once, under the first
/// failing rule in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    ZeroQuantity,
    ZeroPrice,
    BlankProductName,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub input: usize,
    pub kept: usize,
    pub zero_quantity: usize,
    pub zero_price: usize,
    pub blank_product_name: usize,
    pub cancelled: usize,
}

impl FilterStats {
    pub fn dropped(&self) -> usize {
        self.input - self.kept
    }
}

/// First rule `record` fails, or `None` when the row is kept.
pub fn rejection(record: &OrderRecord) -> Option<Rejection> {
    if record.quantity == 0.0 {
        return Some(Rejection::ZeroQuantity);
    }
    // NaN compares unequal to everything, so test for a usable price instead
    if record.unit_price.is_nan() || record.unit_price == 0.0 {
        return Some(Rejection::ZeroPrice);
    }
    match record.product_name.as_deref().map(str::trim) {
        None | Some("") | Some("-") => return Some(Rejection::BlankProductName),
        Some(_) => {}
    }
    if record.status == CANCELLED_STATUS {
        return Some(Rejection::Cancelled);
    }
    None
}

/// Keep only actionable orders. Surviving rows are copied unchanged.
pub fn filter_orders(orders: &EnrichedOrders) -> (EnrichedOrders, FilterStats) {
    let mut stats = FilterStats {
        input: orders.len(),
        ..Default::default()
    };

    let rows = orders
        .rows
        .iter()
        .filter(|row| match rejection(&row.record) {
            None => true,
            Some(reason) => {
                match reason {
                    Rejection::ZeroQuantity => stats.zero_quantity += 1,
                    Rejection::ZeroPrice => stats.zero_price += 1,
                    Rejection::BlankProductName => stats.blank_product_name += 1,
                    Rejection::Cancelled => stats.cancelled += 1,
                }
                false
            }
        })
        .cloned()
        .collect::<Vec<_>>();

    stats.kept = rows.len();
    debug!(kept = stats.kept, dropped = stats.dropped(), "orders filtered");

    (
        EnrichedOrders {
            columns: orders.columns.clone(),
            rows,
        },
        stats,
    )
}
