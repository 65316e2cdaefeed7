use std::collections::BTreeMap;

use crate::aggregate::revenue;
use crate::model::{Metrics, OrderRecord};

/// Headline figures over the filtered order set.
pub fn compute_metrics<'a, I>(records: I) -> Metrics
where
    I: IntoIterator<Item = &'a OrderRecord>,
{
    let mut metrics = Metrics::default();
    let mut by_brand: BTreeMap<&str, f64> = BTreeMap::new();
    let mut by_manager: BTreeMap<&str, f64> = BTreeMap::new();

    for record in records {
        let line = revenue(record);
        metrics.total_orders += 1;
        metrics.total_quantity += record.quantity;
        metrics.total_revenue += line;
        if let Some(brand) = record.brand.as_deref() {
            *by_brand.entry(brand).or_default() += line;
        }
        if let Some(manager) = record.brand_manager.as_deref() {
            *by_manager.entry(manager).or_default() += line;
        }
    }

    metrics.top_brand = top(&by_brand);
    metrics.top_brand_manager = top(&by_manager);
    metrics
}

/// Key with the largest revenue; ties keep the first key in ascending order.
fn top(groups: &BTreeMap<&str, f64>) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;
    for (&key, &value) in groups {
        match best {
            Some((_, v)) if value <= v => {}
            _ => best = Some((key, value)),
        }
    }
    best.map(|(k, _)| k.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(brand: Option<&str>, manager: Option<&str>, qty: i64, price: f64) -> OrderRecord {
        OrderRecord {
            identifier: "X".into(),
            quantity: qty as f64,
            unit_price: price,
            status: "Shipped".into(),
            product_name: Some("W".into()),
            purchase_timestamp: None,
            calendar_date: None,
            brand: brand.map(String::from),
            brand_manager: manager.map(String::from),
            vendor_code: None,
            unit_cost: 0.0,
        }
    }

    #[test]
    fn totals_and_leaders() {
        let records = vec![
            rec(Some("Acme"), Some("Jo"), 2, 100.0),
            rec(Some("Beetel"), Some("Sam"), 1, 150.0),
            rec(Some("Beetel"), Some("Sam"), 1, 10.0),
            rec(None, None, 10, 100.0),
        ];
        let m = compute_metrics(&records);
        assert_eq!(m.total_orders, 4);
        assert_eq!(m.total_quantity, 14.0);
        assert_eq!(m.total_revenue, 1360.0);
        // the null group is larger but never a leader
        assert_eq!(m.top_brand.as_deref(), Some("Acme"));
        assert_eq!(m.top_brand_manager.as_deref(), Some("Jo"));
    }

    #[test]
    fn ties_go_to_first_key() {
        let records = vec![
            rec(Some("Zeta"), Some("Zed"), 1, 50.0),
            rec(Some("Alpha"), Some("Amy"), 1, 50.0),
        ];
        let m = compute_metrics(&records);
        assert_eq!(m.top_brand.as_deref(), Some("Alpha"));
        assert_eq!(m.top_brand_manager.as_deref(), Some("Amy"));
    }

    #[test]
    fn empty_set() {
        let m = compute_metrics(std::iter::empty());
        assert_eq!(m, Metrics::default());
    }
}
