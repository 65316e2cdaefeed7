use tracing::info;

use crate::aggregate::{
    brand_by_date, brand_identifier_summary, manager_brand_identifier_summary, manager_by_date,
};
use crate::config::SchemaMapping;
use crate::enrich::enrich;
use crate::error::ReportError;
use crate::filter::filter_orders;
use crate::metrics::compute_metrics;
use crate::model::{Report, RunStats};
use crate::normalize::normalize_table;
use crate::reference::resolve_reference;
use crate::table::RawTable;

/// Run one full pass: normalize, resolve the product master, enrich, filter,
/// aggregate. Either every view is produced or the first stage error is
/// returned.
pub fn generate(
    orders: &RawTable,
    products: &RawTable,
    mapping: &SchemaMapping,
) -> Result<Report, ReportError> {
    mapping.validate()?;
    let mapping = mapping.normalized();

    let orders = normalize_table(orders, &mapping.orders.identifier);
    let products = normalize_table(products, &mapping.reference.identifier);
    info!(orders = orders.len(), products = products.len(), "inputs normalized");

    let reference = resolve_reference(&products, &mapping.reference, mapping.enrich.vendor_code)?;
    info!(
        unique = reference.stats.unique,
        duplicates = reference.stats.duplicates,
        "product master resolved"
    );

    let (enriched, enrich_stats) = enrich(&orders, &reference, &mapping.orders)?;
    info!(
        rows = enriched.len(),
        unmatched = enrich_stats.unmatched,
        "orders enriched"
    );

    let (processed, filter_stats) = filter_orders(&enriched);
    info!(
        kept = filter_stats.kept,
        dropped = filter_stats.dropped(),
        "orders filtered"
    );

    let report = Report {
        identifier_label: mapping.orders.identifier.clone(),
        price_label: mapping.orders.unit_price.clone(),
        manager_by_date: manager_by_date(processed.records()),
        brand_by_date: brand_by_date(processed.records()),
        brand_identifier: brand_identifier_summary(processed.records()),
        manager_brand_identifier: manager_brand_identifier_summary(processed.records()),
        metrics: compute_metrics(processed.records()),
        stats: RunStats {
            orders_loaded: orders.len(),
            reference: reference.stats.clone(),
            reference_columns: reference.columns.clone(),
            unmatched_orders: enrich_stats.unmatched,
            numeric_coercions: enrich_stats.numeric_coercions,
            filter: filter_stats,
        },
        processed,
    };
    info!(
        orders = report.metrics.total_orders,
        revenue = report.metrics.total_revenue,
        "views aggregated"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceKind;
    use crate::table::load_delimited;

    const PM: &str = "ASIN,Brand Manager,Brand,Vendor SKU,CP\nA1,Jo,Acme,V1,40\n";

    #[test]
    fn single_order_end_to_end() {
        let orders = load_delimited(
            SourceKind::Orders,
            "asin,quantity,item-price,item-status,product-name,purchase-date\n A1 ,2,100,Shipped,Widget,2024-01-01\n",
            b',',
        )
        .unwrap();
        let pm = load_delimited(SourceKind::Reference, PM, b',').unwrap();
        let report = generate(&orders, &pm, &SchemaMapping::default()).unwrap();

        assert_eq!(report.processed.len(), 1);
        let grand = report.manager_by_date.rows.last().unwrap().total();
        assert_eq!(grand.quantity, 2.0);
        assert_eq!(grand.revenue, 200.0);
        assert_eq!(report.stats.orders_loaded, 1);
        assert_eq!(report.stats.filter.kept, 1);
        assert_eq!(report.metrics.top_brand.as_deref(), Some("Acme"));

        let stats = serde_json::to_value(&report.stats).unwrap();
        assert_eq!(stats["filter"]["kept"], 1);
        assert_eq!(stats["reference_columns"][0]["attribute"], "brand");
        assert_eq!(stats["reference_columns"][0]["source"], "name");
    }

    fn run(orders_csv: &str) -> Report {
        let orders = load_delimited(SourceKind::Orders, orders_csv, b',').unwrap();
        let pm = load_delimited(SourceKind::Reference, PM, b',').unwrap();
        generate(&orders, &pm, &SchemaMapping::default()).unwrap()
    }

    #[test]
    fn fractional_quantities_kept_and_summed_exactly() {
        let report = run(
            "asin,quantity,item-price,item-status,product-name,purchase-date\n\
             A1,0.4,100,Shipped,Widget,2024-01-01\n\
             A1,1.5,100,Shipped,Widget,2024-01-01\n",
        );

        assert_eq!(report.stats.filter.kept, 2);
        assert_eq!(report.stats.numeric_coercions, 0);
        let grand = report.manager_by_date.rows.last().unwrap().total();
        assert!((grand.quantity - 1.9).abs() < 1e-9, "{}", grand.quantity);
        assert!((grand.revenue - 190.0).abs() < 1e-9, "{}", grand.revenue);
        assert!((report.metrics.total_quantity - 1.9).abs() < 1e-9);
    }

    #[test]
    fn huge_quantities_do_not_abort_the_run() {
        let report = run(
            "asin,quantity,item-price,item-status,product-name,purchase-date\n\
             A1,9223372036854775807,1,Shipped,Widget,2024-01-01\n\
             A1,9223372036854775807,1,Shipped,Widget,2024-01-01\n",
        );

        let expected = 2.0 * 9223372036854775807_f64;
        assert_eq!(report.metrics.total_quantity, expected);
        let nested = report.manager_brand_identifier.grand_total().unwrap();
        assert_eq!(nested.measures.quantity, expected);
    }

    #[test]
    fn invalid_mapping_fails_before_loading() {
        let mut mapping = SchemaMapping::default();
        mapping.orders.status = "quantity".into();
        let empty = RawTable::default();
        let err = generate(&empty, &empty, &mapping).unwrap_err();
        assert!(matches!(err, ReportError::ConfigValidation(_)), "{err}");
    }

    #[test]
    fn missing_reference_column_aborts() {
        let orders = load_delimited(
            SourceKind::Orders,
            "asin,quantity,item-price,item-status,product-name,purchase-date\n",
            b',',
        )
        .unwrap();
        let pm = load_delimited(SourceKind::Reference, "sku,brand\nA1,Acme\n", b',').unwrap();
        let err = generate(&orders, &pm, &SchemaMapping::default()).unwrap_err();
        assert!(
            matches!(err, ReportError::RequiredColumnMissing { input: SourceKind::Reference, .. }),
            "{err}"
        );
    }
}
