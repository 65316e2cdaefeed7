//! Order enrichment: VLOOKUP-style attribute mapping and output schema layout.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::config::OrderColumns;
use crate::error::{ReportError, SourceKind};
use crate::model::{EnrichedOrders, EnrichedRow, OrderRecord};
use crate::reference::ReferenceIndex;
use crate::table::RawTable;
use crate::value::{excel_serial_to_datetime, Value};

pub const DATE_LABEL: &str = "date";
pub const BRAND_MANAGER_LABEL: &str = "Brand Manager";
pub const BRAND_LABEL: &str = "Brand";
pub const VENDOR_CODE_LABEL: &str = "Vendor SKU";
pub const COST_LABEL: &str = "cost";

/// Order columns always exported as text, whatever the reader inferred.
const TEXT_COLUMNS: &[&str] = &["sku"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub unmatched: usize,
    pub numeric_coercions: usize,
}

/// Column positions of the six required order attributes.
struct OrderLayout {
    identifier: usize,
    quantity: usize,
    unit_price: usize,
    status: usize,
    product_name: usize,
    purchase_timestamp: usize,
}

impl OrderLayout {
    fn resolve(table: &RawTable, columns: &OrderColumns) -> Result<Self, ReportError> {
        let idx = |attribute: &str, name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| ReportError::missing(SourceKind::Orders, attribute))
        };
        Ok(Self {
            identifier: idx("identifier", &columns.identifier)?,
            quantity: idx("quantity", &columns.quantity)?,
            unit_price: idx("unit-price", &columns.unit_price)?,
            status: idx("status", &columns.status)?,
            product_name: idx("product-name", &columns.product_name)?,
            purchase_timestamp: idx("purchase-timestamp", &columns.purchase_timestamp)?,
        })
    }
}

/// Parse a purchase timestamp cell. `Ok(None)` for blank cells.
pub(crate) fn parse_timestamp(value: &Value) -> Result<Option<NaiveDateTime>, ()> {
    match value {
        Value::Empty => Ok(None),
        Value::DateTime(dt) => Ok(Some(*dt)),
        Value::Date(d) => Ok(d.and_hms_opt(0, 0, 0)),
        Value::Number(n) => excel_serial_to_datetime(*n).map(Some).ok_or(()),
        Value::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(Some(dt.naive_local()));
            }
            for fmt in OFFSET_FORMATS {
                if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                    return Ok(Some(dt.naive_local()));
                }
            }
            for fmt in DATETIME_FORMATS {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Ok(Some(dt));
                }
            }
            for fmt in DATE_FORMATS {
                if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                    return Ok(d.and_hms_opt(0, 0, 0));
                }
            }
            Err(())
        }
    }
}

/// Write `label` into the output schema: replace an existing column of that
/// name in place, otherwise append. Returns the column position.
fn set_column(columns: &mut Vec<String>, label: &str) -> usize {
    match columns.iter().position(|c| c == label) {
        Some(i) => i,
        None => {
            columns.push(label.to_string());
            columns.len() - 1
        }
    }
}

/// Move `item` so it immediately follows `anchor` in `order`.
fn move_after(order: &mut Vec<usize>, item: usize, anchor: usize) {
    if item == anchor {
        return;
    }
    if let Some(from) = order.iter().position(|&c| c == item) {
        order.remove(from);
    }
    let to = order
        .iter()
        .position(|&c| c == anchor)
        .map(|p| p + 1)
        .unwrap_or(order.len());
    order.insert(to, item);
}

/// Join every order with its product-master attributes.
///
/// Left-join semantics: identifiers missing from the reference keep the row
/// with null brand, brand manager and vendor code, and a zero cost.
pub fn enrich(
    orders: &RawTable,
    reference: &ReferenceIndex,
    columns: &OrderColumns,
) -> Result<(EnrichedOrders, EnrichStats), ReportError> {
    let layout = OrderLayout::resolve(orders, columns)?;
    let mut stats = EnrichStats::default();

    let mut schema = orders.headers.clone();
    let date_col = set_column(&mut schema, DATE_LABEL);
    let manager_col = set_column(&mut schema, BRAND_MANAGER_LABEL);
    let brand_col = set_column(&mut schema, BRAND_LABEL);
    let vendor_col = reference
        .vendor_code
        .as_ref()
        .map(|_| set_column(&mut schema, VENDOR_CODE_LABEL));
    let cost_col = set_column(&mut schema, COST_LABEL);
    let text_cols: Vec<usize> = schema
        .iter()
        .enumerate()
        .filter(|(_, c)| TEXT_COLUMNS.contains(&c.as_str()))
        .map(|(i, _)| i)
        .collect();

    // Output field order: cost after unit price, vendor code after identifier
    let mut order: Vec<usize> = (0..schema.len()).collect();
    move_after(&mut order, cost_col, layout.unit_price);
    if let Some(vendor_col) = vendor_col {
        move_after(&mut order, vendor_col, layout.identifier);
    }

    let mut rows = Vec::with_capacity(orders.len());
    for (r, source_row) in orders.rows.iter().enumerate() {
        let cell = |c: usize| orders.cell(r, c);

        let identifier = cell(layout.identifier).to_text();
        let quantity = match cell(layout.quantity).coerce_number() {
            Some(q) => q,
            None => {
                stats.numeric_coercions += 1;
                0.0
            }
        };
        let unit_price = cell(layout.unit_price).coerce_number().unwrap_or_else(|| {
            stats.numeric_coercions += 1;
            f64::NAN
        });

        let raw_ts = cell(layout.purchase_timestamp);
        let purchase_timestamp = parse_timestamp(raw_ts).map_err(|_| ReportError::InvalidTimestamp {
            row: r + 2,
            value: raw_ts.to_text(),
        })?;

        let product_name = match cell(layout.product_name) {
            Value::Empty => None,
            v => Some(v.to_text()),
        };

        let matched = reference.contains(&identifier);
        if !matched {
            stats.unmatched += 1;
        }
        let brand = reference.brand.get(&identifier).and_then(Value::non_blank_text);
        let brand_manager = reference
            .brand_manager
            .get(&identifier)
            .and_then(Value::non_blank_text);
        let vendor_code = reference
            .vendor_code
            .as_ref()
            .and_then(|m| m.get(&identifier))
            .and_then(Value::non_blank_text);
        let unit_cost = match reference.unit_cost.get(&identifier) {
            Some(v) => v.coerce_number().unwrap_or_else(|| {
                if !v.is_empty() {
                    debug!(identifier = %identifier, value = %v.to_text(), "unit cost is not numeric; using 0");
                }
                stats.numeric_coercions += 1;
                0.0
            }),
            None => 0.0,
        };

        let record = OrderRecord {
            identifier,
            quantity,
            unit_price,
            status: cell(layout.status).to_text(),
            product_name,
            purchase_timestamp,
            calendar_date: purchase_timestamp.map(|ts| ts.date()),
            brand,
            brand_manager,
            vendor_code,
            unit_cost,
        };

        let mut cells: Vec<Value> = source_row.clone();
        cells.resize(schema.len(), Value::Empty);
        cells[layout.unit_price] = Value::Number(record.unit_price);
        cells[date_col] = record.calendar_date.map(Value::Date).unwrap_or_default();
        cells[manager_col] = record.brand_manager.clone().into();
        cells[brand_col] = record.brand.clone().into();
        if let Some(vendor_col) = vendor_col {
            cells[vendor_col] = record.vendor_code.clone().into();
        }
        cells[cost_col] = Value::Number(record.unit_cost);
        for &c in &text_cols {
            if let Value::Number(_) = cells[c] {
                cells[c] = Value::Text(cells[c].to_text());
            }
        }

        let cells = order.iter().map(|&c| std::mem::take(&mut cells[c])).collect();
        rows.push(EnrichedRow { record, cells });
    }

    let columns = order.iter().map(|&c| schema[c].clone()).collect();

    debug!(
        rows = rows.len(),
        unmatched = stats.unmatched,
        coercions = stats.numeric_coercions,
        "orders enriched"
    );

    Ok((EnrichedOrders { columns, rows }, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferenceColumns;
    use crate::reference::resolve_reference;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| Value::text(*c)).collect())
                .collect(),
        )
    }

    fn reference(vendor: bool) -> ReferenceIndex {
        let pm = table(
            &["asin", "brand manager", "brand", "vendor sku", "cp"],
            &[
                &["A1", "Jo", "Acme", "0042", "40"],
                &["B2", "Sam", "Beetel", "V2", "N/A"],
            ],
        );
        resolve_reference(&pm, &ReferenceColumns::default(), vendor).unwrap()
    }

    const ORDER_HEADERS: &[&str] = &[
        "amazon-order-id",
        "purchase-date",
        "item-status",
        "product-name",
        "asin",
        "quantity",
        "item-price",
        "item-tax",
    ];

    fn orders(rows: &[&[&str]]) -> RawTable {
        table(ORDER_HEADERS, rows)
    }

    #[test]
    fn maps_attributes_and_positions_columns() {
        let orders = orders(&[&["o1", "2024-01-01T10:00:00+05:30", "Shipped", "Widget", "A1", "2", "100", "18"]]);
        let (out, stats) = enrich(&orders, &reference(true), &OrderColumns::default()).unwrap();

        assert_eq!(
            out.columns,
            vec![
                "amazon-order-id",
                "purchase-date",
                "item-status",
                "product-name",
                "asin",
                "Vendor SKU",
                "quantity",
                "item-price",
                "cost",
                "item-tax",
                "date",
                "Brand Manager",
                "Brand",
            ]
        );

        let row = &out.rows[0];
        assert_eq!(row.record.brand.as_deref(), Some("Acme"));
        assert_eq!(row.record.brand_manager.as_deref(), Some("Jo"));
        assert_eq!(row.record.vendor_code.as_deref(), Some("0042"));
        assert_eq!(row.record.unit_cost, 40.0);
        assert_eq!(row.record.quantity, 2.0);
        assert_eq!(row.record.calendar_date, NaiveDate::from_ymd_opt(2024, 1, 1));

        let at = |name: &str| &row.cells[out.column_index(name).unwrap()];
        assert_eq!(at("Vendor SKU"), &Value::Text("0042".into()));
        assert_eq!(at("cost"), &Value::Number(40.0));
        assert_eq!(at("item-price"), &Value::Number(100.0));
        assert_eq!(at("date"), &Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert_eq!(at("item-tax"), &Value::Text("18".into()));
        assert_eq!(stats, EnrichStats::default());
    }

    #[test]
    fn vendor_code_toggle_off() {
        let orders = orders(&[&["o1", "2024-01-01", "Shipped", "Widget", "A1", "1", "10", "0"]]);
        let (out, _) = enrich(&orders, &reference(false), &OrderColumns::default()).unwrap();
        assert!(out.column_index("Vendor SKU").is_none());
        assert_eq!(out.column_index("cost"), Some(out.column_index("item-price").unwrap() + 1));
        assert!(out.rows[0].record.vendor_code.is_none());
    }

    #[test]
    fn unmatched_identifier_left_join() {
        let orders = orders(&[&["o1", "2024-01-01", "Shipped", "Widget", "ZZ", "1", "10", "0"]]);
        let (out, stats) = enrich(&orders, &reference(true), &OrderColumns::default()).unwrap();
        let rec = &out.rows[0].record;
        assert_eq!(rec.brand, None);
        assert_eq!(rec.brand_manager, None);
        assert_eq!(rec.vendor_code, None);
        assert_eq!(rec.unit_cost, 0.0);
        assert_eq!(stats.unmatched, 1);
        let vendor = out.column_index("Vendor SKU").unwrap();
        assert_eq!(out.rows[0].cells[vendor], Value::Empty);
    }

    #[test]
    fn non_numeric_cost_resolves_to_zero() {
        let orders = orders(&[&["o1", "2024-01-01", "Shipped", "Widget", "B2", "1", "10", "0"]]);
        let (out, stats) = enrich(&orders, &reference(true), &OrderColumns::default()).unwrap();
        assert_eq!(out.rows[0].record.unit_cost, 0.0);
        assert_eq!(stats.numeric_coercions, 1);
    }

    #[test]
    fn identifiers_join_case_insensitively() {
        let orders = orders(&[&["o1", "2024-01-01", "Shipped", "Widget", "a1", "1", "10", "0"]]);
        let (out, _) = enrich(&orders, &reference(true), &OrderColumns::default()).unwrap();
        assert_eq!(out.rows[0].record.brand.as_deref(), Some("Acme"));
        assert_eq!(out.rows[0].record.identifier, "a1");
    }

    #[test]
    fn non_numeric_price_becomes_nan() {
        let orders = orders(&[&["o1", "2024-01-01", "Shipped", "Widget", "A1", "1", "free", "0"]]);
        let (out, _) = enrich(&orders, &reference(true), &OrderColumns::default()).unwrap();
        assert!(out.rows[0].record.unit_price.is_nan());
    }

    #[test]
    fn existing_cost_column_is_overwritten_in_place() {
        let orders = table(
            &["asin", "cost", "quantity", "item-price", "item-status", "product-name", "purchase-date"],
            &[&["A1", "999", "1", "10", "Shipped", "W", "2024-01-02"]],
        );
        let (out, _) = enrich(&orders, &reference(true), &OrderColumns::default()).unwrap();
        assert_eq!(out.columns.iter().filter(|c| *c == "cost").count(), 1);
        let cost = out.column_index("cost").unwrap();
        assert_eq!(cost, out.column_index("item-price").unwrap() + 1);
        assert_eq!(out.rows[0].cells[cost], Value::Number(40.0));
    }

    #[test]
    fn sku_column_is_text() {
        let mut orders = table(
            &["sku", "asin", "quantity", "item-price", "item-status", "product-name", "purchase-date"],
            &[&["", "A1", "1", "10", "Shipped", "W", "2024-01-02"]],
        );
        orders.rows[0][0] = Value::Number(12345.0);
        let (out, _) = enrich(&orders, &reference(true), &OrderColumns::default()).unwrap();
        let sku = out.column_index("sku").unwrap();
        assert_eq!(out.rows[0].cells[sku], Value::Text("12345".into()));
    }

    #[test]
    fn missing_order_column() {
        let orders = table(&["asin", "quantity"], &[]);
        let err = enrich(&orders, &reference(true), &OrderColumns::default()).unwrap_err();
        match err {
            ReportError::RequiredColumnMissing { input, attribute } => {
                assert_eq!(input, SourceKind::Orders);
                assert_eq!(attribute, "unit-price");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_timestamp_aborts() {
        let orders = orders(&[&["o1", "yesterday", "Shipped", "Widget", "A1", "1", "10", "0"]]);
        let err = enrich(&orders, &reference(true), &OrderColumns::default()).unwrap_err();
        assert!(matches!(err, ReportError::InvalidTimestamp { row: 2, .. }), "{err}");
    }

    #[test]
    fn timestamp_layouts() {
        let d = |s: &str| parse_timestamp(&Value::text(s)).unwrap().map(|t| t.date().to_string());
        assert_eq!(d("2024-03-05").as_deref(), Some("2024-03-05"));
        assert_eq!(d("2024-03-05 23:59:59").as_deref(), Some("2024-03-05"));
        assert_eq!(d("2024-03-05T23:59:59.123").as_deref(), Some("2024-03-05"));
        assert_eq!(d("2024-03-05T23:30:00-08:00").as_deref(), Some("2024-03-05"));
        assert_eq!(d("2024-03-05T01:00:00Z").as_deref(), Some("2024-03-05"));
        assert_eq!(d("03/05/2024").as_deref(), Some("2024-03-05"));
        assert_eq!(d(""), None);
        assert!(parse_timestamp(&Value::text("n/a")).is_err());
        assert_eq!(
            parse_timestamp(&Value::Number(45292.75)).unwrap().unwrap().date().to_string(),
            "2024-01-01"
        );
    }
}
