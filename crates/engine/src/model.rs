use std::ops::AddAssign;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::filter::FilterStats;
use crate::reference::{ReferenceStats, ResolvedColumn};
use crate::value::Value;

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// One order line after enrichment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub identifier: String,
    pub quantity: f64,
    /// `NaN` when the source value was not numeric.
    pub unit_price: f64,
    pub status: String,
    pub product_name: Option<String>,
    pub purchase_timestamp: Option<NaiveDateTime>,
    pub calendar_date: Option<NaiveDate>,
    pub brand: Option<String>,
    pub brand_manager: Option<String>,
    pub vendor_code: Option<String>,
    pub unit_cost: f64,
}

/// An enriched order: typed fields for aggregation plus the full output row.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub record: OrderRecord,
    pub cells: Vec<Value>,
}

/// The processed order set, cells laid out in `columns` order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedOrders {
    pub columns: Vec<String>,
    pub rows: Vec<EnrichedRow>,
}

impl EnrichedOrders {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &OrderRecord> {
        self.rows.iter().map(|r| &r.record)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

// ---------------------------------------------------------------------------
// Measures
// ---------------------------------------------------------------------------

/// Per-date sums in the manager/brand by date views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyTotals {
    pub revenue: f64,
    pub quantity: f64,
}

impl AddAssign for DailyTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.revenue += rhs.revenue;
        self.quantity += rhs.quantity;
    }
}

/// Sums carried by the summary views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Measures {
    pub quantity: f64,
    pub revenue: f64,
    pub cost: f64,
}

impl AddAssign for Measures {
    fn add_assign(&mut self, rhs: Self) {
        self.quantity += rhs.quantity;
        self.revenue += rhs.revenue;
        self.cost += rhs.cost;
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Row class. Declaration order is the in-group sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Base,
    BrandSubtotal,
    ManagerSubtotal,
    GrandTotal,
}

impl RowKind {
    pub fn is_total(&self) -> bool {
        !matches!(self, Self::Base)
    }
}

/// Which attribute keys the rows of a date matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixKey {
    BrandManager,
    Brand,
}

/// Attribute x date pivot (views A and B).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateMatrixView {
    pub key: MatrixKey,
    /// Column dates, ascending; a null date (blank timestamp) sorts last.
    pub dates: Vec<Option<NaiveDate>>,
    pub rows: Vec<DateMatrixRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateMatrixRow {
    pub kind: RowKind,
    /// Attribute value; `None` for unmatched orders and for the grand total.
    pub key: Option<String>,
    /// Aligned with `DateMatrixView::dates`.
    pub cells: Vec<DailyTotals>,
}

impl DateMatrixRow {
    pub fn total(&self) -> DailyTotals {
        let mut t = DailyTotals::default();
        for c in &self.cells {
            t += *c;
        }
        t
    }
}

/// Group-key shapes of the summary views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryShape {
    /// (identifier, brand)
    BrandIdentifier,
    /// (identifier, brand manager, brand) with subtotals
    ManagerBrandIdentifier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub kind: RowKind,
    pub brand_manager: Option<String>,
    pub brand: Option<String>,
    /// `None` only on synthetic rows.
    pub identifier: Option<String>,
    pub measures: Measures,
}

/// Identifier-level summaries (views C and D).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub shape: SummaryShape,
    pub rows: Vec<SummaryRow>,
}

impl SummaryView {
    pub fn base_rows(&self) -> impl Iterator<Item = &SummaryRow> {
        self.rows.iter().filter(|r| r.kind == RowKind::Base)
    }

    pub fn grand_total(&self) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.kind == RowKind::GrandTotal)
    }
}

// ---------------------------------------------------------------------------
// Metrics + run output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub total_orders: usize,
    pub total_quantity: f64,
    pub total_revenue: f64,
    pub top_brand: Option<String>,
    pub top_brand_manager: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub orders_loaded: usize,
    pub reference: ReferenceStats,
    pub reference_columns: Vec<ResolvedColumn>,
    pub unmatched_orders: usize,
    pub numeric_coercions: usize,
    pub filter: FilterStats,
}

/// Everything one run produces. Built only when every stage succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Normalized label of the orders identifier column.
    pub identifier_label: String,
    /// Normalized label of the orders unit-price column.
    pub price_label: String,
    pub processed: EnrichedOrders,
    pub manager_by_date: DateMatrixView,
    pub brand_by_date: DateMatrixView,
    pub brand_identifier: SummaryView,
    pub manager_brand_identifier: SummaryView,
    pub metrics: Metrics,
    pub stats: RunStats,
}
