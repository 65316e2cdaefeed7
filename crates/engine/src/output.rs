//! Rendering of the report into flat, exportable tables.
//!
//! Aggregation keeps typed rows; the sentinel labels ("Grand Total",
//! "<x> Total", "(blank)") only exist here.

use serde::Serialize;

use crate::enrich::{BRAND_LABEL, BRAND_MANAGER_LABEL, COST_LABEL};
use crate::model::{DateMatrixView, MatrixKey, Report, RowKind, SummaryRow, SummaryShape, SummaryView};
use crate::value::Value;

pub const GRAND_TOTAL_LABEL: &str = "Grand Total";
pub const BLANK_LABEL: &str = "(blank)";
pub const QUANTITY_METRIC: &str = "Sum of quantity";

/// The five exportable tables of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableId {
    ProcessedOrders,
    BrandManagerAnalysis,
    BrandAnalysis,
    BrandAsinSummary,
    BmBrandAsinSummary,
}

impl TableId {
    pub const ALL: [TableId; 5] = [
        TableId::ProcessedOrders,
        TableId::BrandManagerAnalysis,
        TableId::BrandAnalysis,
        TableId::BrandAsinSummary,
        TableId::BmBrandAsinSummary,
    ];

    pub fn sheet_name(self) -> &'static str {
        match self {
            Self::ProcessedOrders => "Processed Orders",
            Self::BrandManagerAnalysis => "Brand Manager Analysis",
            Self::BrandAnalysis => "Brand Analysis",
            Self::BrandAsinSummary => "Brand & ASIN Summary",
            Self::BmBrandAsinSummary => "BM / Brand / ASIN Summary",
        }
    }

    /// File name (without extension) used when tables are written separately.
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::ProcessedOrders => "processed_orders_raw",
            Self::BrandManagerAnalysis => "brand_manager_analysis",
            Self::BrandAnalysis => "brand_analysis",
            Self::BrandAsinSummary => "brand_asin_summary",
            Self::BmBrandAsinSummary => "bm_brand_asin_summary",
        }
    }
}

/// A table ready for a codec: one or more header rows, then data rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputTable {
    pub id: TableId,
    pub header_rows: Vec<Vec<String>>,
    pub rows: Vec<Vec<Value>>,
}

impl OutputTable {
    pub fn width(&self) -> usize {
        self.header_rows
            .iter()
            .map(Vec::len)
            .chain(self.rows.iter().map(Vec::len))
            .max()
            .unwrap_or(0)
    }
}

fn label(key: &Option<String>) -> String {
    key.clone().unwrap_or_else(|| BLANK_LABEL.to_string())
}

impl Report {
    fn revenue_metric(&self) -> String {
        format!("Sum of {}", self.price_label)
    }

    pub fn tables(&self) -> Vec<OutputTable> {
        TableId::ALL.iter().map(|&id| self.table(id)).collect()
    }

    pub fn table(&self, id: TableId) -> OutputTable {
        match id {
            TableId::ProcessedOrders => OutputTable {
                id,
                header_rows: vec![self.processed.columns.clone()],
                rows: self.processed.rows.iter().map(|r| r.cells.clone()).collect(),
            },
            TableId::BrandManagerAnalysis => self.date_matrix_table(id, &self.manager_by_date),
            TableId::BrandAnalysis => self.date_matrix_table(id, &self.brand_by_date),
            TableId::BrandAsinSummary => self.summary_table(id, &self.brand_identifier),
            TableId::BmBrandAsinSummary => self.summary_table(id, &self.manager_brand_identifier),
        }
    }

    fn date_matrix_table(&self, id: TableId, view: &DateMatrixView) -> OutputTable {
        let key_label = match view.key {
            MatrixKey::BrandManager => BRAND_MANAGER_LABEL,
            MatrixKey::Brand => BRAND_LABEL,
        };
        let revenue_metric = self.revenue_metric();

        let mut dates = vec![key_label.to_string()];
        let mut metrics = vec![String::new()];
        for date in &view.dates {
            let shown = match date {
                Some(d) => d.format("%Y-%m-%d").to_string(),
                None => BLANK_LABEL.to_string(),
            };
            dates.push(shown);
            dates.push(String::new());
            metrics.push(revenue_metric.clone());
            metrics.push(QUANTITY_METRIC.to_string());
        }

        let rows = view
            .rows
            .iter()
            .map(|row| {
                let head = match row.kind {
                    RowKind::GrandTotal => GRAND_TOTAL_LABEL.to_string(),
                    _ => label(&row.key),
                };
                let mut cells = Vec::with_capacity(1 + row.cells.len() * 2);
                cells.push(Value::Text(head));
                for totals in &row.cells {
                    cells.push(Value::Number(totals.revenue));
                    cells.push(Value::Number(totals.quantity));
                }
                cells
            })
            .collect();

        OutputTable {
            id,
            header_rows: vec![dates, metrics],
            rows,
        }
    }

    fn summary_table(&self, id: TableId, view: &SummaryView) -> OutputTable {
        let mut header = Vec::new();
        if view.shape == SummaryShape::ManagerBrandIdentifier {
            header.push(BRAND_MANAGER_LABEL.to_string());
            header.push(BRAND_LABEL.to_string());
            header.push(self.identifier_label.clone());
        } else {
            header.push(self.identifier_label.clone());
            header.push(BRAND_LABEL.to_string());
        }
        header.push(QUANTITY_METRIC.to_string());
        header.push(self.revenue_metric());
        header.push(format!("Sum of {COST_LABEL}"));

        let rows = view
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<Value> = summary_keys(view.shape, row)
                    .into_iter()
                    .map(Value::text)
                    .collect();
                cells.push(Value::Number(row.measures.quantity));
                cells.push(Value::Number(row.measures.revenue));
                cells.push(Value::Number(row.measures.cost));
                cells
            })
            .collect();

        OutputTable {
            id,
            header_rows: vec![header],
            rows,
        }
    }
}

/// Rendered key cells of a summary row, in header order.
fn summary_keys(shape: SummaryShape, row: &SummaryRow) -> Vec<String> {
    let identifier = label(&row.identifier);
    match (shape, row.kind) {
        (_, RowKind::GrandTotal) => match shape {
            SummaryShape::BrandIdentifier => vec![GRAND_TOTAL_LABEL.into(), String::new()],
            SummaryShape::ManagerBrandIdentifier => {
                vec![String::new(), String::new(), GRAND_TOTAL_LABEL.into()]
            }
        },
        (SummaryShape::BrandIdentifier, _) => vec![identifier, label(&row.brand)],
        (SummaryShape::ManagerBrandIdentifier, RowKind::Base) => {
            vec![label(&row.brand_manager), label(&row.brand), identifier]
        }
        (SummaryShape::ManagerBrandIdentifier, RowKind::BrandSubtotal) => vec![
            label(&row.brand_manager),
            label(&row.brand),
            format!("{} Total", label(&row.brand)),
        ],
        (SummaryShape::ManagerBrandIdentifier, RowKind::ManagerSubtotal) => vec![
            label(&row.brand_manager),
            String::new(),
            format!("{} Total", label(&row.brand_manager)),
        ],
    }
}
