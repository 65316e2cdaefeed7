// Report export: every table to its own file, or all of them into one workbook

use std::path::{Path, PathBuf};

use pivotdesk_engine::{OutputTable, Report, TableId};
use serde::Serialize;

use crate::error::ExportError;

/// File name of the single-workbook export.
pub const COMBINED_FILE_STEM: &str = "order_analysis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Write all tables into one workbook. Only meaningful for xlsx.
    pub combined: bool,
    /// Tables to write, in order. Empty means all five.
    pub tables: Vec<TableId>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Xlsx,
            combined: false,
            tables: Vec::new(),
        }
    }
}

/// Write the selected tables of `report` under `dir`. Returns the paths
/// written, in table order.
pub fn export_report(
    report: &Report,
    dir: &Path,
    options: &ExportOptions,
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir).map_err(|cause| ExportError::Io {
        path: dir.to_path_buf(),
        cause,
    })?;

    let ids: &[TableId] = if options.tables.is_empty() {
        &TableId::ALL
    } else {
        &options.tables
    };
    let tables: Vec<OutputTable> = ids.iter().map(|&id| report.table(id)).collect();

    let mut written = Vec::new();
    match options.format {
        ExportFormat::Xlsx if options.combined => {
            let path = dir.join(format!("{COMBINED_FILE_STEM}.xlsx"));
            crate::xlsx::export(&tables, &path)?;
            written.push(path);
        }
        format => {
            for table in &tables {
                let path = dir.join(format!("{}.{}", table.id.file_stem(), format.extension()));
                match format {
                    ExportFormat::Xlsx => crate::xlsx::export(std::slice::from_ref(table), &path)?,
                    ExportFormat::Csv => crate::csv::export(table, &path)?,
                }
                written.push(path);
            }
        }
    }

    for path in &written {
        tracing::info!(path = %path.display(), "written");
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pivotdesk_engine::table::load_delimited;
    use pivotdesk_engine::{generate, SchemaMapping, SourceKind};
    use tempfile::tempdir;

    fn report() -> Report {
        let orders = load_delimited(
            SourceKind::Orders,
            "asin,sku,quantity,item-price,item-status,product-name,purchase-date\nA1,007,2,100,Shipped,Widget,2024-01-01\n",
            b',',
        )
        .unwrap();
        let products = load_delimited(
            SourceKind::Reference,
            "asin,brand manager,brand,vendor sku,cp\nA1,Jo,Acme,0042,40\n",
            b',',
        )
        .unwrap();
        generate(&orders, &products, &SchemaMapping::default()).unwrap()
    }

    #[test]
    fn test_per_table_csv() {
        let dir = tempdir().unwrap();
        let options = ExportOptions {
            format: ExportFormat::Csv,
            ..Default::default()
        };
        let written = export_report(&report(), dir.path(), &options).unwrap();

        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "processed_orders_raw.csv",
                "brand_manager_analysis.csv",
                "brand_analysis.csv",
                "brand_asin_summary.csv",
                "bm_brand_asin_summary.csv",
            ]
        );

        let processed = std::fs::read_to_string(&written[0]).unwrap();
        let mut lines = processed.lines();
        assert_eq!(
            lines.next().unwrap(),
            "asin,Vendor SKU,sku,quantity,item-price,cost,item-status,product-name,purchase-date,date,Brand Manager,Brand"
        );
        assert_eq!(
            lines.next().unwrap(),
            "A1,0042,007,2,100,40,Shipped,Widget,2024-01-01,2024-01-01,Jo,Acme"
        );
    }

    #[test]
    fn test_combined_workbook() {
        let dir = tempdir().unwrap();
        let options = ExportOptions {
            combined: true,
            ..Default::default()
        };
        let written = export_report(&report(), dir.path(), &options).unwrap();
        assert_eq!(written, vec![dir.path().join("order_analysis.xlsx")]);

        use calamine::{open_workbook_auto, Reader};
        let workbook = open_workbook_auto(&written[0]).unwrap();
        assert_eq!(
            workbook.sheet_names(),
            vec![
                "Processed Orders",
                "Brand Manager Analysis",
                "Brand Analysis",
                "Brand & ASIN Summary",
                "BM - Brand - ASIN Summary",
            ]
        );
    }

    #[test]
    fn test_selected_tables_only() {
        let dir = tempdir().unwrap();
        let options = ExportOptions {
            tables: vec![TableId::BrandAsinSummary],
            ..Default::default()
        };
        let written = export_report(&report(), dir.path(), &options).unwrap();
        assert_eq!(written, vec![dir.path().join("brand_asin_summary.xlsx")]);
        assert!(written[0].exists());
    }

    #[test]
    fn test_creates_output_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let options = ExportOptions {
            format: ExportFormat::Csv,
            tables: vec![TableId::BrandAnalysis],
            ..Default::default()
        };
        export_report(&report(), &nested, &options).unwrap();
        assert!(nested.join("brand_analysis.csv").exists());
    }
}
