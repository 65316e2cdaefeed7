// File I/O operations: loading order / product-master sources and writing
// report tables.

pub mod csv;
pub mod error;
pub mod export;
pub mod xlsx;

use std::path::Path;

use pivotdesk_engine::{RawTable, SourceKind};

pub use error::{ExportError, LoadError};
pub use export::{export_report, ExportFormat, ExportOptions};

/// Extensions read through the workbook reader; everything else is treated
/// as delimited text.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Load a tabular source, picking the reader from the file extension.
pub fn load_table(path: &Path, source: SourceKind) -> Result<RawTable, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let table = if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        xlsx::import(path, source)?
    } else if ext == "tsv" || ext == "tab" {
        csv::import_with_delimiter(path, source, b'\t')?
    } else {
        csv::import(path, source)?
    };

    tracing::debug!(
        path = %path.display(),
        %source,
        rows = table.len(),
        columns = table.width(),
        "source loaded"
    );
    Ok(table)
}
