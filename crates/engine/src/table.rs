use crate::error::{ReportError, SourceKind};
use crate::value::Value;

/// A loaded tabular source: one header row plus data rows.
///
/// Rows may be ragged; missing trailing cells read as `Value::Empty`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

static EMPTY: Value = Value::Empty;

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { headers, rows }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column whose label equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }
}

/// Parse delimited text into a `RawTable`.
///
/// The first record is the header row. Every data cell is kept as text;
/// numeric interpretation happens later, per column.
pub fn load_delimited(
    source: SourceKind,
    data: &str,
    delimiter: u8,
) -> Result<RawTable, ReportError> {
    let format_err = |message: String| ReportError::SourceFormat {
        input: source,
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| format_err(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(format_err("no header row".into()));
    }

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| format_err(format!("record {}: {e}", line + 2)))?;
        rows.push(record.iter().map(Value::text).collect());
    }

    Ok(RawTable { headers, rows })
}
