// Excel file import (xlsx, xlsm, xlsb, xls, ods) and export (xlsx only)
//
// Import: the first worksheet is read as a header row plus data rows.
// Export: one worksheet per report table. Values only, no formulas.

use std::collections::HashSet;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use pivotdesk_engine::value::excel_serial_to_datetime;
use pivotdesk_engine::{OutputTable, RawTable, ReportError, SourceKind, Value};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook as XlsxWorkbook, Worksheet, XlsxError};

use crate::error::{ExportError, LoadError};

/// Excel's hard limit on worksheet name length.
pub const MAX_SHEET_NAME_LEN: usize = 31;
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Read the first worksheet of a workbook as a table.
pub fn import(path: &Path, source: SourceKind) -> Result<RawTable, LoadError> {
    let format_err = |message: String| {
        LoadError::Format(ReportError::SourceFormat {
            input: source,
            message,
        })
    };

    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format_err(format!("failed to open workbook: {e}")))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let Some(first) = sheet_names.first() else {
        return Err(format_err("workbook contains no sheets".into()));
    };
    let range = workbook
        .worksheet_range(first)
        .map_err(|e| format_err(format!("failed to read sheet '{first}': {e}")))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(|c| cell_value(c).to_text()).collect(),
        None => Vec::new(),
    };
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(format_err(format!("sheet '{first}' has no header row")));
    }

    let rows: Vec<Vec<Value>> = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    tracing::debug!(sheet = %first, rows = rows.len(), "worksheet imported");
    Ok(RawTable::new(headers, rows))
}

/// Map a calamine cell onto the engine's cell model.
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => Value::text(s.as_str()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => Value::text(format!("#{e:?}")),
        Data::DateTime(dt) => {
            // 1900 date system assumed
            let serial = dt.as_f64();
            match excel_serial_to_datetime(serial) {
                Some(ts) if ts.time() == chrono::NaiveTime::MIN => Value::Date(ts.date()),
                Some(ts) => Value::DateTime(ts),
                None => Value::Number(serial),
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::text(s.as_str()),
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Make `name` a legal worksheet name: forbidden characters replaced, edge
/// apostrophes stripped, length capped at 31 characters.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '-' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let capped: String = cleaned.chars().take(MAX_SHEET_NAME_LEN).collect();
    let capped = capped.trim_end().to_string();
    if capped.is_empty() {
        "Sheet".to_string()
    } else {
        capped
    }
}

/// Sanitize and make unique (case-insensitively) within one workbook.
fn unique_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    let base = sanitize_sheet_name(name);
    let mut candidate = base.clone();
    let mut n = 2;
    while !used.insert(candidate.to_lowercase()) {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME_LEN - suffix.chars().count();
        candidate = format!("{}{suffix}", base.chars().take(keep).collect::<String>());
        n += 1;
    }
    candidate
}

struct Formats {
    header: Format,
    date: Format,
    datetime: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            date: Format::new().set_num_format("yyyy-mm-dd"),
            datetime: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
        }
    }
}

/// Write `tables` into one workbook, one worksheet each, in order.
pub fn export(tables: &[OutputTable], path: &Path) -> Result<(), ExportError> {
    let xlsx_err = |cause| ExportError::Xlsx {
        path: path.to_path_buf(),
        cause,
    };

    let formats = Formats::new();
    let mut workbook = XlsxWorkbook::new();
    let mut used = HashSet::new();

    for table in tables {
        let name = unique_sheet_name(table.id.sheet_name(), &mut used);
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&name).map_err(xlsx_err)?;
        write_table(worksheet, table, &formats).map_err(xlsx_err)?;
    }

    workbook.save(path).map_err(xlsx_err)?;
    Ok(())
}

fn write_table(
    worksheet: &mut Worksheet,
    table: &OutputTable,
    formats: &Formats,
) -> Result<(), XlsxError> {
    let mut row: u32 = 0;
    for header in &table.header_rows {
        for (col, label) in header.iter().enumerate() {
            if !label.is_empty() {
                worksheet.write_string_with_format(row, col as u16, label, &formats.header)?;
            }
        }
        row += 1;
    }

    for cells in &table.rows {
        for (col, value) in cells.iter().enumerate() {
            write_cell(worksheet, row, col as u16, value, formats)?;
        }
        row += 1;
    }

    let header_rows = table.header_rows.len() as u32;
    if header_rows > 0 {
        worksheet.set_freeze_panes(header_rows, 0)?;
    }
    worksheet.autofit();
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    formats: &Formats,
) -> Result<(), XlsxError> {
    match value {
        Value::Empty => {}
        // Text stays text, so codes like "0042" keep their leading zeros
        Value::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        Value::Number(n) if n.is_finite() => {
            worksheet.write_number(row, col, *n)?;
        }
        Value::Number(_) => {}
        Value::Date(d) => {
            let dt = excel_date(d)?;
            worksheet.write_datetime_with_format(row, col, &dt, &formats.date)?;
        }
        Value::DateTime(ts) => {
            let dt = excel_datetime(ts)?;
            worksheet.write_datetime_with_format(row, col, &dt, &formats.datetime)?;
        }
    }
    Ok(())
}

fn excel_date(d: &NaiveDate) -> Result<ExcelDateTime, XlsxError> {
    ExcelDateTime::from_ymd(d.year() as u16, d.month() as u8, d.day() as u8)
}

fn excel_datetime(ts: &NaiveDateTime) -> Result<ExcelDateTime, XlsxError> {
    excel_date(&ts.date())?.and_hms(ts.hour() as u16, ts.minute() as u8, ts.second() as f64)
}
