// CSV/TSV import and export

use std::path::Path;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use pivotdesk_engine::table::load_delimited;
use pivotdesk_engine::{OutputTable, RawTable, SourceKind, Value};

use crate::error::{ExportError, LoadError};

pub fn import(path: &Path, source: SourceKind) -> Result<RawTable, LoadError> {
    let content = decode_source(path)?;
    let delimiter = sniff_delimiter(&content);
    tracing::debug!(path = %path.display(), delimiter = ?(delimiter as char), "delimiter detected");
    Ok(load_delimited(source, &content, delimiter)?)
}

pub fn import_with_delimiter(
    path: &Path,
    source: SourceKind,
    delimiter: u8,
) -> Result<RawTable, LoadError> {
    let content = decode_source(path)?;
    Ok(load_delimited(source, &content, delimiter)?)
}

/// Candidates in preference order; earlier wins a tie.
const DELIMITERS: &[u8] = &[b'\t', b';', b',', b'|'];

/// Data rows inspected after the header.
const SNIFF_ROWS: usize = 20;

/// Pick the field delimiter of a ledger export.
///
/// A candidate must split the header into more than one column. Among those,
/// the one under which the most sampled rows line up with the header width
/// wins, then the wider header. Falls back to comma.
pub fn sniff_delimiter(content: &str) -> u8 {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return b',';
    };
    let sample: Vec<&str> = lines.take(SNIFF_ROWS).collect();

    let mut best: Option<(u8, (usize, usize))> = None;
    for &delimiter in DELIMITERS {
        let width = field_count(header, delimiter);
        if width <= 1 {
            continue;
        }
        let aligned = sample
            .iter()
            .filter(|line| field_count(line, delimiter) == width)
            .count();
        let score = (aligned, width);
        let better = match best {
            Some((_, top)) => score > top,
            None => true,
        };
        if better {
            best = Some((delimiter, score));
        }
    }

    best.map_or(b',', |(delimiter, _)| delimiter)
}

/// Fields in one physical line, honouring quotes.
fn field_count(line: &str, delimiter: u8) -> usize {
    ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map_or(1, |record| record.len())
}

/// Read a source file as text.
///
/// A byte-order mark selects the encoding (UTF-16 "Unicode Text" exports
/// included). Without one the bytes must be UTF-8, else they are decoded as
/// Windows-1252, the code page of Excel-saved CSVs.
pub fn decode_source(path: &Path) -> Result<String, LoadError> {
    let bytes = std::fs::read(path).map_err(|cause| LoadError::Read {
        path: path.to_path_buf(),
        cause,
    })?;

    let (encoding, bom_len) = match Encoding::for_bom(&bytes) {
        Some(found) => found,
        None if std::str::from_utf8(&bytes).is_ok() => (UTF_8, 0),
        None => (WINDOWS_1252, 0),
    };
    if encoding != UTF_8 {
        tracing::debug!(path = %path.display(), encoding = encoding.name(), "decoding source");
    }

    let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    Ok(text.into_owned())
}

/// Write one table as delimited text: header rows first, then data rows.
pub fn export(table: &OutputTable, path: &Path) -> Result<(), ExportError> {
    export_with_delimiter(table, path, b',')
}

pub fn export_with_delimiter(
    table: &OutputTable,
    path: &Path,
    delimiter: u8,
) -> Result<(), ExportError> {
    let csv_err = |cause| ExportError::Csv {
        path: path.to_path_buf(),
        cause,
    };

    let mut writer = ::csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    for header in &table.header_rows {
        writer.write_record(header).map_err(csv_err)?;
    }
    for row in &table.rows {
        writer
            .write_record(row.iter().map(cell_text))
            .map_err(csv_err)?;
    }

    writer.flush().map_err(|cause| ExportError::Io {
        path: path.to_path_buf(),
        cause,
    })?;
    Ok(())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Number(n) if !n.is_finite() => String::new(),
        other => other.to_text(),
    }
}
