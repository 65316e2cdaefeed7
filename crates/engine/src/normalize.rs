use crate::table::RawTable;
use crate::value::Value;

/// Canonical form of a column label: trimmed, lower-case.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Canonical form of an identifier cell: text form, trimmed.
pub fn normalize_identifier(value: &Value) -> Value {
    Value::text(value.to_text().trim())
}

/// Key used for joins: identifiers compare case-insensitively.
pub fn join_key(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Normalize labels of `table` and the values of its identifier column.
///
/// `identifier` is matched against normalized labels. A table without that
/// column is returned with only its labels normalized; the missing column is
/// reported by the stage that requires it.
pub fn normalize_table(table: &RawTable, identifier: &str) -> RawTable {
    let headers: Vec<String> = table.headers.iter().map(|h| normalize_label(h)).collect();
    let id_col = headers.iter().position(|h| *h == normalize_label(identifier));

    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            if let Some(cell) = id_col.and_then(|c| row.get_mut(c)) {
                *cell = normalize_identifier(cell);
            }
            row
        })
        .collect();

    RawTable { headers, rows }
}
