//! Product-master resolution: column detection, deduplication, lookup maps.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ReferenceColumns;
use crate::error::{ReportError, SourceKind};
use crate::normalize::join_key;
use crate::table::RawTable;
use crate::value::Value;

const VENDOR_CODE_NAMES: &[&str] = &["vendor sku", "vendor_sku", "vendor sku code", "vendor_sku_code"];
const UNIT_COST_NAMES: &[&str] = &["cp", "cost price", "cost"];

/// 0-based positions used when no column name matches.
const VENDOR_CODE_ORDINAL: usize = 3;
const UNIT_COST_ORDINAL: usize = 7;

// ---------------------------------------------------------------------------
// Attributes + column resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Attribute {
    Brand,
    BrandManager,
    VendorCode,
    UnitCost,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Brand => write!(f, "brand"),
            Self::BrandManager => write!(f, "brand-manager"),
            Self::VendorCode => write!(f, "vendor-code"),
            Self::UnitCost => write!(f, "unit-cost"),
        }
    }
}

impl Attribute {
    fn matches_name(&self, label: &str) -> bool {
        match self {
            Self::Brand => label == "brand",
            Self::BrandManager => label.contains("brand") && label.contains("manager"),
            Self::VendorCode => VENDOR_CODE_NAMES.contains(&label),
            Self::UnitCost => UNIT_COST_NAMES.contains(&label),
        }
    }

    fn ordinal(&self) -> Option<usize> {
        match self {
            Self::VendorCode => Some(VENDOR_CODE_ORDINAL),
            Self::UnitCost => Some(UNIT_COST_ORDINAL),
            Self::Brand | Self::BrandManager => None,
        }
    }
}

/// How a column was located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSource {
    Mapping,
    Name,
    Ordinal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub attribute: Attribute,
    pub index: usize,
    pub label: String,
    pub source: ColumnSource,
}

/// Locate `attribute` in a normalized product-master table.
///
/// An explicit mapping is authoritative. Without one, the first label that
/// matches the attribute's naming rule wins, then the fixed ordinal position.
pub fn resolve_column(
    table: &RawTable,
    attribute: Attribute,
    explicit: Option<&str>,
    ordinal_fallback: bool,
) -> Result<ResolvedColumn, ReportError> {
    let resolved = |index: usize, source: ColumnSource| ResolvedColumn {
        attribute,
        index,
        label: table.headers[index].clone(),
        source,
    };

    if let Some(name) = explicit {
        return table
            .column_index(name)
            .map(|i| resolved(i, ColumnSource::Mapping))
            .ok_or_else(|| ReportError::missing(SourceKind::Reference, attribute.to_string()));
    }

    if let Some(i) = table.headers.iter().position(|h| attribute.matches_name(h)) {
        return Ok(resolved(i, ColumnSource::Name));
    }

    match attribute.ordinal() {
        Some(i) if ordinal_fallback && i < table.width() => {
            warn!(
                attribute = %attribute,
                column = %table.headers[i],
                position = i + 1,
                "no column matched by name; using positional fallback"
            );
            Ok(resolved(i, ColumnSource::Ordinal))
        }
        _ => Err(ReportError::missing(SourceKind::Reference, attribute.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Lookup maps
// ---------------------------------------------------------------------------

/// Identifier -> attribute value, keyed by case-insensitive join key.
#[derive(Debug, Clone, Default)]
pub struct LookupMap {
    values: HashMap<String, Value>,
}

impl LookupMap {
    pub fn get(&self, identifier: &str) -> Option<&Value> {
        self.values.get(&join_key(identifier))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, key: String, value: Value) {
        self.values.insert(key, value);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceStats {
    pub rows: usize,
    pub discarded_identifiers: usize,
    pub duplicates: usize,
    pub unique: usize,
}

/// The four attribute maps built from one product master.
#[derive(Debug, Clone)]
pub struct ReferenceIndex {
    pub brand: LookupMap,
    pub brand_manager: LookupMap,
    /// Absent when vendor-code enrichment is switched off.
    pub vendor_code: Option<LookupMap>,
    pub unit_cost: LookupMap,
    pub columns: Vec<ResolvedColumn>,
    pub stats: ReferenceStats,
}

impl ReferenceIndex {
    pub fn contains(&self, identifier: &str) -> bool {
        self.brand.get(identifier).is_some()
    }
}

/// Identifiers that stand for "no value" once stringified.
fn is_missing_identifier(id: &str) -> bool {
    id.is_empty() || id.eq_ignore_ascii_case("nan")
}

/// Build the attribute maps from a normalized product-master table.
pub fn resolve_reference(
    table: &RawTable,
    columns: &ReferenceColumns,
    with_vendor_code: bool,
) -> Result<ReferenceIndex, ReportError> {
    let id_col = table
        .column_index(&columns.identifier)
        .ok_or_else(|| ReportError::missing(SourceKind::Reference, "identifier"))?;

    // 1. Drop rows without a usable identifier
    let usable: Vec<(String, &Vec<Value>)> = table
        .rows
        .iter()
        .filter_map(|row| {
            let id = row.get(id_col).map(|v| v.to_text()).unwrap_or_default();
            let id = id.trim();
            (!is_missing_identifier(id)).then(|| (join_key(id), row))
        })
        .collect();
    let discarded = table.len() - usable.len();
    if discarded > 0 {
        warn!(rows = discarded, "product master rows without identifier discarded");
    }

    // 2. Locate attribute columns
    let fallback = columns.ordinal_fallback;
    let brand_col = resolve_column(table, Attribute::Brand, columns.brand.as_deref(), fallback)?;
    let manager_col = resolve_column(
        table,
        Attribute::BrandManager,
        columns.brand_manager.as_deref(),
        fallback,
    )?;
    let vendor_col = if with_vendor_code {
        Some(resolve_column(
            table,
            Attribute::VendorCode,
            columns.vendor_code.as_deref(),
            fallback,
        )?)
    } else {
        None
    };
    let cost_col = resolve_column(table, Attribute::UnitCost, columns.unit_cost.as_deref(), fallback)?;

    // 3. Keep the first row per identifier
    let mut seen: HashSet<String> = HashSet::new();
    let mut duplicates = 0;
    let unique: Vec<(String, &Vec<Value>)> = usable
        .into_iter()
        .filter(|(key, _)| {
            let first = seen.insert(key.clone());
            if !first {
                duplicates += 1;
            }
            first
        })
        .collect();
    if duplicates > 0 {
        debug!(duplicates, "duplicate identifiers in product master ignored");
    }

    // 4. One map per attribute
    let build = |col: &ResolvedColumn| {
        let mut map = LookupMap::default();
        for (key, row) in &unique {
            map.insert(key.clone(), row.get(col.index).cloned().unwrap_or_default());
        }
        map
    };

    let brand = build(&brand_col);
    let brand_manager = build(&manager_col);
    let vendor_code = vendor_col.as_ref().map(&build);
    let unit_cost = build(&cost_col);

    let stats = ReferenceStats {
        rows: table.len(),
        discarded_identifiers: discarded,
        duplicates,
        unique: unique.len(),
    };

    let mut resolved = vec![brand_col, manager_col];
    resolved.extend(vendor_col);
    resolved.push(cost_col);

    Ok(ReferenceIndex {
        brand,
        brand_manager,
        vendor_code,
        unit_cost,
        columns: resolved,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pm(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| Value::text(*c)).collect())
                .collect(),
        )
    }

    fn standard() -> RawTable {
        pm(
            &["asin", "brand manager", "brand", "vendor sku", "cp"],
            &[
                &["A1", "Jo", "Acme", "V1", "40"],
                &["B2", "Sam", "Beetel", "0042", "N/A"],
            ],
        )
    }

    #[test]
    fn detects_columns_by_name() {
        let index = resolve_reference(&standard(), &ReferenceColumns::default(), true).unwrap();
        let sources: Vec<_> = index.columns.iter().map(|c| (c.attribute, c.source)).collect();
        assert_eq!(
            sources,
            vec![
                (Attribute::Brand, ColumnSource::Name),
                (Attribute::BrandManager, ColumnSource::Name),
                (Attribute::VendorCode, ColumnSource::Name),
                (Attribute::UnitCost, ColumnSource::Name),
            ]
        );
        assert_eq!(index.brand.get("A1"), Some(&Value::Text("Acme".into())));
        assert_eq!(index.brand_manager.get("b2"), Some(&Value::Text("Sam".into())));
        assert_eq!(
            index.vendor_code.as_ref().unwrap().get("B2"),
            Some(&Value::Text("0042".into()))
        );
        assert_eq!(index.unit_cost.get("B2"), Some(&Value::Text("N/A".into())));
    }

    #[test]
    fn first_duplicate_wins() {
        let table = pm(
            &["asin", "brand manager", "brand", "vendor sku", "cp"],
            &[
                &["A1", "Jo", "Acme", "V1", "40"],
                &["a1 ", "Kim", "Other", "V9", "99"],
            ],
        );
        let index = resolve_reference(&table, &ReferenceColumns::default(), true).unwrap();
        assert_eq!(index.brand.len(), 1);
        assert_eq!(index.brand.get("A1"), Some(&Value::Text("Acme".into())));
        assert_eq!(index.unit_cost.get("A1"), Some(&Value::Text("40".into())));
        assert_eq!(index.stats.duplicates, 1);
    }

    #[test]
    fn missing_identifiers_are_discarded() {
        let table = pm(
            &["asin", "brand manager", "brand", "vendor sku", "cp"],
            &[
                &["", "Jo", "Acme", "V1", "40"],
                &["nan", "Jo", "Acme", "V1", "40"],
                &["C3", "Jo", "Acme", "V1", "40"],
            ],
        );
        let index = resolve_reference(&table, &ReferenceColumns::default(), true).unwrap();
        assert_eq!(index.stats.discarded_identifiers, 2);
        assert_eq!(index.stats.unique, 1);
        assert!(index.contains("C3"));
        assert!(!index.contains("nan"));
    }

    #[test]
    fn ordinal_fallback_for_vendor_and_cost() {
        let table = pm(
            &["asin", "brand manager", "brand", "supplier ref", "a", "b", "c", "unit price"],
            &[&["A1", "Jo", "Acme", "S-1", "", "", "", "12.5"]],
        );
        let index = resolve_reference(&table, &ReferenceColumns::default(), true).unwrap();
        let vendor = &index.columns[2];
        assert_eq!(vendor.source, ColumnSource::Ordinal);
        assert_eq!(vendor.label, "supplier ref");
        let cost = &index.columns[3];
        assert_eq!(cost.source, ColumnSource::Ordinal);
        assert_eq!(cost.index, 7);
        assert_eq!(index.unit_cost.get("A1"), Some(&Value::Text("12.5".into())));
    }

    #[test]
    fn too_few_columns_for_fallback() {
        let table = pm(&["asin", "brand manager", "brand", "vendor sku"], &[]);
        let err = resolve_reference(&table, &ReferenceColumns::default(), true).unwrap_err();
        match err {
            ReportError::RequiredColumnMissing { input, attribute } => {
                assert_eq!(input, SourceKind::Reference);
                assert_eq!(attribute, "unit-cost");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fallback_can_be_disabled() {
        let table = pm(
            &["asin", "brand manager", "brand", "supplier ref", "cp"],
            &[],
        );
        let cols = ReferenceColumns {
            ordinal_fallback: false,
            ..Default::default()
        };
        let err = resolve_reference(&table, &cols, true).unwrap_err();
        assert!(err.to_string().contains("vendor-code"), "{err}");
        // same table resolves once vendor code is not requested
        assert!(resolve_reference(&table, &cols, false).is_ok());
    }

    #[test]
    fn explicit_mapping_overrides_heuristics() {
        let table = pm(
            &["asin", "brand", "owner", "brand manager (old)", "landed"],
            &[&["A1", "Acme", "Jo", "Retired", "7"]],
        );
        let cols = ReferenceColumns {
            brand_manager: Some("owner".into()),
            unit_cost: Some("landed".into()),
            ..Default::default()
        };
        let index = resolve_reference(&table, &cols, false).unwrap();
        assert_eq!(index.brand_manager.get("A1"), Some(&Value::Text("Jo".into())));
        assert_eq!(index.columns[1].source, ColumnSource::Mapping);
        assert!(index.vendor_code.is_none());

        let bad = ReferenceColumns {
            brand: Some("label".into()),
            ..cols
        };
        let err = resolve_reference(&table, &bad, false).unwrap_err();
        assert!(err.to_string().contains("'brand'"), "{err}");
    }

    #[test]
    fn missing_brand_is_reported() {
        let table = pm(&["asin", "brand manager", "x", "y", "cp"], &[]);
        let err = resolve_reference(&table, &ReferenceColumns::default(), true).unwrap_err();
        assert!(err.to_string().contains("'brand'"), "{err}");
    }

    #[test]
    fn missing_identifier_column() {
        let table = pm(&["sku", "brand"], &[]);
        let err = resolve_reference(&table, &ReferenceColumns::default(), true).unwrap_err();
        assert!(err.to_string().contains("'identifier'"), "{err}");
    }
}
