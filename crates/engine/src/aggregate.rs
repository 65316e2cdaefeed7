use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use ordered_float::OrderedFloat;

use crate::model::{
    DailyTotals, DateMatrixRow, DateMatrixView, MatrixKey, Measures, OrderRecord, RowKind,
    SummaryRow, SummaryShape, SummaryView,
};

/// Sort position of a group key. Concrete values first (ascending), then the
/// null group, then the synthetic "all of them" slot used by subtotal rows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Slot {
    Value(String),
    Blank,
    Total,
}

impl Slot {
    fn of(key: &Option<String>) -> Self {
        match key {
            Some(v) => Self::Value(v.clone()),
            None => Self::Blank,
        }
    }

    fn into_key(self) -> Option<String> {
        match self {
            Self::Value(v) => Some(v),
            Self::Blank | Self::Total => None,
        }
    }
}

/// Line revenue. A non-numeric price counts as zero.
pub fn revenue(record: &OrderRecord) -> f64 {
    let price = if record.unit_price.is_finite() {
        record.unit_price
    } else {
        0.0
    };
    record.quantity * price
}

fn measures(record: &OrderRecord) -> Measures {
    Measures {
        quantity: record.quantity,
        revenue: revenue(record),
        cost: record.unit_cost,
    }
}

fn matrix_key(record: &OrderRecord, key: MatrixKey) -> &Option<String> {
    match key {
        MatrixKey::BrandManager => &record.brand_manager,
        MatrixKey::Brand => &record.brand,
    }
}

// ---------------------------------------------------------------------------
// Views A and B
// ---------------------------------------------------------------------------

/// Attribute x calendar-date pivot with a trailing grand total row.
///
/// Dates are ascending with the null date last; a (key, date) combination
/// with no orders is filled with zeros.
pub fn date_matrix<'a, I>(records: I, key: MatrixKey) -> DateMatrixView
where
    I: IntoIterator<Item = &'a OrderRecord>,
{
    let records: Vec<&OrderRecord> = records.into_iter().collect();

    let mut dates: Vec<Option<NaiveDate>> = records.iter().map(|r| r.calendar_date).collect();
    dates.sort_by_key(|d| (d.is_none(), *d));
    dates.dedup();
    let column: BTreeMap<Option<NaiveDate>, usize> =
        dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut groups: BTreeMap<Slot, Vec<DailyTotals>> = BTreeMap::new();
    let mut grand = vec![DailyTotals::default(); dates.len()];
    for record in &records {
        let Some(&c) = column.get(&record.calendar_date) else {
            continue;
        };
        let cells = groups
            .entry(Slot::of(matrix_key(record, key)))
            .or_insert_with(|| vec![DailyTotals::default(); dates.len()]);
        let amount = DailyTotals {
            revenue: revenue(record),
            quantity: record.quantity,
        };
        cells[c] += amount;
        grand[c] += amount;
    }

    let mut rows: Vec<DateMatrixRow> = groups
        .into_iter()
        .map(|(slot, cells)| DateMatrixRow {
            kind: RowKind::Base,
            key: slot.into_key(),
            cells,
        })
        .collect();
    rows.push(DateMatrixRow {
        kind: RowKind::GrandTotal,
        key: None,
        cells: grand,
    });

    DateMatrixView { key, dates, rows }
}

pub fn manager_by_date<'a, I>(records: I) -> DateMatrixView
where
    I: IntoIterator<Item = &'a OrderRecord>,
{
    date_matrix(records, MatrixKey::BrandManager)
}

pub fn brand_by_date<'a, I>(records: I) -> DateMatrixView
where
    I: IntoIterator<Item = &'a OrderRecord>,
{
    date_matrix(records, MatrixKey::Brand)
}

// ---------------------------------------------------------------------------
// View C
// ---------------------------------------------------------------------------

/// (identifier, brand) summary sorted by brand then identifier, grand total last.
pub fn brand_identifier_summary<'a, I>(records: I) -> SummaryView
where
    I: IntoIterator<Item = &'a OrderRecord>,
{
    let mut groups: BTreeMap<(Slot, String), Measures> = BTreeMap::new();
    let mut grand = Measures::default();
    for record in records {
        let m = measures(record);
        *groups
            .entry((Slot::of(&record.brand), record.identifier.clone()))
            .or_default() += m;
        grand += m;
    }

    let mut rows: Vec<SummaryRow> = groups
        .into_iter()
        .map(|((brand, identifier), measures)| SummaryRow {
            kind: RowKind::Base,
            brand_manager: None,
            brand: brand.into_key(),
            identifier: Some(identifier),
            measures,
        })
        .collect();
    rows.push(SummaryRow {
        kind: RowKind::GrandTotal,
        brand_manager: None,
        brand: None,
        identifier: None,
        measures: grand,
    });

    SummaryView {
        shape: SummaryShape::BrandIdentifier,
        rows,
    }
}

// ---------------------------------------------------------------------------
// View D
// ---------------------------------------------------------------------------

/// Sort key of a view D row: grand total flag, manager, brand, row class,
/// quantity descending, identifier.
type NestedKey = (bool, Slot, Slot, RowKind, Reverse<OrderedFloat<f64>>, String);

/// (identifier, manager, brand) summary with brand and manager subtotals.
///
/// Within a manager, each brand's identifiers come highest quantity first and
/// are followed by that brand's subtotal; the manager subtotal closes the
/// manager's block and the grand total closes the view.
pub fn manager_brand_identifier_summary<'a, I>(records: I) -> SummaryView
where
    I: IntoIterator<Item = &'a OrderRecord>,
{
    let mut base: BTreeMap<(Slot, Slot, String), Measures> = BTreeMap::new();
    for record in records {
        *base
            .entry((
                Slot::of(&record.brand_manager),
                Slot::of(&record.brand),
                record.identifier.clone(),
            ))
            .or_default() += measures(record);
    }

    let mut brand_totals: BTreeMap<(Slot, Slot), Measures> = BTreeMap::new();
    let mut manager_totals: BTreeMap<Slot, Measures> = BTreeMap::new();
    let mut grand = Measures::default();
    for ((manager, brand, _), m) in &base {
        *brand_totals
            .entry((manager.clone(), brand.clone()))
            .or_default() += *m;
        *manager_totals.entry(manager.clone()).or_default() += *m;
        grand += *m;
    }

    let mut keyed: Vec<(NestedKey, SummaryRow)> =
        Vec::with_capacity(base.len() + brand_totals.len() + manager_totals.len() + 1);

    for ((manager, brand, identifier), m) in base {
        let key = (
            false,
            manager.clone(),
            brand.clone(),
            RowKind::Base,
            Reverse(OrderedFloat(m.quantity)),
            identifier.clone(),
        );
        keyed.push((
            key,
            SummaryRow {
                kind: RowKind::Base,
                brand_manager: manager.into_key(),
                brand: brand.into_key(),
                identifier: Some(identifier),
                measures: m,
            },
        ));
    }
    for ((manager, brand), m) in brand_totals {
        let key = (
            false,
            manager.clone(),
            brand.clone(),
            RowKind::BrandSubtotal,
            Reverse(OrderedFloat(m.quantity)),
            String::new(),
        );
        keyed.push((
            key,
            SummaryRow {
                kind: RowKind::BrandSubtotal,
                brand_manager: manager.into_key(),
                brand: brand.into_key(),
                identifier: None,
                measures: m,
            },
        ));
    }
    for (manager, m) in manager_totals {
        let key = (
            false,
            manager.clone(),
            Slot::Total,
            RowKind::ManagerSubtotal,
            Reverse(OrderedFloat(m.quantity)),
            String::new(),
        );
        keyed.push((
            key,
            SummaryRow {
                kind: RowKind::ManagerSubtotal,
                brand_manager: manager.into_key(),
                brand: None,
                identifier: None,
                measures: m,
            },
        ));
    }
    keyed.push((
        (
            true,
            Slot::Total,
            Slot::Total,
            RowKind::GrandTotal,
            Reverse(OrderedFloat(grand.quantity)),
            String::new(),
        ),
        SummaryRow {
            kind: RowKind::GrandTotal,
            brand_manager: None,
            brand: None,
            identifier: None,
            measures: grand,
        },
    ));

    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    SummaryView {
        shape: SummaryShape::ManagerBrandIdentifier,
        rows: keyed.into_iter().map(|(_, row)| row).collect(),
    }
}
