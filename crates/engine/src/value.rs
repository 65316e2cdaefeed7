use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// A single cell as handed over by the tabular reader.
///
/// Serializes untagged: `Empty` becomes `null`, dates become ISO strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Build a text cell, mapping the empty string to `Empty`.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Text form of the cell. Integral numbers print without a fraction.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Lenient numeric coercion. `None` means the value is not a finite number.
    pub fn coerce_number(&self) -> Option<f64> {
        let n = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Empty | Self::Date(_) | Self::DateTime(_) => return None,
        };
        n.is_finite().then_some(n)
    }

    /// `Some(text)` unless the cell is empty or whitespace-only.
    pub fn non_blank_text(&self) -> Option<String> {
        let text = self.to_text();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Option<String>> for Value {
    fn from(s: Option<String>) -> Self {
        s.map(Value::Text).unwrap_or(Value::Empty)
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Convert an Excel serial date (1900 date system) to a timestamp.
///
/// Serials below 61 account for the phantom 1900-02-29.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_465.0 {
        return None;
    }
    let epoch = if serial < 61.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let days = serial.floor();
    // Millisecond precision, never rounded past the end of the day
    let millis = ((serial - days) * MILLIS_PER_DAY).round() as i64;
    let millis = millis.min(MILLIS_PER_DAY as i64 - 1);
    let date = epoch.checked_add_signed(Duration::days(days as i64))?;
    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::milliseconds(millis))
}
