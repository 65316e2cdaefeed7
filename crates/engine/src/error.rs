use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Which of the two run inputs an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Orders,
    Reference,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orders => write!(f, "orders"),
            Self::Reference => write!(f, "product master"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    /// An input could not be read as tabular data at all.
    #[error("{input} source is not tabular data: {message}")]
    SourceFormat { input: SourceKind, message: String },

    /// A required logical column could not be resolved by mapping, name or position.
    #[error("{input} source: required column '{attribute}' not found")]
    RequiredColumnMissing { input: SourceKind, attribute: String },

    /// A non-empty purchase timestamp that matches no supported layout.
    #[error("orders row {row}: cannot parse purchase timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    /// TOML parse / deserialization error in the schema mapping.
    #[error("mapping parse error: {0}")]
    ConfigParse(String),

    /// Schema mapping parsed but is inconsistent.
    #[error("mapping validation error: {0}")]
    ConfigValidation(String),
}

impl ReportError {
    pub(crate) fn missing(input: SourceKind, attribute: impl Into<String>) -> Self {
        Self::RequiredColumnMissing {
            input,
            attribute: attribute.into(),
        }
    }
}
