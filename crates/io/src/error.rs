use std::path::PathBuf;

use pivotdesk_engine::ReportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be opened or read.
    #[error("cannot read {}: {cause}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    /// The file was read but is not a usable table.
    #[error(transparent)]
    Format(#[from] ReportError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot create {}: {cause}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("xlsx write failed for {}: {cause}", path.display())]
    Xlsx {
        path: PathBuf,
        #[source]
        cause: rust_xlsxwriter::XlsxError,
    },

    #[error("csv write failed for {}: {cause}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        cause: csv::Error,
    },
}
