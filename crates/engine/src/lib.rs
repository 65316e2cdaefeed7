//! `pivotdesk-engine`: order enrichment and pivot aggregation.
//!
//! Pure engine crate: receives pre-loaded tables, returns the processed order
//! set plus four aggregate views. No filesystem or CLI dependencies.

pub mod aggregate;
pub mod config;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod reference;
pub mod table;
pub mod value;

pub use config::SchemaMapping;
pub use error::{ReportError, SourceKind};
pub use model::Report;
pub use output::{OutputTable, TableId};
pub use pipeline::generate;
pub use table::RawTable;
pub use value::Value;
