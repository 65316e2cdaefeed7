//! `pivotdesk generate` and `pivotdesk check-mapping`.

use std::path::{Path, PathBuf};

use pivotdesk_engine::model::{Metrics, RunStats};
use pivotdesk_engine::{generate, SchemaMapping, SourceKind};
use pivotdesk_io::{export_report, load_table, ExportFormat, ExportOptions};
use serde::Serialize;

use crate::{CliError, GenerateArgs};

/// Machine-readable run summary (`--json`). Carries no timestamps, so
/// identical inputs print identical output.
#[derive(Serialize)]
struct RunSummary<'a> {
    metrics: &'a Metrics,
    stats: &'a RunStats,
    outputs: Vec<String>,
}

fn read_mapping(path: &Path) -> Result<SchemaMapping, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::usage(format!("cannot read mapping {}: {e}", path.display()))
    })?;
    Ok(SchemaMapping::from_toml(&text)?)
}

pub(crate) fn cmd_generate(args: GenerateArgs, quiet: bool) -> Result<(), CliError> {
    let format: ExportFormat = args.format.into();
    if args.combined && format == ExportFormat::Csv {
        return Err(CliError::usage("--combined needs --format xlsx")
            .with_hint("CSV output is always one file per table"));
    }

    let mut mapping = match &args.mapping {
        Some(path) => read_mapping(path)?,
        None => SchemaMapping::default(),
    };
    if args.no_vendor_code {
        mapping.enrich.vendor_code = false;
    }

    let orders = load_table(&args.orders, SourceKind::Orders)?;
    let products = load_table(&args.products, SourceKind::Reference)?;

    let report = generate(&orders, &products, &mapping)?;

    let options = ExportOptions {
        format,
        combined: args.combined,
        tables: args.tables.iter().map(|&t| t.into()).collect(),
    };
    let written = export_report(&report, &args.out_dir, &options)?;

    if args.json {
        let summary = RunSummary {
            metrics: &report.metrics,
            stats: &report.stats,
            outputs: written.iter().map(|p| p.display().to_string()).collect(),
        };
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::other(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    }

    if !quiet {
        print_summary(&report.metrics, &report.stats, &written);
    }

    Ok(())
}

/// Human summary to stderr.
fn print_summary(metrics: &Metrics, stats: &RunStats, written: &[PathBuf]) {
    let f = &stats.filter;
    eprintln!(
        "orders: {} loaded, {} kept, {} dropped ({} zero quantity, {} zero price, {} blank product, {} cancelled)",
        stats.orders_loaded,
        f.kept,
        f.dropped(),
        f.zero_quantity,
        f.zero_price,
        f.blank_product_name,
        f.cancelled,
    );
    eprintln!(
        "product master: {} identifiers ({} duplicates ignored, {} blank rows discarded); {} orders unmatched",
        stats.reference.unique,
        stats.reference.duplicates,
        stats.reference.discarded_identifiers,
        stats.unmatched_orders,
    );
    eprintln!(
        "revenue {:.2} over {} units; top brand {}, top brand manager {}",
        metrics.total_revenue,
        metrics.total_quantity,
        metrics.top_brand.as_deref().unwrap_or("-"),
        metrics.top_brand_manager.as_deref().unwrap_or("-"),
    );
    for path in written {
        eprintln!("wrote {}", path.display());
    }
}

pub(crate) fn cmd_check_mapping(path: PathBuf, quiet: bool) -> Result<(), CliError> {
    let mapping = read_mapping(&path)?;
    if !quiet {
        let o = &mapping.orders;
        eprintln!(
            "orders: identifier={} quantity={} unit_price={} status={} product_name={} purchase_timestamp={}",
            o.identifier, o.quantity, o.unit_price, o.status, o.product_name, o.purchase_timestamp
        );
        let r = &mapping.reference;
        let shown = |c: &Option<String>| c.clone().unwrap_or_else(|| "(detect)".to_string());
        eprintln!(
            "reference: identifier={} brand={} brand_manager={} vendor_code={} unit_cost={} ordinal_fallback={}",
            r.identifier,
            shown(&r.brand),
            shown(&r.brand_manager),
            shown(&r.vendor_code),
            shown(&r.unit_cost),
            r.ordinal_fallback,
        );
        eprintln!("enrich: vendor_code={}", mapping.enrich.vendor_code);
        eprintln!("{}: ok", path.display());
    }
    Ok(())
}
