// pivotdesk CLI - order enrichment and pivot reports from the command line

mod exit_codes;
mod generate;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use pivotdesk_engine::{ReportError, SourceKind, TableId};
use pivotdesk_io::{ExportError, ExportFormat, LoadError};

use exit_codes::{report_exit_code, EXIT_ERROR, EXIT_EXPORT, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "pivotdesk")]
#[command(about = "Enrich an order ledger from a product master and build pivot reports")]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). Overrides PIVOTDESK_LOG.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once and write the report tables
    #[command(after_help = "\
Examples:
  pivotdesk generate --orders orders.txt --products pm.xlsx
  pivotdesk generate --orders orders.csv --products pm.csv --combined --out-dir reports
  pivotdesk generate --orders orders.csv --products pm.csv --format csv --table brand-asin
  pivotdesk generate --orders orders.csv --products pm.csv --mapping columns.toml --json")]
    Generate(GenerateArgs),

    /// Validate a schema mapping file without running
    #[command(after_help = "\
Examples:
  pivotdesk check-mapping columns.toml")]
    CheckMapping {
        /// Path to the mapping TOML file
        mapping: PathBuf,
    },
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Order ledger (csv, tsv, txt, xlsx, xls, xlsb, ods)
    #[arg(long, env = "PIVOTDESK_ORDERS")]
    orders: PathBuf,

    /// Product master (csv, tsv, txt, xlsx, xls, xlsb, ods)
    #[arg(long, env = "PIVOTDESK_PRODUCTS")]
    products: PathBuf,

    /// Schema mapping TOML; defaults apply when omitted
    #[arg(long, env = "PIVOTDESK_MAPPING")]
    mapping: Option<PathBuf>,

    /// Directory for the output files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Output file format
    #[arg(long, value_enum, default_value_t = OutputFormat::Xlsx)]
    format: OutputFormat,

    /// Write every table into one workbook (order_analysis.xlsx)
    #[arg(long)]
    combined: bool,

    /// Only write these tables (repeatable). Default: all five.
    #[arg(long = "table", value_enum)]
    tables: Vec<TableArg>,

    /// Skip vendor-code enrichment
    #[arg(long)]
    no_vendor_code: bool,

    /// Print the run summary as JSON to stdout
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Xlsx,
    Csv,
}

impl From<OutputFormat> for ExportFormat {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Xlsx => ExportFormat::Xlsx,
            OutputFormat::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TableArg {
    ProcessedOrders,
    BrandManager,
    Brand,
    BrandAsin,
    BmBrandAsin,
}

impl From<TableArg> for TableId {
    fn from(t: TableArg) -> Self {
        match t {
            TableArg::ProcessedOrders => TableId::ProcessedOrders,
            TableArg::BrandManager => TableId::BrandManagerAnalysis,
            TableArg::Brand => TableId::BrandAnalysis,
            TableArg::BrandAsin => TableId::BrandAsinSummary,
            TableArg::BmBrandAsin => TableId::BmBrandAsinSummary,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Generate(args) => generate::cmd_generate(args, cli.quiet),
        Commands::CheckMapping { mapping } => generate::cmd_check_mapping(mapping, cli.quiet),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReportError> for CliError {
    fn from(err: ReportError) -> Self {
        let hint = match &err {
            ReportError::RequiredColumnMissing { input, attribute } => {
                let section = match input {
                    SourceKind::Orders => "orders",
                    SourceKind::Reference => "reference",
                };
                Some(format!(
                    "name the column explicitly in --mapping ([{section}] {} = \"...\")",
                    attribute.replace('-', "_")
                ))
            }
            ReportError::ConfigParse(_) | ReportError::ConfigValidation(_) => {
                Some("run `pivotdesk check-mapping <file>` to validate the mapping".to_string())
            }
            _ => None,
        };
        Self { code: report_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<LoadError> for CliError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Read { .. } => CliError::usage(err.to_string()),
            LoadError::Format(inner) => inner.into(),
        }
    }
}

impl From<ExportError> for CliError {
    fn from(err: ExportError) -> Self {
        Self { code: EXIT_EXPORT, message: err.to_string(), hint: None }
    }
}
