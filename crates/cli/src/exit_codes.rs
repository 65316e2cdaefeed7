//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (catch-all)                |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 60-69   | generate         | Report pipeline codes                    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `report_exit_code` or the command's error handling

use pivotdesk_engine::ReportError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - catch-all failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable input or mapping file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Generate (60-69)
// =============================================================================

/// An input file is not tabular data (bad workbook, no header row).
pub const EXIT_SOURCE_FORMAT: u8 = 60;

/// A required column could not be resolved by mapping, name or position.
pub const EXIT_MISSING_COLUMN: u8 = 61;

/// The schema mapping failed to parse or validate.
pub const EXIT_INVALID_MAPPING: u8 = 62;

/// Writing an output file failed.
pub const EXIT_EXPORT: u8 = 63;

/// Any other pipeline failure (e.g. an unparseable purchase timestamp).
pub const EXIT_RUN_FAILED: u8 = 64;

/// Map a pipeline error to its exit code.
pub fn report_exit_code(err: &ReportError) -> u8 {
    match err {
        ReportError::SourceFormat { .. } => EXIT_SOURCE_FORMAT,
        ReportError::RequiredColumnMissing { .. } => EXIT_MISSING_COLUMN,
        ReportError::ConfigParse(_) | ReportError::ConfigValidation(_) => EXIT_INVALID_MAPPING,
        ReportError::InvalidTimestamp { .. } => EXIT_RUN_FAILED,
    }
}
