//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                 |
//! |---------|------------|---------------------------------------------|
//! | 0       | Universal  | Success                                     |
//! | 1       | Universal  | General error (unspecified)                 |
//! | 2       | Universal  | CLI usage error (bad args, missing file)    |
//! | 3-9     | route      | Route selection and import                  |
//! | 10-19   | scan       | Scan input and scan-result CSV files        |
//! | 20-29   | export     | Report and workbook exports                 |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `recon_exit_code` or the relevant command

use conferencia_io::IoError;
use conferencia_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable input file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Route (3-9)
// =============================================================================

/// Command needs a selected route and none is selected.
pub const EXIT_NO_ROUTE: u8 = 3;

/// Route id not present in the registry.
pub const EXIT_UNKNOWN_ROUTE: u8 = 4;

/// Import manifest unparseable, or an entry without usable ids / route id.
pub const EXIT_IMPORT_INVALID: u8 = 5;

// =============================================================================
// Scan (10-19)
// =============================================================================

/// Scan-result CSV is empty, has no value column, or cannot be parsed.
pub const EXIT_CSV_INVALID: u8 = 10;

// =============================================================================
// Export (20-29)
// =============================================================================

/// Nothing eligible to export; no file written.
pub const EXIT_NOTHING_TO_EXPORT: u8 = 20;

/// Export file could not be written.
pub const EXIT_EXPORT_WRITE: u8 = 21;

// =============================================================================
// Error mapping
// =============================================================================

/// Map a ReconError to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::NoRouteSelected => EXIT_NO_ROUTE,
        ReconError::UnknownRoute(_) => EXIT_UNKNOWN_ROUTE,
        ReconError::EmptyImport { .. }
        | ReconError::MissingRouteId
        | ReconError::ImportParse(_) => EXIT_IMPORT_INVALID,
        ReconError::EmptyCsv | ReconError::MissingColumn { .. } | ReconError::Csv(_) => {
            EXIT_CSV_INVALID
        }
        ReconError::NothingToExport => EXIT_NOTHING_TO_EXPORT,
        ReconError::Schema(_) => EXIT_ERROR,
    }
}

/// Map an IoError to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Recon(e) => recon_exit_code(e),
        IoError::Read { .. } => EXIT_USAGE,
        IoError::Write { .. } | IoError::Csv(_) | IoError::Xlsx(_) => EXIT_EXPORT_WRITE,
    }
}
