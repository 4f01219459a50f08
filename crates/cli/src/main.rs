// Conferência CLI - route conference from the terminal
// Scans go in one per line; routes, selection and progress persist in the data dir.

mod app;
mod exit_codes;
mod export;
mod route;
mod scan;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

use conferencia_config::Settings;
use conferencia_io::IoError;
use conferencia_recon::ReconError;

use app::App;
use exit_codes::{io_exit_code, recon_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use export::ExportFormat;
use route::RouteCommands;

#[derive(Parser)]
#[command(name = "conferencia")]
#[command(about = "Route conference: check scanned shipments against loading routes")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Directory holding routes and session state
    #[arg(long, global = true, env = "CONFERENCIA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Settings file (default: <config dir>/conferencia/settings.json)
    #[arg(long, global = true, env = "CONFERENCIA_CONFIG")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage stored routes
    #[command(subcommand)]
    Route(RouteCommands),

    /// Check scanned ids against the selected route
    #[command(after_help = "\
Examples:
  conferencia scan 40000000001 40000000002
  barcode-reader | conferencia scan
  conferencia scan --json < reads.txt")]
    Scan {
        /// Raw scanner values; read stdin line by line when omitted
        ids: Vec<String>,

        /// One JSON object per scan
        #[arg(long)]
        json: bool,
    },

    /// Check a scan-result CSV (text/texto/id column) against the selected route
    #[command(name = "check-csv")]
    CheckCsv {
        file: PathBuf,

        /// Output the batch summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the selected route (csv, txt) or every route (xlsx)
    #[command(after_help = "\
Examples:
  conferencia export csv
  conferencia export txt --output reports/
  conferencia export xlsx --output all-routes.xlsx")]
    Export {
        #[arg(value_enum)]
        format: ExportFormat,

        /// Output file, or directory for the default file name
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
        "\nstore:   conferencia.routes.v1",
    )
}

fn verbosity_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn level_from_name(name: &str) -> Option<LevelFilter> {
    match name.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// Install the terminal logger. Everything goes to stderr so stdout stays
/// machine-readable.
fn init_logging(verbose: u8) {
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Debug)
        .build();
    if TermLogger::init(LevelFilter::Trace, config, TerminalMode::Stderr, ColorChoice::Auto).is_ok() {
        log::set_max_level(verbosity_filter(verbose));
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    if cli.verbose == 0 {
        match level_from_name(&settings.log_level) {
            Some(level) => log::set_max_level(level),
            None => log::warn!("unknown log.level '{}'", settings.log_level),
        }
    }

    let mut app = App::open(settings, cli.data_dir);

    let result = match cli.command {
        Commands::Route(cmd) => route::cmd_route(&mut app, cmd),
        Commands::Scan { ids, json } => scan::cmd_scan(&mut app, ids, json),
        Commands::CheckCsv { file, json } => scan::cmd_check_csv(&mut app, &file, json),
        Commands::Export { format, output } => export::cmd_export(&app, format, output),
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
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from a domain error with its registered exit code.
    pub fn recon(err: &ReconError) -> Self {
        Self { code: recon_exit_code(err), message: err.to_string(), hint: None }
    }

    pub fn io_error(err: &IoError) -> Self {
        Self { code: io_exit_code(err), message: err.to_string(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
