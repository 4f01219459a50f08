//! `conferencia route`: route registry management.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Subcommand;

use conferencia_io::csv::read_file_as_utf8;
use conferencia_recon::import::{parse_json, parse_toml, ImportReport, RouteImport};
use conferencia_recon::model::RouteSummary;

use crate::app::App;
use crate::exit_codes::EXIT_IMPORT_INVALID;
use crate::CliError;

#[derive(Subcommand)]
pub enum RouteCommands {
    /// Import routes from JSON or TOML manifests (merged into existing routes)
    #[command(after_help = "\
Examples:
  conferencia route import routes.json
  conferencia route import morning.toml afternoon.toml

Manifest shape (JSON):
  {\"routeId\": \"123\", \"cluster\": \"J2\", \"expectedIds\": [\"40000000001\", ...]}
  or a list of such objects. TOML uses the same keys, top level or [[routes]].")]
    Import {
        /// Manifest files (.json or .toml)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Add or extend a route from ids typed on the command line, and select it
    #[command(after_help = "\
Examples:
  conferencia route add 123 --cluster J2 40000000001 40000000002
  conferencia route add 123 \"40000000003;40000000004\"")]
    Add {
        /// Route id
        route_id: String,

        /// Cluster label (kept unchanged when omitted)
        #[arg(long)]
        cluster: Option<String>,

        /// Shipment ids (whitespace, comma or semicolon separated)
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// List stored routes with their progress
    List {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Select the route to check scans against
    Select {
        route_id: String,
    },

    /// Delete one route
    Delete {
        route_id: String,
    },

    /// Delete every stored route
    Clear {
        /// Confirm deleting all routes
        #[arg(long)]
        yes: bool,
    },

    /// Show the selected route
    Show {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_route(app: &mut App, cmd: RouteCommands) -> Result<(), CliError> {
    match cmd {
        RouteCommands::Import { files } => cmd_route_import(app, &files),
        RouteCommands::Add { route_id, cluster, ids } => cmd_route_add(app, &route_id, cluster, &ids),
        RouteCommands::List { json } => cmd_route_list(app, json),
        RouteCommands::Select { route_id } => {
            app.registry.select(&route_id).map_err(|e| {
                CliError::recon(&e).with_hint("see stored routes with: conferencia route list")
            })?;
            app.persist();
            println!("selected {}", label_of(app, &route_id));
            Ok(())
        }
        RouteCommands::Delete { route_id } => {
            let removed = app.registry.delete(&route_id).map_err(|e| CliError::recon(&e))?;
            app.persist();
            println!("deleted {}", removed.label());
            Ok(())
        }
        RouteCommands::Clear { yes } => {
            if !yes {
                return Err(CliError::args("refusing to delete all routes without --yes")
                    .with_hint("conferencia route clear --yes"));
            }
            let count = app.registry.len();
            app.registry.clear();
            app.persist();
            println!("deleted {count} route(s)");
            Ok(())
        }
        RouteCommands::Show { json } => cmd_route_show(app, json),
    }
}

fn label_of(app: &App, route_id: &str) -> String {
    app.registry
        .get(route_id)
        .map(|r| r.label())
        .unwrap_or_else(|| route_id.to_string())
}

// ============================================================================
// import / add
// ============================================================================

fn parse_manifest(path: &Path) -> Result<Vec<RouteImport>, CliError> {
    let content = read_file_as_utf8(path).map_err(|e| CliError::io_error(&e))?;
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
    let parsed = if is_toml { parse_toml(&content) } else { parse_json(&content) };
    parsed.map_err(|e| CliError::recon(&e).with_hint(format!("in {}", path.display())))
}

fn cmd_route_import(app: &mut App, files: &[PathBuf]) -> Result<(), CliError> {
    let mut imported = 0;
    let mut failed = Vec::new();

    for path in files {
        for import in parse_manifest(path)? {
            let route_id = import.route_id.clone();
            match app.registry.import_route(import) {
                Ok(report) => {
                    print_import(&report);
                    imported += 1;
                }
                Err(e) => {
                    log::warn!("{}: {e}", path.display());
                    failed.push(format!("{route_id}: {e}"));
                }
            }
        }
    }

    if imported > 0 {
        app.persist();
    }
    println!("{imported} route(s) imported");

    if failed.is_empty() {
        Ok(())
    } else {
        Err(CliError {
            code: EXIT_IMPORT_INVALID,
            message: format!("{} entr(ies) skipped: {}", failed.len(), failed.join("; ")),
            hint: None,
        })
    }
}

fn cmd_route_add(
    app: &mut App,
    route_id: &str,
    cluster: Option<String>,
    ids: &[String],
) -> Result<(), CliError> {
    let (import, rejected) = RouteImport::manual(route_id, cluster.as_deref(), &ids.join(" "));
    for token in &rejected {
        eprintln!("ignored (not a shipment id): {token}");
    }

    let report = app.registry.import_route(import).map_err(|e| CliError::recon(&e))?;
    app.registry
        .select(&report.route_id)
        .map_err(|e| CliError::recon(&e))?;
    app.persist();

    print_import(&report);
    println!("selected {}", label_of(app, &report.route_id));
    Ok(())
}

fn print_import(report: &ImportReport) {
    let verb = if report.created { "created" } else { "updated" };
    let mut line = format!(
        "route {} {verb}: {} new id(s), {} expected in total",
        report.route_id, report.added, report.initial_expected
    );
    if report.already_verified > 0 {
        line.push_str(&format!(", {} already verified", report.already_verified));
    }
    if report.invalid > 0 {
        line.push_str(&format!(", {} invalid skipped", report.invalid));
    }
    println!("{line}");
}

// ============================================================================
// list / show
// ============================================================================

fn cmd_route_list(app: &App, json: bool) -> Result<(), CliError> {
    let current = app.registry.current_id();
    let routes = app.registry.routes_sorted();

    if json {
        let entries: Vec<serde_json::Value> = routes
            .iter()
            .map(|r| {
                let mut v = summary_json(&r.summary())?;
                v["selected"] = serde_json::Value::Bool(current == Some(r.route_id.as_str()));
                Ok(v)
            })
            .collect::<Result<_, CliError>>()?;
        return print_json(&entries);
    }

    if routes.is_empty() {
        println!("no routes stored");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for r in routes {
        let s = r.summary();
        let marker = if current == Some(r.route_id.as_str()) { "*" } else { " " };
        writeln!(
            out,
            "{marker} {:<40} {:>5}/{:<5} {:>3}%",
            s.label, s.verified, s.initial_expected, s.progress_percent
        )
        .map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}

fn cmd_route_show(app: &App, json: bool) -> Result<(), CliError> {
    let route_id = app.require_current_id()?;
    let Some(route) = app.registry.get(&route_id) else {
        return Err(CliError::args(format!("route not found: {route_id}")));
    };
    let s = route.summary();

    if json {
        return print_json(&summary_json(&s)?);
    }

    println!("{}", s.label);
    if !s.destination_facility_name.is_empty() {
        println!("destination:  {}", s.destination_facility_name);
    }
    println!("progress:     {}% ({}/{})", s.progress_percent, s.verified, s.initial_expected);
    println!("verified:     {}", s.verified);
    println!("pending:      {}", s.expected);
    if s.live_total != s.initial_expected {
        println!("listed now:   {}", s.live_total);
    }
    println!("off-route:    {}", s.off_route);
    println!("duplicates:   {}", s.duplicates);
    Ok(())
}

fn summary_json(summary: &RouteSummary) -> Result<serde_json::Value, CliError> {
    serde_json::to_value(summary).map_err(|e| CliError::io(format!("JSON serialization error: {e}")))
}

pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let s = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
    println!("{s}");
    Ok(())
}
