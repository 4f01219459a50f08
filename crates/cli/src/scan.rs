//! `conferencia scan` and `conferencia check-csv`.

use std::io::{self, BufRead, Write};
use std::path::Path;

use conferencia_io::csv::read_file_as_utf8;
use conferencia_recon::engine::now_millis;
use conferencia_recon::model::{Observation, ObservationOutcome, ScanSource};
use conferencia_recon::{check_csv, observe_raw_at};

use crate::app::App;
use crate::route::print_json;
use crate::CliError;

const BELL: &str = "\x07";

/// Scan ids given as arguments, or one per stdin line when there are none.
/// Stdin mode persists after every accepted read so an interrupted session
/// loses nothing.
pub fn cmd_scan(app: &mut App, ids: Vec<String>, json: bool) -> Result<(), CliError> {
    app.require_current_id()?;

    let stdout = io::stdout();
    if !ids.is_empty() {
        return scan_args(app, &ids, json, &mut stdout.lock());
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| CliError::io(format!("cannot read stdin: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }
        let obs = scan_one(app, &line);
        if obs.changed {
            app.persist();
        }
        print_observation(app, &obs, &line, json, &mut stdout.lock())?;
    }
    Ok(())
}

/// Apply every argument, then persist once. A failed write to `out` stops
/// the loop but reads already applied are still saved.
fn scan_args(app: &mut App, ids: &[String], json: bool, out: &mut impl Write) -> Result<(), CliError> {
    let mut changed = false;
    let mut result = Ok(());
    for raw in ids {
        let obs = scan_one(app, raw);
        changed |= obs.changed;
        result = print_observation(app, &obs, raw, json, out);
        if result.is_err() {
            break;
        }
    }
    if changed {
        app.persist();
    }
    result
}

fn scan_one(app: &mut App, raw: &str) -> Observation {
    let obs = observe_raw_at(&mut app.registry, raw, ScanSource::Scanner, now_millis());
    if obs.alert && app.settings.bell {
        eprint!("{BELL}");
    }
    obs
}

fn print_observation(
    app: &App,
    obs: &Observation,
    raw: &str,
    json: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let progress = app.registry.current().map(|r| r.summary());
    let written = if json {
        let line = serde_json::json!({
            "id": obs.id,
            "outcome": obs.outcome,
            "alert": obs.alert,
            "progress_percent": progress.as_ref().map(|p| p.progress_percent),
        });
        writeln!(out, "{line}")
    } else if let ObservationOutcome::Rejected { reason } = &obs.outcome {
        eprintln!("{}: {reason}", raw.trim());
        Ok(())
    } else {
        let (verified, total, pct) = progress
            .map(|p| (p.verified, p.initial_expected, p.progress_percent))
            .unwrap_or_default();
        writeln!(out, "{}  {}  [{verified}/{total} {pct}%]", obs.id, describe(obs))
    };
    written.map_err(|e| CliError::io(e.to_string()))
}

fn describe(obs: &Observation) -> String {
    match &obs.outcome {
        ObservationOutcome::Verified => "verified".to_string(),
        ObservationOutcome::Duplicate { total_reads } => format!("DUPLICATE ({total_reads} reads)"),
        ObservationOutcome::OffRoute { owner: Some(owner) } => {
            format!("OFF-ROUTE (belongs to route {owner})")
        }
        ObservationOutcome::OffRoute { owner: None } => "OFF-ROUTE".to_string(),
        ObservationOutcome::Rejected { reason } => reason.to_string(),
    }
}

pub fn cmd_check_csv(app: &mut App, file: &Path, json: bool) -> Result<(), CliError> {
    app.require_current_id()?;
    let text = read_file_as_utf8(file).map_err(|e| CliError::io_error(&e))?;

    let summary = check_csv(&mut app.registry, &text, now_millis())
        .map_err(|e| CliError::recon(&e).with_hint(format!("in {}", file.display())))?;
    app.persist();

    if json {
        return print_json(&summary);
    }

    let progress = app.registry.current().map(|r| r.progress_percent()).unwrap_or(0);
    println!("{} line(s) read from {}", summary.lines, file.display());
    println!("verified:     {}", summary.verified);
    println!("duplicates:   {}", summary.duplicates);
    println!("off-route:    {}", summary.off_route);
    if summary.unreadable > 0 {
        println!("unreadable:   {}", summary.unreadable);
    }
    println!("progress:     {progress}%");
    Ok(())
}
