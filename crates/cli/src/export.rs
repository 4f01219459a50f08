//! `conferencia export`: route CSV / text report, all-routes workbook.

use std::path::PathBuf;

use clap::ValueEnum;

use conferencia_io::csv::export_route_csv;
use conferencia_io::output_path;
use conferencia_io::text::export_route_text;
use conferencia_io::xlsx::export_all_routes;
use conferencia_recon::engine::now_millis;
use conferencia_recon::report::{csv_file_name, text_file_name, xlsx_file_name};

use crate::app::App;
use crate::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Scan-result CSV of the selected route
    Csv,
    /// Sectioned text report of the selected route
    Txt,
    /// Workbook with one column per stored route
    Xlsx,
}

pub fn cmd_export(app: &App, format: ExportFormat, output: Option<PathBuf>) -> Result<(), CliError> {
    let now = now_millis();

    let path = match format {
        ExportFormat::Csv | ExportFormat::Txt => {
            let route_id = app.require_current_id()?;
            let Some(route) = app.registry.get(&route_id) else {
                return Err(CliError::args(format!("route not found: {route_id}")));
            };
            if format == ExportFormat::Csv {
                let path = output_path(output.as_deref(), &csv_file_name(route));
                export_route_csv(route, &app.export_zone(), now, &path)
                    .map_err(|e| CliError::io_error(&e))?;
                path
            } else {
                let path = output_path(output.as_deref(), &text_file_name(route));
                export_route_text(route, &path).map_err(|e| CliError::io_error(&e))?;
                path
            }
        }
        ExportFormat::Xlsx => {
            let path = output_path(output.as_deref(), &xlsx_file_name(&app.export_zone(), now));
            export_all_routes(&app.registry, &path).map_err(|e| CliError::io_error(&e))?;
            path
        }
    };

    println!("wrote {}", path.display());
    Ok(())
}
