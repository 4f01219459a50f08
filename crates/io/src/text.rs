// Plain-text route report

use std::path::Path;

use conferencia_recon::model::Route;
use conferencia_recon::report::{render_text, report_sections};
use conferencia_recon::ReconError;

use crate::error::IoError;
use crate::store::atomic_write;

/// Write the sectioned report. A route with nothing in any section is an
/// error and leaves no file behind.
pub fn export_route_text(route: &Route, path: &Path) -> Result<(), IoError> {
    let sections = report_sections(route);
    if sections.is_empty() {
        return Err(ReconError::NothingToExport.into());
    }
    atomic_write(path, render_text(&sections).as_bytes())?;
    log::info!("route {}: wrote report to {}", route.route_id, path.display());
    Ok(())
}
