// All-routes XLSX workbook

use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, Workbook};

use conferencia_recon::report::route_columns;
use conferencia_recon::Registry;

use crate::error::IoError;

pub const SHEET_NAME: &str = "Bipagens";
pub const COLUMN_WIDTH: f64 = 18.0;

/// One column per route (route-id order), header row frozen, verified ids
/// below in reading order. Returns how many ids were written.
pub fn export_all_routes(registry: &Registry, path: &Path) -> Result<usize, IoError> {
    let columns = route_columns(registry)?;

    let mut workbook = Workbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(SHEET_NAME)
        .map_err(|e| IoError::Xlsx(format!("Failed to create sheet '{SHEET_NAME}': {e}")))?;

    let header_format = Format::new().set_bold().set_align(FormatAlign::Center);
    let mut written = 0;

    for (col, column) in columns.iter().enumerate() {
        // rust_xlsxwriter uses 0-based row/col as u32/u16
        let col = u16::try_from(col).map_err(|_| IoError::Xlsx("too many routes".into()))?;
        worksheet
            .set_column_width(col, COLUMN_WIDTH)
            .map_err(|e| IoError::Xlsx(format!("Failed to set column {col} width: {e}")))?;
        worksheet
            .write_string_with_format(0, col, &column.header, &header_format)
            .map_err(|e| IoError::Xlsx(format!("Failed to write header: {e}")))?;

        for (row, id) in column.ids.iter().enumerate() {
            let row = u32::try_from(row + 1).map_err(|_| IoError::Xlsx("too many rows".into()))?;
            worksheet
                .write_string(row, col, id)
                .map_err(|e| IoError::Xlsx(format!("Failed to write cell: {e}")))?;
            written += 1;
        }
    }

    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| IoError::Xlsx(format!("Failed to set freeze panes: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| IoError::write(parent, e))?;
    }
    workbook
        .save(path)
        .map_err(|e| IoError::Xlsx(format!("Failed to save XLSX file: {e}")))?;

    log::info!(
        "exported {written} id(s) across {} route(s) to {}",
        columns.len(),
        path.display()
    );
    Ok(written)
}
