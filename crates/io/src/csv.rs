// Scan-result CSV: reading files for check-csv, writing the route export

use std::fs;
use std::path::Path;

use conferencia_recon::model::{Millis, Route};
use conferencia_recon::report::{csv_records, ExportZone, CSV_HEADER};

use crate::error::IoError;
use crate::store::atomic_write;

/// Read file and convert to UTF-8 if needed. Scanner apps and spreadsheet
/// tools on Windows still emit Windows-1252.
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let bytes = fs::read(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_utf8_or_1252(bytes))
}

fn decode_utf8_or_1252(bytes: Vec<u8>) -> String {
    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            log::debug!("input is not UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

/// Render the route's export CSV. Header first, rows joined by CRLF, no
/// terminator after the last row.
pub fn render_route_csv(route: &Route, zone: &ExportZone, now: Millis) -> Result<Vec<u8>, IoError> {
    render_records(&csv_records(route, zone, now)?)
}

fn render_records(records: &[[String; 11]]) -> Result<Vec<u8>, IoError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .map_err(|e| IoError::Csv(e.to_string()))?;
    for record in records {
        writer
            .write_record(record)
            .map_err(|e| IoError::Csv(e.to_string()))?;
    }
    let mut bytes = writer.into_inner().map_err(|e| IoError::Csv(e.to_string()))?;
    if bytes.ends_with(b"\r\n") {
        bytes.truncate(bytes.len() - 2);
    }
    Ok(bytes)
}

/// Write the route's export CSV to `path`. Returns the number of data rows.
pub fn export_route_csv(
    route: &Route,
    zone: &ExportZone,
    now: Millis,
    path: &Path,
) -> Result<usize, IoError> {
    let records = csv_records(route, zone, now)?;
    let rows = records.len();
    let bytes = render_records(&records)?;
    atomic_write(path, &bytes)?;
    log::info!("route {}: exported {rows} row(s) to {}", route.route_id, path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conferencia_recon::ReconError;
    use tempfile::tempdir;

    fn scanned_route() -> Route {
        let mut r = Route::new("900");
        r.cluster = "J7".into();
        // 2026-01-05T11:30:15Z
        r.verified.insert("40000000001".into());
        r.last_seen_at.insert("40000000001".into(), 1_767_612_615_000);
        r
    }

    #[test]
    fn crlf_and_header() {
        let bytes = render_route_csv(&scanned_route(), &ExportZone::default(), 0).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.split("\r\n").collect();
        assert_eq!(
            lines[0],
            "date,time,time_zone,format,text,notes,favorite,date_utc,time_utc,metadata,duplicates"
        );
        assert_eq!(
            lines[1],
            "2026-01-05,08:30:15,Horário Padrão de Brasília,Code 128,40000000001,,0,2026-01-05,11:30:15,,0"
        );
        assert_eq!(lines.len(), 2);
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn nothing_to_export_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let err = export_route_csv(&Route::new("1"), &ExportZone::default(), 0, &path).unwrap_err();
        assert!(matches!(err, IoError::Recon(ReconError::NothingToExport)));
        assert!(!path.exists());
    }

    #[test]
    fn export_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("J7_900_padrao.csv");
        let rows = export_route_csv(&scanned_route(), &ExportZone::default(), 0, &path).unwrap();
        assert_eq!(rows, 1);
        assert!(fs::read_to_string(&path).unwrap().contains("40000000001"));
    }

    #[test]
    fn windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.csv");
        // "código" with 0xF3 for ó
        fs::write(&path, b"texto,c\xf3digo\r\n40000000001,x\r\n").unwrap();
        let text = read_file_as_utf8(&path).unwrap();
        assert!(text.starts_with("texto,código"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempdir().unwrap();
        let err = read_file_as_utf8(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, IoError::Read { .. }));
    }
}
