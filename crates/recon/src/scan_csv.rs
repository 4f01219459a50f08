//! Scan-result CSV files (exports of barcode reader apps, or our own CSV
//! export) as a batch of raw scanner values.

use crate::error::ReconError;

/// Header names that carry the scanned value, matched as lowercase substrings.
const VALUE_COLUMNS: &[&str] = &["text", "texto", "id"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCsv {
    pub header: Vec<String>,
    /// Index of the value column in `header`.
    pub column: usize,
    /// Unescaped cell values in file order, blank cells skipped.
    pub values: Vec<String>,
}

impl ScanCsv {
    /// Parse the whole file up front. A missing value column rejects the file.
    pub fn parse(text: &str) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut records = reader.records();
        let header: Vec<String> = match records.next() {
            Some(record) => record
                .map_err(|e| ReconError::Csv(e.to_string()))?
                .iter()
                .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
                .collect(),
            None => return Err(ReconError::EmptyCsv),
        };

        let column = find_value_column(&header)
            .ok_or_else(|| ReconError::MissingColumn { header: header.clone() })?;

        let mut values = Vec::new();
        for record in records {
            let record = record.map_err(|e| ReconError::Csv(e.to_string()))?;
            let Some(cell) = record.get(column) else {
                continue;
            };
            let value = unescape_cell(cell);
            if !value.is_empty() {
                values.push(value);
            }
        }

        Ok(Self { header, column, values })
    }
}

/// First header whose lowercase name contains one of the value column names.
pub fn find_value_column(header: &[String]) -> Option<usize> {
    header.iter().position(|h| {
        let lower = h.to_lowercase();
        VALUE_COLUMNS.iter().any(|name| lower.contains(name))
    })
}

/// Trim, strip one pair of surrounding quotes, collapse doubled quotes.
/// The CSV reader already unquotes well-formed fields; this handles readers
/// that double-quote the payload itself.
fn unescape_cell(cell: &str) -> String {
    let trimmed = cell.trim();
    let stripped = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let stripped = stripped.strip_suffix('"').unwrap_or(stripped);
    stripped.replace("\"\"", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn finds_column_case_insensitively() {
        assert_eq!(find_value_column(&header(&["Date", "TEXTO"])), Some(1));
        assert_eq!(find_value_column(&header(&["date", "Shipment ID"])), Some(1));
        assert_eq!(find_value_column(&header(&["date", "time"])), None);
    }

    #[test]
    fn first_matching_column_wins() {
        assert_eq!(find_value_column(&header(&["id", "text"])), Some(0));
    }

    #[test]
    fn parses_own_export_format() {
        let text = "date,time,time_zone,format,text,notes,favorite,date_utc,time_utc,metadata,duplicates\r\n\
                    2026-01-05,08:00:00,Horário Padrão de Brasília,Code 128,40000000001,,0,2026-01-05,11:00:00,,0\r\n";
        let scan = ScanCsv::parse(text).unwrap();
        assert_eq!(scan.column, 4);
        assert_eq!(scan.values, vec!["40000000001"]);
    }

    #[test]
    fn skips_blank_and_short_rows() {
        let text = "a,text\n1,40000000001\n\n2\n3,  \n4,\"40000000002\"\n";
        let scan = ScanCsv::parse(text).unwrap();
        assert_eq!(scan.values, vec!["40000000001", "40000000002"]);
    }

    #[test]
    fn unescapes_quoted_payload() {
        let text = "text\n\"\"\"{\"\"id\"\":40000000001}\"\"\"\n";
        let scan = ScanCsv::parse(text).unwrap();
        assert_eq!(scan.values, vec!["{\"id\":40000000001}"]);
    }

    #[test]
    fn bom_stripped_from_header() {
        let scan = ScanCsv::parse("\u{feff}text\n40000000001\n").unwrap();
        assert_eq!(scan.header, vec!["text"]);
    }

    #[test]
    fn empty_file_rejected() {
        assert_eq!(ScanCsv::parse(""), Err(ReconError::EmptyCsv));
    }

    #[test]
    fn missing_column_rejected() {
        let err = ScanCsv::parse("date,time\n1,2\n").unwrap_err();
        assert_eq!(err, ReconError::MissingColumn { header: header(&["date", "time"]) });
    }
}
