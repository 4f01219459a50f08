//! Report rows and the shapes the export writers flatten them into.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::Serialize;

use crate::error::ReconError;
use crate::model::{Millis, Route};
use crate::registry::Registry;

/// Fixed header of the scan-result CSV export.
pub const CSV_HEADER: [&str; 11] = [
    "date",
    "time",
    "time_zone",
    "format",
    "text",
    "notes",
    "favorite",
    "date_utc",
    "time_utc",
    "metadata",
    "duplicates",
];

pub const BARCODE_FORMAT: &str = "Code 128";

pub const SECTION_VERIFIED: &str = "CONFERIDOS";
pub const SECTION_EXPECTED: &str = "FALTANTES";
pub const SECTION_OFF_ROUTE: &str = "FORA DE ROTA";
pub const SECTION_DUPLICATES: &str = "DUPLICADOS";

/// Local wall clock used for the `date`/`time` CSV columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportZone {
    /// Written verbatim into the `time_zone` column.
    pub label: String,
    pub utc_offset_minutes: i32,
}

impl Default for ExportZone {
    fn default() -> Self {
        Self {
            label: "Horário Padrão de Brasília".to_string(),
            utc_offset_minutes: -180,
        }
    }
}

impl ExportZone {
    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub identifier: String,
    pub read_at: Option<Millis>,
    /// Reads beyond the first.
    pub extra_read_count: u32,
}

/// Every read identifier of the route, in reading order.
pub fn build_report_rows(route: &Route) -> Vec<ReportRow> {
    let mut ids: Vec<&String> = route
        .verified
        .iter()
        .chain(route.off_route.iter())
        .chain(route.duplicate_counts.keys())
        .collect();
    ids.sort();
    ids.dedup();

    let mut rows: Vec<ReportRow> = ids
        .into_iter()
        .map(|id| ReportRow {
            identifier: id.clone(),
            read_at: route.last_seen_at.get(id).copied(),
            extra_read_count: route
                .duplicate_counts
                .get(id)
                .copied()
                .unwrap_or(1)
                .saturating_sub(1),
        })
        .collect();

    rows.sort_by(|a, b| {
        a.read_at
            .unwrap_or(0)
            .cmp(&b.read_at.unwrap_or(0))
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    rows
}

/// Flatten rows into CSV records matching [`CSV_HEADER`]. Rows without a
/// timestamp are stamped with `now`.
pub fn csv_records(
    route: &Route,
    zone: &ExportZone,
    now: Millis,
) -> Result<Vec<[String; 11]>, ReconError> {
    let rows = build_report_rows(route);
    if rows.is_empty() {
        return Err(ReconError::NothingToExport);
    }

    let offset = zone.offset();
    let fallback = to_utc(now).unwrap_or_else(Utc::now);

    Ok(rows
        .into_iter()
        .map(|row| {
            let utc = row.read_at.and_then(to_utc).unwrap_or(fallback);
            let local = utc.with_timezone(&offset);
            [
                local.format("%Y-%m-%d").to_string(),
                local.format("%H:%M:%S").to_string(),
                zone.label.clone(),
                BARCODE_FORMAT.to_string(),
                row.identifier,
                String::new(),
                "0".to_string(),
                utc.format("%Y-%m-%d").to_string(),
                utc.format("%H:%M:%S").to_string(),
                String::new(),
                row.extra_read_count.to_string(),
            ]
        })
        .collect())
}

fn to_utc(ms: Millis) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

/// `<cluster>_<route>_padrao.csv`, with placeholders for missing parts.
pub fn csv_file_name(route: &Route) -> String {
    format!("{}_{}_padrao.csv", cluster_or_default(route), route_or_default(route))
}

pub fn text_file_name(route: &Route) -> String {
    format!("{}_{}_relatorio.txt", cluster_or_default(route), route_or_default(route))
}

/// `bipagens_todas_rotas_<YYYY-MM-DD_HHMM>.xlsx` in the export zone.
pub fn xlsx_file_name(zone: &ExportZone, now: Millis) -> String {
    let local = to_utc(now).unwrap_or_else(Utc::now).with_timezone(&zone.offset());
    format!("bipagens_todas_rotas_{}.xlsx", local.format("%Y-%m-%d_%H%M"))
}

fn cluster_or_default(route: &Route) -> &str {
    match route.cluster.trim() {
        "" => "semCluster",
        c => c,
    }
}

fn route_or_default(route: &Route) -> &str {
    match route.route_id.trim() {
        "" => "semRota",
        r => r,
    }
}

// ---------------------------------------------------------------------------
// Sections (text / printable report)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub title: &'static str,
    pub entries: Vec<String>,
}

/// Non-empty report sections in fixed order.
pub fn report_sections(route: &Route) -> Vec<ReportSection> {
    let duplicates: Vec<String> = in_read_order(route, route.duplicate_counts.keys())
        .into_iter()
        .map(|id| {
            let count = route.duplicate_counts.get(&id).copied().unwrap_or(1);
            format!("{id} ({count}x)")
        })
        .collect();

    [
        (SECTION_VERIFIED, in_read_order(route, route.verified.iter())),
        (SECTION_EXPECTED, route.expected.iter().cloned().collect()),
        (SECTION_OFF_ROUTE, in_read_order(route, route.off_route.iter())),
        (SECTION_DUPLICATES, duplicates),
    ]
    .into_iter()
    .filter(|(_, entries)| !entries.is_empty())
    .map(|(title, entries)| ReportSection { title, entries })
    .collect()
}

/// Plain-text report: `TITLE:` followed by one id per line, sections
/// separated by a blank line.
pub fn render_text(sections: &[ReportSection]) -> String {
    let mut out = sections
        .iter()
        .map(|s| format!("{}:\n{}", s.title, s.entries.join("\n")))
        .collect::<Vec<_>>()
        .join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn in_read_order<'a>(route: &Route, ids: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut ids: Vec<&String> = ids.collect();
    ids.sort_by(|a, b| {
        let ta = route.last_seen_at.get(*a).copied().unwrap_or(0);
        let tb = route.last_seen_at.get(*b).copied().unwrap_or(0);
        ta.cmp(&tb).then_with(|| a.cmp(b))
    });
    ids.into_iter().cloned().collect()
}

// ---------------------------------------------------------------------------
// All-routes workbook
// ---------------------------------------------------------------------------

/// One spreadsheet column: a route and the ids verified in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteColumn {
    pub header: String,
    pub ids: Vec<String>,
}

/// Columns for every route, in route-id order.
pub fn route_columns(registry: &Registry) -> Result<Vec<RouteColumn>, ReconError> {
    if registry.is_empty() {
        return Err(ReconError::NothingToExport);
    }
    Ok(registry
        .routes()
        .map(|route| {
            let cluster = route.cluster.trim();
            let header = if cluster.is_empty() {
                route.route_id.clone()
            } else {
                format!("{}-{}", route.route_id, cluster)
            };
            RouteColumn {
                header,
                ids: in_read_order(route, route.verified.iter()),
            }
        })
        .collect())
}
