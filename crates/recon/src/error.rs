use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// No route is currently selected.
    NoRouteSelected,
    /// A route id that is not present in the registry.
    UnknownRoute(String),
    /// Import batch carried no usable identifiers.
    EmptyImport { route_id: String },
    /// Import batch without a route id.
    MissingRouteId,
    /// Import manifest could not be parsed (JSON or TOML).
    ImportParse(String),
    /// Scan-result CSV has no header row.
    EmptyCsv,
    /// Scan-result CSV header has no `text` / `texto` / `id` column.
    MissingColumn { header: Vec<String> },
    /// Scan-result CSV could not be read.
    Csv(String),
    /// Nothing eligible to export.
    NothingToExport,
    /// Persisted document could not be decoded.
    Schema(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRouteSelected => write!(f, "no route selected"),
            Self::UnknownRoute(id) => write!(f, "route not found: {id}"),
            Self::EmptyImport { route_id } => {
                write!(f, "route '{route_id}': no valid identifiers to import")
            }
            Self::MissingRouteId => write!(f, "import entry has no route id"),
            Self::ImportParse(msg) => write!(f, "import parse error: {msg}"),
            Self::EmptyCsv => write!(f, "CSV file is empty"),
            Self::MissingColumn { header } => write!(
                f,
                "no text/texto/id column found in CSV header [{}]",
                header.join(", ")
            ),
            Self::Csv(msg) => write!(f, "CSV read error: {msg}"),
            Self::NothingToExport => write!(f, "no identifiers to export"),
            Self::Schema(msg) => write!(f, "stored routes are unreadable: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
