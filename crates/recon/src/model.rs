use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Epoch milliseconds, as stored in the persisted `timestamps` map.
pub type Millis = i64;

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// One shipment manifest being checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Route {
    pub route_id: String,
    pub cluster: String,
    pub destination_facility_id: String,
    pub destination_facility_name: String,
    /// Every identifier ever imported for this route.
    pub ids: BTreeSet<String>,
    /// Awaiting a scan ("faltantes").
    pub expected: BTreeSet<String>,
    /// Matched ("conferidos").
    pub verified: BTreeSet<String>,
    /// Scanned here but not expected here ("fora de rota").
    pub off_route: BTreeSet<String>,
    /// Total observations for ids read more than once.
    pub duplicate_counts: BTreeMap<String, u32>,
    pub last_seen_at: BTreeMap<String, Millis>,
    /// `|expected ∪ verified|` frozen at the last import.
    pub initial_expected_count: usize,
}

impl Route {
    pub fn new(route_id: impl Into<String>) -> Self {
        Self {
            route_id: route_id.into(),
            ..Self::default()
        }
    }

    /// Listing label: `ROTA 123 • CLUSTER J2 • XPT SP01`.
    pub fn label(&self) -> String {
        let mut parts = vec![format!("ROTA {}", self.route_id)];
        if !self.cluster.is_empty() {
            parts.push(format!("CLUSTER {}", self.cluster));
        }
        if !self.destination_facility_id.is_empty() {
            parts.push(format!("XPT {}", self.destination_facility_id));
        }
        parts.join(" • ")
    }

    /// `|expected| + |verified|` from the live sets.
    pub fn live_total(&self) -> usize {
        self.expected.len() + self.verified.len()
    }

    /// Verified share of the frozen import total, floored. Zero when nothing
    /// was imported.
    pub fn progress_percent(&self) -> u32 {
        if self.initial_expected_count == 0 {
            return 0;
        }
        ((self.verified.len() * 100) / self.initial_expected_count) as u32
    }

    /// Total reads of an identifier: 0 if never read, 1 after the first read.
    pub fn total_reads(&self, id: &str) -> u32 {
        match self.duplicate_counts.get(id) {
            Some(count) => *count,
            None if self.verified.contains(id) || self.off_route.contains(id) => 1,
            None => 0,
        }
    }

    /// Re-freeze the progress denominator from the live sets.
    pub fn snapshot_initial_count(&mut self) {
        self.initial_expected_count = self.expected.union(&self.verified).count();
    }

    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            route_id: self.route_id.clone(),
            label: self.label(),
            cluster: self.cluster.clone(),
            destination_facility_id: self.destination_facility_id.clone(),
            destination_facility_name: self.destination_facility_name.clone(),
            initial_expected: self.initial_expected_count,
            expected: self.expected.len(),
            verified: self.verified.len(),
            live_total: self.live_total(),
            off_route: self.off_route.len(),
            duplicates: self.duplicate_counts.len(),
            progress_percent: self.progress_percent(),
        }
    }
}

/// Counters shown by `route show` / `route list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub route_id: String,
    pub label: String,
    pub cluster: String,
    pub destination_facility_id: String,
    pub destination_facility_name: String,
    pub initial_expected: usize,
    pub expected: usize,
    pub verified: usize,
    /// `expected + verified` right now; differs from `initial_expected`
    /// only for documents migrated from older shapes.
    pub live_total: usize,
    pub off_route: usize,
    pub duplicates: usize,
    pub progress_percent: u32,
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// Where an identifier came from. CSV batches never raise the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanSource {
    Scanner,
    CsvBatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The raw input had no extractable identifier.
    InvalidIdentifier,
    NoRouteSelected,
    /// The selected route id is not in the registry.
    UnknownRoute(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier => write!(f, "no valid identifier"),
            Self::NoRouteSelected => write!(f, "no route selected"),
            Self::UnknownRoute(id) => write!(f, "route not found: {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObservationOutcome {
    Verified,
    Duplicate {
        total_reads: u32,
    },
    OffRoute {
        /// Route that still expects (or already verified) the id, if any.
        owner: Option<String>,
    },
    Rejected {
        reason: RejectReason,
    },
}

impl ObservationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Duplicate { .. } => "duplicate",
            Self::OffRoute { .. } => "off_route",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// Result of one `observe` call plus the side effects the caller owes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub id: String,
    pub outcome: ObservationOutcome,
    /// Play the alert sound.
    pub alert: bool,
    /// State was mutated: refresh the view and persist.
    pub changed: bool,
}

impl Observation {
    pub(crate) fn rejected(id: impl Into<String>, reason: RejectReason) -> Self {
        Self {
            id: id.into(),
            outcome: ObservationOutcome::Rejected { reason },
            alert: false,
            changed: false,
        }
    }
}

/// Tally of a CSV batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub lines: usize,
    pub verified: usize,
    pub duplicates: usize,
    pub off_route: usize,
    /// Lines whose value had no extractable identifier.
    pub unreadable: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &ObservationOutcome) {
        match outcome {
            ObservationOutcome::Verified => self.verified += 1,
            ObservationOutcome::Duplicate { .. } => self.duplicates += 1,
            ObservationOutcome::OffRoute { .. } => self.off_route += 1,
            ObservationOutcome::Rejected { .. } => self.unreadable += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_skips_empty_parts() {
        let mut r = Route::new("123");
        assert_eq!(r.label(), "ROTA 123");
        r.cluster = "J2".into();
        r.destination_facility_id = "SSP9".into();
        assert_eq!(r.label(), "ROTA 123 • CLUSTER J2 • XPT SSP9");
    }

    #[test]
    fn progress_floors() {
        let mut r = Route::new("1");
        r.initial_expected_count = 3;
        r.verified.insert("40000000001".into());
        assert_eq!(r.progress_percent(), 33);
        r.verified.insert("40000000002".into());
        assert_eq!(r.progress_percent(), 66);
    }

    #[test]
    fn progress_zero_denominator() {
        let mut r = Route::new("1");
        r.verified.insert("40000000001".into());
        assert_eq!(r.progress_percent(), 0);
    }

    #[test]
    fn summary_reports_live_total() {
        let mut r = Route::new("1");
        r.initial_expected_count = 3;
        r.expected.insert("40000000001".into());
        r.verified.insert("40000000002".into());
        let s = r.summary();
        assert_eq!(s.live_total, 2);
        assert_eq!(s.initial_expected, 3);
    }

    #[test]
    fn total_reads_defaults() {
        let mut r = Route::new("1");
        assert_eq!(r.total_reads("40000000001"), 0);
        r.verified.insert("40000000001".into());
        assert_eq!(r.total_reads("40000000001"), 1);
        r.duplicate_counts.insert("40000000001".into(), 4);
        assert_eq!(r.total_reads("40000000001"), 4);
    }
}
