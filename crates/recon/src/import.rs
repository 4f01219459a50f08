//! Merging externally extracted route batches into the registry.
//!
//! The extractor (HTML scrape, manual paste) is outside this crate; it hands
//! over route metadata plus the expected shipment ids.

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::normalize::{normalize, normalize_list};
use crate::registry::Registry;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteImport {
    #[serde(deserialize_with = "string_or_number")]
    pub route_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_facility_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_facility_name: Option<String>,
    #[serde(default, alias = "ids")]
    pub expected_ids: Vec<String>,
}

impl RouteImport {
    /// Manual entry: a route id plus a pasted list of ids.
    /// Returns the import and the tokens the normalizer rejected.
    pub fn manual(route_id: &str, cluster: Option<&str>, pasted: &str) -> (Self, Vec<String>) {
        let (ids, rejected) = normalize_list(pasted);
        let import = Self {
            route_id: route_id.trim().to_string(),
            cluster: cluster.map(str::trim).filter(|c| !c.is_empty()).map(str::to_string),
            expected_ids: ids,
            ..Self::default()
        };
        (import, rejected)
    }
}

/// What an import did to one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub route_id: String,
    pub created: bool,
    /// Ids newly added to `expected`.
    pub added: usize,
    /// Ids skipped because they were already verified.
    pub already_verified: usize,
    /// Ids the normalizer rejected.
    pub invalid: usize,
    pub initial_expected: usize,
}

// ---------------------------------------------------------------------------
// Manifest parsing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonManifest {
    Many(Vec<RouteImport>),
    One(RouteImport),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TomlManifest {
    Many { routes: Vec<RouteImport> },
    One(RouteImport),
}

/// Parse a JSON import file: one route object or a list of them.
pub fn parse_json(input: &str) -> Result<Vec<RouteImport>, ReconError> {
    let manifest: JsonManifest =
        serde_json::from_str(input).map_err(|e| ReconError::ImportParse(e.to_string()))?;
    Ok(match manifest {
        JsonManifest::Many(v) => v,
        JsonManifest::One(r) => vec![r],
    })
}

/// Parse a TOML import file: top-level route fields, or `[[routes]]` tables.
pub fn parse_toml(input: &str) -> Result<Vec<RouteImport>, ReconError> {
    let manifest: TomlManifest =
        toml::from_str(input).map_err(|e| ReconError::ImportParse(e.to_string()))?;
    Ok(match manifest {
        TomlManifest::Many { routes } => routes,
        TomlManifest::One(r) => vec![r],
    })
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s.trim().to_string(),
        Raw::Int(n) => n.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

impl Registry {
    /// Create or merge a route from an import batch. Never replaces an
    /// existing route: scans already made survive re-import.
    pub fn import_route(&mut self, import: RouteImport) -> Result<ImportReport, ReconError> {
        let route_id = import.route_id.trim().to_string();
        if route_id.is_empty() {
            return Err(ReconError::MissingRouteId);
        }

        let mut ids = Vec::with_capacity(import.expected_ids.len());
        let mut invalid = 0;
        for raw in &import.expected_ids {
            match normalize(raw) {
                Some(id) => ids.push(id),
                None => invalid += 1,
            }
        }
        if ids.is_empty() {
            return Err(ReconError::EmptyImport { route_id });
        }

        let (route, created) = self.entry(&route_id);

        if let Some(cluster) = non_empty(import.cluster) {
            route.cluster = cluster;
        }
        if let Some(fac) = non_empty(import.destination_facility_id) {
            route.destination_facility_id = fac;
        }
        if let Some(name) = non_empty(import.destination_facility_name) {
            route.destination_facility_name = name;
        }

        let mut added = 0;
        let mut already_verified = 0;
        for id in ids {
            route.ids.insert(id.clone());
            if route.verified.contains(&id) {
                already_verified += 1;
                continue;
            }
            if route.off_route.remove(&id) {
                // Scanned here before the manifest listed it: now it is
                // merely pending again.
                route.duplicate_counts.remove(&id);
                route.last_seen_at.remove(&id);
            }
            if route.expected.insert(id) {
                added += 1;
            }
        }

        route.snapshot_initial_count();
        log::info!(
            "route {route_id}: imported {added} id(s), {} expected in total",
            route.initial_expected_count
        );

        Ok(ImportReport {
            route_id,
            created,
            added,
            already_verified,
            invalid,
            initial_expected: route.initial_expected_count,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(route_id: &str, ids: &[&str]) -> RouteImport {
        RouteImport {
            route_id: route_id.into(),
            expected_ids: ids.iter().map(|s| s.to_string()).collect(),
            ..RouteImport::default()
        }
    }

    #[test]
    fn creates_route_and_freezes_total() {
        let mut reg = Registry::new();
        let report = reg.import_route(batch("77", &["40000000001", "40000000002"])).unwrap();
        assert!(report.created);
        assert_eq!(report.added, 2);
        let r = reg.get("77").unwrap();
        assert_eq!(r.initial_expected_count, 2);
        assert_eq!(r.ids.len(), 2);
    }

    #[test]
    fn reimport_merges_and_keeps_verified() {
        let mut reg = Registry::new();
        reg.import_route(batch("77", &["40000000001", "40000000002"])).unwrap();
        {
            let r = reg.get_mut("77").unwrap();
            r.expected.remove("40000000001");
            r.verified.insert("40000000001".into());
        }
        let report = reg
            .import_route(batch("77", &["40000000001", "40000000003"]))
            .unwrap();
        assert!(!report.created);
        assert_eq!(report.added, 1);
        assert_eq!(report.already_verified, 1);

        let r = reg.get("77").unwrap();
        assert!(!r.expected.contains("40000000001"));
        assert!(r.verified.contains("40000000001"));
        assert_eq!(r.expected.len(), 2);
        assert_eq!(r.initial_expected_count, 3);
    }

    #[test]
    fn off_route_id_becomes_expected() {
        let mut reg = Registry::new();
        reg.import_route(batch("1", &["40000000001"])).unwrap();
        {
            let r = reg.get_mut("1").unwrap();
            r.off_route.insert("40000000009".into());
            r.duplicate_counts.insert("40000000009".into(), 2);
        }
        reg.import_route(batch("1", &["40000000009"])).unwrap();
        let r = reg.get("1").unwrap();
        assert!(r.expected.contains("40000000009"));
        assert!(!r.off_route.contains("40000000009"));
        assert!(r.duplicate_counts.is_empty());
    }

    #[test]
    fn metadata_only_overridden_when_present() {
        let mut reg = Registry::new();
        let mut first = batch("1", &["40000000001"]);
        first.cluster = Some("J2".into());
        first.destination_facility_id = Some("SSP9".into());
        reg.import_route(first).unwrap();
        let mut second = batch("1", &["40000000002"]);
        second.cluster = Some("  ".into());
        reg.import_route(second).unwrap();
        let r = reg.get("1").unwrap();
        assert_eq!(r.cluster, "J2");
        assert_eq!(r.destination_facility_id, "SSP9");
    }

    #[test]
    fn empty_or_invalid_batch_rejected() {
        let mut reg = Registry::new();
        assert_eq!(
            reg.import_route(batch("1", &["x", "12"])),
            Err(ReconError::EmptyImport { route_id: "1".into() })
        );
        assert_eq!(reg.import_route(batch(" ", &["40000000001"])), Err(ReconError::MissingRouteId));
        assert!(reg.is_empty());
    }

    #[test]
    fn json_single_and_list() {
        let one = r#"{"routeId": 12345, "cluster": "J2", "expectedIds": ["40000000001"]}"#;
        let parsed = parse_json(one).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].route_id, "12345");
        assert_eq!(parsed[0].cluster.as_deref(), Some("J2"));

        let many = r#"[{"routeId": "1", "ids": ["40000000001"]}, {"routeId": "2"}]"#;
        let parsed = parse_json(many).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].expected_ids, vec!["40000000001"]);
        assert!(parsed[1].expected_ids.is_empty());
    }

    #[test]
    fn toml_tables() {
        let input = r#"
[[routes]]
routeId = "1"
destinationFacilityId = "SSP9"
destinationFacilityName = "Cajamar"
expectedIds = ["40000000001", "40000000002"]

[[routes]]
routeId = 2
expectedIds = ["40000000003"]
"#;
        let parsed = parse_toml(input).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].destination_facility_name.as_deref(), Some("Cajamar"));
        assert_eq!(parsed[1].route_id, "2");
    }

    #[test]
    fn manual_entry_normalizes() {
        let (import, rejected) = RouteImport::manual(" 9 ", Some(""), "40000000001;abc 40000000002");
        assert_eq!(import.route_id, "9");
        assert_eq!(import.cluster, None);
        assert_eq!(import.expected_ids, vec!["40000000001", "40000000002"]);
        assert_eq!(rejected, vec!["abc"]);
    }
}
