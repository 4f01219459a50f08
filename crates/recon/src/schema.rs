//! Persisted registry document, `conferencia.routes.v1`.
//!
//! One JSON object mapping route id to a route record. Field names match the
//! documents written by earlier versions of the tool. Every field is optional
//! and loosely typed on read (see [`lenient`]); [`StoredRoute::into_route`]
//! migrates older shapes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReconError;
use crate::model::{Millis, Route};
use crate::registry::Registry;

/// Storage key (and file stem) of the persisted document.
pub const STORAGE_KEY: &str = "conferencia.routes.v1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredRoute {
    #[serde(deserialize_with = "lenient::text")]
    pub route_id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub cluster: String,
    #[serde(deserialize_with = "lenient::text")]
    pub destination_facility_id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub destination_facility_name: String,
    #[serde(deserialize_with = "lenient::count")]
    pub total_inicial: usize,
    #[serde(deserialize_with = "lenient::id_list")]
    pub ids: Vec<String>,
    #[serde(deserialize_with = "lenient::id_list")]
    pub faltantes: Vec<String>,
    #[serde(deserialize_with = "lenient::id_list")]
    pub conferidos: Vec<String>,
    #[serde(deserialize_with = "lenient::id_list")]
    pub fora_de_rota: Vec<String>,
    #[serde(deserialize_with = "lenient::timestamps")]
    pub timestamps: BTreeMap<String, Millis>,
    #[serde(deserialize_with = "lenient::counters")]
    pub duplicados: BTreeMap<String, u32>,
}

impl From<&Route> for StoredRoute {
    fn from(r: &Route) -> Self {
        Self {
            route_id: r.route_id.clone(),
            cluster: r.cluster.clone(),
            destination_facility_id: r.destination_facility_id.clone(),
            destination_facility_name: r.destination_facility_name.clone(),
            total_inicial: r.initial_expected_count,
            ids: r.ids.iter().cloned().collect(),
            faltantes: r.expected.iter().cloned().collect(),
            conferidos: r.verified.iter().cloned().collect(),
            fora_de_rota: r.off_route.iter().cloned().collect(),
            timestamps: r.last_seen_at.clone(),
            duplicados: r.duplicate_counts.clone(),
        }
    }
}

impl StoredRoute {
    /// Convert to the in-memory model, applying load-time migration:
    ///
    /// - empty `faltantes` with non-empty `ids` means an older document that
    ///   did not store pending ids: recompute them as `ids − conferidos`;
    /// - restore set disjointness (verified and off-route win over pending);
    /// - an off-route id that the manifest (`ids`) lists goes back to pending,
    ///   as a re-import would do;
    /// - drop counters and timestamps for ids that were never read.
    pub fn into_route(self, key: &str) -> Route {
        let route_id = if self.route_id.trim().is_empty() {
            key.to_string()
        } else {
            self.route_id
        };

        let ids: BTreeSet<String> = self.ids.into_iter().collect();
        let verified: BTreeSet<String> = self.conferidos.into_iter().collect();
        let mut off_route: BTreeSet<String> = self.fora_de_rota.into_iter().collect();
        let mut expected: BTreeSet<String> = self.faltantes.into_iter().collect();

        if expected.is_empty() && !ids.is_empty() {
            expected = ids.difference(&verified).cloned().collect();
            log::info!("route {route_id}: rebuilt {} pending id(s) from ids", expected.len());
        }

        let before = expected.len() + off_route.len();
        off_route.retain(|id| !verified.contains(id));
        expected.retain(|id| !verified.contains(id) && !off_route.contains(id));
        let repaired = before - expected.len() - off_route.len();
        if repaired > 0 {
            log::warn!("route {route_id}: repaired {repaired} overlapping id(s)");
        }

        let listed: Vec<String> = off_route.intersection(&ids).cloned().collect();
        if !listed.is_empty() {
            log::warn!(
                "route {route_id}: {} off-route id(s) are in the manifest, moved back to pending",
                listed.len()
            );
            for id in listed {
                off_route.remove(&id);
                expected.insert(id);
            }
        }

        let was_read = |id: &String| verified.contains(id) || off_route.contains(id);
        let duplicate_counts = self
            .duplicados
            .into_iter()
            .filter(|(id, count)| *count > 1 && was_read(id))
            .collect();
        let last_seen_at = self
            .timestamps
            .into_iter()
            .filter(|(id, _)| was_read(id))
            .collect();

        Route {
            route_id,
            cluster: self.cluster,
            destination_facility_id: self.destination_facility_id,
            destination_facility_name: self.destination_facility_name,
            ids,
            expected,
            verified,
            off_route,
            duplicate_counts,
            last_seen_at,
            initial_expected_count: self.total_inicial,
        }
    }
}

impl Registry {
    /// Decode a persisted document. Selection is not part of it.
    ///
    /// Only a document that is not a JSON object is an error. A single route
    /// record that cannot be read is skipped with a warning.
    pub fn from_document(json: &str) -> Result<Self, ReconError> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        let stored: BTreeMap<String, Value> =
            serde_json::from_str(json).map_err(|e| ReconError::Schema(e.to_string()))?;

        let mut routes = Vec::with_capacity(stored.len());
        for (key, value) in stored {
            match serde_json::from_value::<StoredRoute>(value) {
                Ok(record) => routes.push(record.into_route(&key)),
                Err(e) => log::warn!("route {key}: unreadable record skipped: {e}"),
            }
        }
        Ok(Self::from_routes(routes))
    }

    pub fn to_document(&self) -> Result<String, ReconError> {
        let stored: BTreeMap<&str, StoredRoute> = self
            .routes()
            .map(|r| (r.route_id.as_str(), StoredRoute::from(r)))
            .collect();
        serde_json::to_string_pretty(&stored).map_err(|e| ReconError::Schema(e.to_string()))
    }
}

/// Loose readers for fields that older documents stored with other types:
/// nulls, numbers where strings belong, dates where epoch millis belong.
pub mod lenient {
    use std::collections::BTreeMap;

    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use crate::model::Millis;

    /// Offset assumed for dates written without one (Brasília).
    pub const LEGACY_UTC_OFFSET_MINUTES: i64 = -180;

    const LOCAL_FORMATS: &[&str] = &[
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%d/%m/%YT%H:%M:%S",
        "%d/%m/%YT%H:%M",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];

    fn scalar(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// String, number or null. Anything else reads as empty.
    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(scalar(Value::deserialize(deserializer)?).unwrap_or_default())
    }

    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        })
    }

    /// A list of ids. Numeric entries become strings; null and blank entries
    /// are dropped.
    pub fn id_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(scalar)
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        })
    }

    pub fn timestamps<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Millis>, D::Error> {
        let mut out = BTreeMap::new();
        let Value::Object(map) = Value::deserialize(deserializer)? else {
            return Ok(out);
        };
        for (id, value) in map {
            match parse_timestamp(&value) {
                Some(at) => {
                    out.insert(id, at);
                }
                None => log::warn!("{id}: dropping unreadable timestamp {value}"),
            }
        }
        Ok(out)
    }

    pub fn counters<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, u32>, D::Error> {
        let mut out = BTreeMap::new();
        let Value::Object(map) = Value::deserialize(deserializer)? else {
            return Ok(out);
        };
        for (id, value) in map {
            let count = match &value {
                Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            };
            match count {
                Some(count) => {
                    out.insert(id, count);
                }
                None => log::warn!("{id}: dropping unreadable duplicate count {value}"),
            }
        }
        Ok(out)
    }

    /// Epoch millis from a number, a digit string, an RFC 3339 date, or a
    /// `dd/mm/yyyy HH:MM[:SS]` local date.
    pub fn parse_timestamp(value: &Value) -> Option<Millis> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => parse_timestamp_text(s.trim()),
            _ => None,
        }
    }

    fn parse_timestamp_text(s: &str) -> Option<Millis> {
        if s.is_empty() {
            return None;
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            return s.parse().ok();
        }
        if let Ok(at) = chrono::DateTime::parse_from_rfc3339(s) {
            return Some(at.timestamp_millis());
        }
        LOCAL_FORMATS.iter().find_map(|format| {
            NaiveDateTime::parse_from_str(s, format).ok().map(|local| {
                local.and_utc().timestamp_millis() - LEGACY_UTC_OFFSET_MINUTES * 60_000
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut r = Route::new("123");
        r.cluster = "J2".into();
        r.ids.extend(["40000000001".to_string(), "40000000002".to_string()]);
        r.expected.insert("40000000002".into());
        r.verified.insert("40000000001".into());
        r.off_route.insert("40000000009".into());
        r.duplicate_counts.insert("40000000001".into(), 2);
        r.last_seen_at.insert("40000000001".into(), 1000);
        r.last_seen_at.insert("40000000009".into(), 2000);
        r.initial_expected_count = 2;

        let reg = Registry::from_routes([r.clone()]);
        let doc = reg.to_document().unwrap();
        let back = Registry::from_document(&doc).unwrap();
        assert_eq!(back.get("123"), Some(&r));
    }

    #[test]
    fn persisted_field_names() {
        let reg = Registry::from_routes([Route::new("5")]);
        let value: serde_json::Value = serde_json::from_str(&reg.to_document().unwrap()).unwrap();
        let rec = &value["5"];
        for key in [
            "routeId",
            "cluster",
            "destinationFacilityId",
            "destinationFacilityName",
            "totalInicial",
            "ids",
            "faltantes",
            "conferidos",
            "foraDeRota",
            "timestamps",
            "duplicados",
        ] {
            assert!(rec.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn legacy_document_rebuilds_pending() {
        let doc = r#"{"9": {"ids": ["40000000001", "40000000002"], "conferidos": ["40000000001"]}}"#;
        let reg = Registry::from_document(doc).unwrap();
        let r = reg.get("9").unwrap();
        assert_eq!(r.route_id, "9");
        assert_eq!(r.expected.iter().collect::<Vec<_>>(), vec!["40000000002"]);
        assert_eq!(r.initial_expected_count, 0);
    }

    #[test]
    fn overlapping_sets_repaired() {
        let doc = r#"{"1": {
            "routeId": "1",
            "faltantes": ["40000000001", "40000000002"],
            "conferidos": ["40000000001"],
            "foraDeRota": ["40000000001", "40000000003"],
            "duplicados": {"40000000003": 2, "40000000002": 4},
            "timestamps": {"40000000003": 5, "40000000077": 9}
        }}"#;
        let reg = Registry::from_document(doc).unwrap();
        let r = reg.get("1").unwrap();
        assert!(r.expected.contains("40000000002"));
        assert!(!r.expected.contains("40000000001"));
        assert!(!r.off_route.contains("40000000001"));
        assert!(r.off_route.contains("40000000003"));
        assert_eq!(r.duplicate_counts.len(), 1);
        assert_eq!(r.last_seen_at.len(), 1);
    }

    #[test]
    fn null_and_numeric_fields_tolerated() {
        let doc = r#"{
            "1": {"routeId": 1, "cluster": null, "destinationFacilityName": null,
                  "totalInicial": "2", "ids": ["40000000001", 40000000002, null],
                  "faltantes": null, "conferidos": ["40000000001"]},
            "2": {"routeId": "2", "cluster": "J2", "faltantes": ["40000000003"], "totalInicial": 1}
        }"#;
        let reg = Registry::from_document(doc).unwrap();
        assert_eq!(reg.len(), 2);

        let r = reg.get("1").unwrap();
        assert_eq!(r.cluster, "");
        assert_eq!(r.initial_expected_count, 2);
        assert_eq!(r.ids.len(), 2);
        assert_eq!(r.expected.iter().collect::<Vec<_>>(), vec!["40000000002"]);
        assert_eq!(reg.get("2").unwrap().cluster, "J2");
    }

    #[test]
    fn string_timestamps_parsed() {
        let doc = r#"{"1": {
            "routeId": "1",
            "conferidos": ["40000000001", "40000000002", "40000000003", "40000000004"],
            "timestamps": {
                "40000000001": "05/01/2026 08:30",
                "40000000002": "2026-01-05T11:30:15.000Z",
                "40000000003": "1767612600000",
                "40000000004": "ontem"
            },
            "duplicados": {"40000000001": "3", "40000000002": "muitos"}
        }}"#;
        let reg = Registry::from_document(doc).unwrap();
        let r = reg.get("1").unwrap();
        assert_eq!(r.last_seen_at.get("40000000001"), Some(&1_767_612_600_000));
        assert_eq!(r.last_seen_at.get("40000000002"), Some(&1_767_612_615_000));
        assert_eq!(r.last_seen_at.get("40000000003"), Some(&1_767_612_600_000));
        assert!(!r.last_seen_at.contains_key("40000000004"));
        assert_eq!(r.duplicate_counts.get("40000000001"), Some(&3));
        assert!(!r.duplicate_counts.contains_key("40000000002"));
    }

    #[test]
    fn unreadable_route_record_skipped() {
        let doc = r#"{"1": null, "2": {"routeId": "2", "faltantes": ["40000000001"]}}"#;
        let reg = Registry::from_document(doc).unwrap();
        assert!(!reg.contains("1"));
        assert!(reg.contains("2"));
    }

    #[test]
    fn manifest_listed_off_route_id_back_to_pending() {
        let doc = r#"{"1": {
            "routeId": "1",
            "ids": ["40000000001", "40000000002"],
            "faltantes": ["40000000001"],
            "foraDeRota": ["40000000002"],
            "timestamps": {"40000000002": 10},
            "duplicados": {"40000000002": 2}
        }}"#;
        let reg = Registry::from_document(doc).unwrap();
        let r = reg.get("1").unwrap();
        assert!(r.off_route.is_empty());
        assert!(r.expected.contains("40000000002"));
        assert!(r.last_seen_at.is_empty());
        assert!(r.duplicate_counts.is_empty());
    }

    #[test]
    fn blank_document_is_empty_registry() {
        assert!(Registry::from_document("  ").unwrap().is_empty());
        assert!(Registry::from_document("{}").unwrap().is_empty());
    }

    #[test]
    fn garbage_document_errors() {
        assert!(matches!(
            Registry::from_document("[1,2]"),
            Err(ReconError::Schema(_))
        ));
    }
}
