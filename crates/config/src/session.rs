use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SESSION_VERSION: u32 = 1;

/// Per data-dir session state: which route the operator is working on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Session {
    pub version: u32,
    pub current_route_id: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            version: SESSION_VERSION,
            current_route_id: None,
        }
    }
}

impl Session {
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join("session.json")
    }

    pub fn load(data_dir: &Path) -> Option<Self> {
        let path = Self::path(data_dir);
        fs::read_to_string(&path).ok()
            .and_then(|s| serde_json::from_str(&s).ok())
    }

    pub fn save(&self, data_dir: &Path) -> Result<(), String> {
        let path = Self::path(data_dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(&path, json).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_session_is_none() {
        let dir = tempdir().unwrap();
        assert_eq!(Session::load(dir.path()), None);
    }

    #[test]
    fn round_trip() {
        let dir = tempdir().unwrap();
        let session = Session {
            current_route_id: Some("123".into()),
            ..Session::default()
        };
        session.save(dir.path()).unwrap();
        assert_eq!(Session::load(dir.path()), Some(session));
        let raw = fs::read_to_string(Session::path(dir.path())).unwrap();
        assert!(raw.contains("\"currentRouteId\""));
    }
}
