// Route registry persistence

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use conferencia_recon::schema::STORAGE_KEY;
use conferencia_recon::Registry;

use crate::error::IoError;

/// The registry document on disk: `<data_dir>/conferencia.routes.v1.json`.
#[derive(Debug, Clone)]
pub struct RouteStore {
    path: PathBuf,
}

impl RouteStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(format!("{STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry. A missing file is an empty registry. An unreadable
    /// one is logged, copied aside to `.bak`, and also treated as empty so
    /// the operator can keep working.
    pub fn load(&self) -> Registry {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Registry::new(),
            Err(e) => {
                log::warn!("cannot read {}: {e}", self.path.display());
                return Registry::new();
            }
        };

        match Registry::from_document(&content) {
            Ok(registry) => {
                log::debug!("loaded {} route(s) from {}", registry.len(), self.path.display());
                registry
            }
            Err(e) => {
                log::warn!("{}: {e}; starting with no routes", self.path.display());
                let backup = self.path.with_extension("json.bak");
                if let Err(e) = fs::copy(&self.path, &backup) {
                    log::warn!("cannot back up {}: {e}", self.path.display());
                }
                Registry::new()
            }
        }
    }

    /// Atomically replace the document: write `.tmp`, sync, rename.
    pub fn save(&self, registry: &Registry) -> Result<(), IoError> {
        let document = registry.to_document()?;
        atomic_write(&self.path, document.as_bytes())?;
        log::debug!("saved {} route(s) to {}", registry.len(), self.path.display());
        Ok(())
    }
}

pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IoError::write(parent, e))?;
    }

    let temp_path = path.with_extension("tmp");
    let result = write_synced(&temp_path, path, bytes).and_then(|()| {
        fs::rename(&temp_path, path).map_err(|e| IoError::write(path, format!("rename: {e}")))
    });
    if result.is_err() {
        if let Err(e) = fs::remove_file(&temp_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("cannot remove {}: {e}", temp_path.display());
            }
        }
    }
    result
}

fn write_synced(temp_path: &Path, path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    let file = File::create(temp_path)
        .map_err(|e| IoError::write(path, format!("create temp file: {e}")))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(bytes)
        .map_err(|e| IoError::write(path, e))?;
    writer.flush().map_err(|e| IoError::write(path, format!("flush: {e}")))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| IoError::write(path, format!("sync: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conferencia_recon::import::RouteImport;
    use tempfile::tempdir;

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.import_route(RouteImport {
            route_id: "42".into(),
            expected_ids: vec!["40000000001".into()],
            ..RouteImport::default()
        })
        .unwrap();
        reg
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert!(RouteStore::new(dir.path()).load().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let store = RouteStore::new(dir.path());
        store.save(&registry()).unwrap();

        assert!(store.path().ends_with("conferencia.routes.v1.json"));
        assert!(!store.path().with_extension("tmp").exists());
        let loaded = store.load();
        assert_eq!(loaded.get("42"), registry().get("42"));
    }

    #[test]
    fn save_creates_data_dir() {
        let dir = tempdir().unwrap();
        let store = RouteStore::new(&dir.path().join("nested/data"));
        store.save(&registry()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        // A non-empty directory cannot be replaced by rename
        let target = dir.path().join("out");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        assert!(atomic_write(&target, b"data").is_err());
        assert!(!dir.path().join("out.tmp").exists());
        assert!(target.join("keep").exists());
    }

    #[test]
    fn corrupt_file_backed_up_and_ignored() {
        let dir = tempdir().unwrap();
        let store = RouteStore::new(dir.path());
        fs::write(store.path(), "{not json").unwrap();

        assert!(store.load().is_empty());
        let backup = dir.path().join("conferencia.routes.v1.json.bak");
        assert_eq!(fs::read_to_string(backup).unwrap(), "{not json");
    }
}
