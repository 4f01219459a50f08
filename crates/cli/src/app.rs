//! Per-invocation state: settings, data directory, the loaded registry.

use std::path::PathBuf;

use conferencia_config::{Session, Settings};
use conferencia_io::RouteStore;
use conferencia_recon::{ExportZone, Registry};

use crate::CliError;

pub struct App {
    pub settings: Settings,
    pub data_dir: PathBuf,
    pub store: RouteStore,
    pub registry: Registry,
}

impl App {
    /// Load routes and the session's selection. `data_dir` (flag or env)
    /// overrides the settings.
    pub fn open(settings: Settings, data_dir: Option<PathBuf>) -> Self {
        let data_dir = data_dir.unwrap_or_else(|| settings.resolved_data_dir());
        let store = RouteStore::new(&data_dir);
        let mut registry = store.load();

        let session = Session::load(&data_dir).unwrap_or_default();
        registry.restore_selection(session.current_route_id.as_deref());
        if session.current_route_id.is_some() && registry.current_id().is_none() {
            log::info!("previously selected route no longer exists");
        }

        log::debug!("data dir {}", data_dir.display());
        Self {
            settings,
            data_dir,
            store,
            registry,
        }
    }

    /// Write the registry and selection. Failures are logged, never fatal:
    /// the command's own outcome stands.
    pub fn persist(&self) {
        if let Err(e) = self.store.save(&self.registry) {
            log::warn!("routes not saved: {e}");
        }
        let session = Session {
            current_route_id: self.registry.current_id().map(str::to_string),
            ..Session::default()
        };
        if let Err(e) = session.save(&self.data_dir) {
            log::warn!("session not saved: {e}");
        }
    }

    pub fn export_zone(&self) -> ExportZone {
        ExportZone {
            label: self.settings.time_zone_label.clone(),
            utc_offset_minutes: self.settings.utc_offset_minutes,
        }
    }

    /// The selected route's id, or a usage error pointing at `route select`.
    pub fn require_current_id(&self) -> Result<String, CliError> {
        self.registry
            .require_current()
            .map(|r| r.route_id.clone())
            .map_err(|e| {
                CliError::recon(&e).with_hint("select a route first: conferencia route select <ROUTE_ID>")
            })
    }
}
