// Application settings
// Loaded from ~/.config/conferencia/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_FILE: &str = r#"{
    // Where routes and the session are stored.
    // null = platform data directory (e.g. ~/.local/share/conferencia)
    "storage.dataDir": null,

    // Wall clock written to the date/time columns of CSV exports.
    // UTC columns are always written as well.
    "export.timeZoneLabel": "Horário Padrão de Brasília",
    "export.utcOffsetMinutes": -180,

    // Ring the terminal bell on duplicate and off-route scans
    "alerts.bell": true,

    // error, warn, info, debug, trace (-v on the command line overrides)
    "log.level": "warn"
}
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Storage
    #[serde(rename = "storage.dataDir")]
    pub data_dir: Option<PathBuf>,

    // Export
    #[serde(rename = "export.timeZoneLabel")]
    pub time_zone_label: String,

    #[serde(rename = "export.utcOffsetMinutes")]
    pub utc_offset_minutes: i32,

    // Alerts
    #[serde(rename = "alerts.bell")]
    pub bell: bool,

    // Logging
    #[serde(rename = "log.level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            time_zone_label: "Horário Padrão de Brasília".to_string(),
            utc_offset_minutes: -180,
            bell: true,
            log_level: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("conferencia")
            .join("settings.json")
    }

    /// Load settings from the default location, writing the commented
    /// default file on first run.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`, falling back to defaults on any problem.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            create_default_file(path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Data directory: explicit setting, else the platform data dir.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Save current settings to `path` (comments are not preserved)
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("conferencia")
}

fn create_default_file(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            log::warn!("Error creating config directory: {}", e);
            return;
        }
    }
    match fs::write(path, DEFAULT_SETTINGS_FILE) {
        Ok(()) => log::info!("wrote default settings to {}", path.display()),
        Err(e) => log::warn!("Error writing default {}: {}", path.display(), e),
    }
}
