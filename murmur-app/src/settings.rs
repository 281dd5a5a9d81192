//! Persistent application settings (JSON file in the user data directory).

use std::fs;
use std::path::{Path, PathBuf};

use murmur_core::config::{DEFAULT_HOST_LABEL, DEFAULT_LANGUAGE_TAG};
use murmur_core::ControllerConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub language_tag: String,
    pub append_mode: bool,
    pub host_label: String,
    /// Engine script replayed instead of the built-in demo.
    pub script_path: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            language_tag: DEFAULT_LANGUAGE_TAG.into(),
            append_mode: false,
            host_label: DEFAULT_HOST_LABEL.into(),
            script_path: None,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        let config = self.controller_config();
        self.language_tag = config.language_tag;
        self.host_label = config.host_label;
        self.script_path = self
            .script_path
            .take()
            .filter(|p| !p.as_os_str().is_empty());
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            language_tag: self.language_tag.clone(),
            append_mode: self.append_mode,
            host_label: self.host_label.clone(),
        }
        .normalized()
    }

    /// `MURMUR_LANGUAGE` and `MURMUR_APPEND_MODE` override persisted values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(language) = std::env::var("MURMUR_LANGUAGE") {
            self.language_tag = language;
        }
        if let Ok(raw) = std::env::var("MURMUR_APPEND_MODE") {
            if let Some(append) = parse_flag(&raw) {
                self.append_mode = append;
            }
        }
        self.normalize();
    }
}

pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Murmur")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("murmur")
            .join("settings.json")
    }
}

/// Missing or unreadable files fall back to defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
