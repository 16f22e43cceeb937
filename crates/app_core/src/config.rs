//! Application configuration

use crate::error::AppError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub viewer: ViewerConfig,
    pub keybindings: HashMap<String, Vec<String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            viewer: ViewerConfig::default(),
            keybindings: default_keybindings(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Delay before pending metadata and workspace writes are flushed
    pub debounce_ms: u64,
    /// Reopen the last active workspace at startup
    pub restore_last_workspace: bool,
    /// Delete rolled log files older than this many days (0 keeps all)
    pub log_retention_days: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            restore_last_workspace: true,
            log_retention_days: 14,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub zoom_in_factor: f32,
    pub zoom_out_factor: f32,
    /// Thumbnails shown in the culling filmstrip
    pub filmstrip_size: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            zoom_min: 0.2,
            zoom_max: 8.0,
            zoom_in_factor: 1.15,
            zoom_out_factor: 0.87,
            filmstrip_size: 11,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)
                .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
            tracing::info!("Configuration loaded from {:?}", path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::info!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "PhotoCuller", "PhotoCuller")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }
}

fn default_keybindings() -> HashMap<String, Vec<String>> {
    let mut kb = HashMap::new();

    // Navigation
    kb.insert("nav.next_item".into(), vec!["Right".into(), "Space".into()]);
    kb.insert("nav.prev_item".into(), vec!["Left".into()]);

    // Views
    kb.insert("view.close".into(), vec!["Escape".into()]);
    kb.insert("view.grid".into(), vec!["G".into()]);
    kb.insert("view.cull".into(), vec!["C".into()]);
    kb.insert("view.open_viewer".into(), vec!["v".into()]);
    kb.insert("view.cull_mode".into(), vec!["Tab".into()]);
    kb.insert("view.zoom_in".into(), vec!["Plus".into(), "=".into()]);
    kb.insert("view.zoom_out".into(), vec!["Minus".into()]);
    kb.insert("view.zoom_reset".into(), vec!["Z".into()]);
    kb.insert("view.rotate_left".into(), vec!["[".into()]);
    kb.insert("view.rotate_right".into(), vec!["]".into()]);

    // Metadata
    for rating in 0..=5 {
        kb.insert(format!("meta.rate:{}", rating), vec![rating.to_string()]);
    }
    kb.insert("meta.label:red".into(), vec!["r".into()]);
    kb.insert("meta.label:yellow".into(), vec!["y".into()]);
    kb.insert("meta.label:green".into(), vec!["g".into()]);
    kb.insert("meta.label:blue".into(), vec!["b".into()]);
    kb.insert("meta.label:purple".into(), vec!["p".into()]);
    kb.insert("meta.label:none".into(), vec!["c".into()]);
    kb.insert("meta.toggle_flag".into(), vec!["f".into(), "Enter".into()]);
    kb.insert("meta.toggle_reject".into(), vec!["x".into()]);

    // Filters
    kb.insert("filter.flagged".into(), vec!["F".into()]);
    kb.insert("filter.reset".into(), vec!["Backspace".into()]);

    kb
}
