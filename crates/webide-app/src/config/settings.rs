//! Settings file loading and saving

use std::path::{Path, PathBuf};

use webide_core::prelude::*;

use super::types::Settings;

const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "webide";

/// `<config_dir>/webide`, when the platform has a config directory.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// Load settings from `<config_dir>/config.toml`.
///
/// A missing or unreadable file yields the defaults.
pub fn load_settings(config_dir: &Path) -> Settings {
    let config_path = config_dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Save settings to `<config_dir>/config.toml`.
pub fn save_settings(config_dir: &Path, settings: &Settings) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir)
            .map_err(|e| Error::config(format!("Failed to create config dir: {}", e)))?;
    }

    let config_path = config_dir.join(CONFIG_FILENAME);
    let temp_path = config_dir.join(".config.toml.tmp");

    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;
    let full_content = format!("# WebIDE app manager configuration\n\n{}", content);

    // Atomic write: write to temp, then rename
    std::fs::write(&temp_path, &full_content)
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;

    std::fs::rename(&temp_path, &config_path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    info!("Saved settings to {:?}", config_path);
    Ok(())
}
