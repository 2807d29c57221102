//! Configuration types for the app manager
//!
//! Defines:
//! - `Settings` - Global settings (`config.toml`)
//! - Section types for target acquisition, project defaults, storage and events

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use webide_core::{DEFAULT_PROJECT_ICON, DEFAULT_PROJECT_NAME};

/// App manager settings (`<config_dir>/webide/config.toml`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub target: TargetSettings,

    #[serde(default)]
    pub project: ProjectSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub events: EventSettings,
}

/// App target acquisition
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TargetSettings {
    /// Attempts before giving up on an app's debug target
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay after each failed attempt, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl TargetSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_retry_attempts() -> u32 {
    10
}

fn default_retry_delay_ms() -> u64 {
    500
}

/// Defaults applied when a manifest lacks a name or icon
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProjectSettings {
    #[serde(default = "default_icon")]
    pub default_icon: String,

    #[serde(default = "default_name")]
    pub default_name: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            default_icon: default_icon(),
            default_name: default_name(),
        }
    }
}

fn default_icon() -> String {
    DEFAULT_PROJECT_ICON.to_string()
}

fn default_name() -> String {
    DEFAULT_PROJECT_NAME.to_string()
}

/// Project store location
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StoreSettings {
    /// Override for the projects file (defaults to the user data dir)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Update event delivery
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EventSettings {
    /// Buffered updates per subscriber before it starts lagging
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    256
}
