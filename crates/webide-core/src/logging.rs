//! File logging for hosts embedding the app manager
//!
//! The manager only emits `tracing` events. A host that does not install its
//! own subscriber can call [`init`] to get a daily-rolling log file.

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Environment variable overriding the log filter, e.g. `WEBIDE_LOG=webide_app=trace`.
pub const LOG_ENV_VAR: &str = "WEBIDE_LOG";

const LOG_FILE_PREFIX: &str = "webide.log";
const DEFAULT_FILTER: &str = "webide=info,webide_app=info,webide_remote=info,warn";

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub filter: String,
}

impl Default for LogConfig {
    /// `<data_local_dir>/webide/logs`, filtered by `WEBIDE_LOG` when set.
    fn default() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            dir: base.join("webide").join("logs"),
            filter: std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| DEFAULT_FILTER.to_string()),
        }
    }
}

impl LogConfig {
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Path of the file being written today; rotated files get a date suffix.
    pub fn log_file(&self) -> PathBuf {
        self.dir.join(LOG_FILE_PREFIX)
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.filter)
            .map_err(|e| Error::config(format!("Invalid log filter {:?}: {}", self.filter, e)))
    }
}

/// Log to the default directory with the default filter.
pub fn init() -> Result<()> {
    init_with(&LogConfig::default())
}

/// Install a global subscriber writing to `config.dir`.
///
/// Fails if the filter does not parse or the host already installed a
/// subscriber.
pub fn init_with(config: &LogConfig) -> Result<()> {
    let filter = config.env_filter()?;
    std::fs::create_dir_all(&config.dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, &config.dir, LOG_FILE_PREFIX);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .try_init()
        .map_err(|e| Error::config(format!("Logging already initialized: {}", e)))?;

    tracing::info!("App manager logging to {}", config.dir.display());
    Ok(())
}
