//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

use crate::types::ProjectType;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // ─────────────────────────────────────────────────────────────
    // Precondition Errors
    // ─────────────────────────────────────────────────────────────
    #[error("No project selected")]
    NoProjectSelected,

    #[error("Can't {operation} a {kind} project")]
    UnsupportedProject {
        operation: &'static str,
        kind: ProjectType,
    },

    #[error("Runtime is not fully connected")]
    NotConnected,

    #[error("Runtime doesn't expose an apps actor")]
    NoAppsActor,

    #[error("Can't find app front for {}", manifest_url.as_deref().unwrap_or("selected project"))]
    AppNotFound { manifest_url: Option<String> },

    // ─────────────────────────────────────────────────────────────
    // Connection/Protocol Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to connect to runtime: {runtime}")]
    ConnectionFailed { runtime: String },

    #[error("Can't connect to app: {manifest_url}")]
    CantConnectToApp { manifest_url: String },

    #[error("Target acquisition abandoned: project selection changed")]
    TargetAbandoned,

    #[error("Remote protocol error: {message}")]
    Protocol { message: String },

    #[error("Install failed: {message}")]
    Install { message: String },

    // ─────────────────────────────────────────────────────────────
    // Project Pipeline Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Build failed: {message}")]
    Build { message: String },

    #[error("Project store error: {message}")]
    Store { message: String },

    #[error("Manifest error at {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn unsupported(operation: &'static str, kind: ProjectType) -> Self {
        Self::UnsupportedProject { operation, kind }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn install(message: impl Into<String>) -> Self {
        Self::Install {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn connection_failed(runtime: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            runtime: runtime.into(),
        }
    }

    /// Check if this error comes from a violated precondition.
    ///
    /// Precondition failures are reported before any state is touched.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::NoProjectSelected
                | Error::UnsupportedProject { .. }
                | Error::NotConnected
                | Error::NoAppsActor
                | Error::AppNotFound { .. }
        )
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Protocol { .. }
                | Error::ConnectionFailed { .. }
                | Error::CantConnectToApp { .. }
                | Error::TargetAbandoned
                | Error::Install { .. }
                | Error::Build { .. }
                | Error::Validation { .. }
        ) || self.is_precondition()
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}
