//! Updates published by the app manager
//!
//! Every state transition is republished as one `AppManagerUpdate` on the
//! broadcast channel returned by `AppManager::subscribe()` and delivered to
//! registered observers. The `reason()` tag is the stable name of the update.

use webide_core::InstallProgress;
use webide_remote::ConnectionStatus;

/// Coarse-grained, reason-tagged update with an optional payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AppManagerUpdate {
    // ─────────────────────────────────────────────────────────
    // Connection
    // ─────────────────────────────────────────────────────────
    /// The connection status changed and was handled
    Connection(ConnectionStatus),

    /// A `listTabs` reply was cached for the current connection
    ListTabsResponse,

    /// The apps front is watching and its apps are available
    RuntimeAppsFound,

    /// Upload progress of a packaged install
    InstallProgress(InstallProgress),

    // ─────────────────────────────────────────────────────────
    // Project
    // ─────────────────────────────────────────────────────────
    /// The selected project changed
    Project,

    /// The selected project's derived fields (name, icon, status) changed
    ProjectValidated,

    ProjectIsRunning,

    ProjectIsNotRunning,

    /// A build progress line
    PrePackage(String),

    // ─────────────────────────────────────────────────────────
    // Runtimes
    // ─────────────────────────────────────────────────────────
    /// The selected runtime changed
    RuntimeChanged,

    RuntimeDetails,

    /// The runtime list buckets were rebuilt
    RuntimeList,
}

impl AppManagerUpdate {
    /// The update's reason tag.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::ListTabsResponse => "list-tabs-response",
            Self::RuntimeAppsFound => "runtime-apps-found",
            Self::InstallProgress(_) => "install-progress",
            Self::Project => "project",
            Self::ProjectValidated => "project-validated",
            Self::ProjectIsRunning => "project-is-running",
            Self::ProjectIsNotRunning => "project-is-not-running",
            Self::PrePackage(_) => "pre-package",
            Self::RuntimeChanged => "runtime-changed",
            Self::RuntimeDetails => "runtime-details",
            Self::RuntimeList => "runtimelist",
        }
    }
}
