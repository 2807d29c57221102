//! Observers of the app manager.
//!
//! An `AppManagerObserver` gets synchronous, in-process delivery of every
//! update plus the pre-commit `before_project` hook, which is the only way to
//! veto a project change. For read-only observation, prefer
//! `AppManager::subscribe()`.
//!
//! Callbacks run on the thread that caused the change and must not block.
//! They may call back into the manager, but not into `select_project`
//! from `before_project`.

use std::fmt;

use webide_core::{ErrorReport, Project};

use crate::update::AppManagerUpdate;

/// Answer of a `before_project` hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectChange {
    Allow,
    Veto,
}

/// Handle returned by `AppManager::register_observer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// Extension trait for app manager observers.
///
/// Each callback has a default no-op implementation, so observers only
/// override the hooks they care about.
pub trait AppManagerObserver: Send + Sync + fmt::Debug {
    /// Unique name for this observer (for logging).
    fn name(&self) -> &str;

    /// Called before the selected project changes from `current` to `next`.
    ///
    /// The first `Veto` aborts the change; later observers are not asked.
    fn before_project(&self, _current: Option<&Project>, _next: Option<&Project>) -> ProjectChange {
        ProjectChange::Allow
    }

    /// Called for each published update.
    fn on_update(&self, _update: &AppManagerUpdate) {}

    /// Called for each user-visible error report.
    fn on_error(&self, _report: &ErrorReport) {}
}
