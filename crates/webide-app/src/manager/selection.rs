//! Project and runtime selection, and the running status of the selection

use std::collections::HashMap;
use std::sync::Arc;

use webide_core::prelude::*;
use webide_core::{Project, ProjectKind, ProjectType, SharedProject};
use webide_remote::{AppHandle, Runtime};

use super::AppManager;
use crate::observer::ProjectChange;
use crate::update::AppManagerUpdate;

/// Result of a selection change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The new value equals the current one; nothing happened
    Unchanged,
    Changed,
    /// An observer vetoed the change
    Vetoed,
}

impl AppManager {
    pub fn selected_project(&self) -> Option<SharedProject> {
        self.inner.lock().selected_project.clone()
    }

    /// Select `project` (or clear the selection with `None`).
    ///
    /// Equal contents are a no-op. Otherwise every observer's
    /// `before_project` hook runs first and may veto the change.
    pub fn select_project(&self, project: Option<SharedProject>) -> Selection {
        let current = self.selected_project();
        let unchanged = match (&current, &project) {
            (None, None) => true,
            (Some(current), Some(next)) => current.same_contents(next),
            _ => false,
        };
        if unchanged {
            return Selection::Unchanged;
        }

        let current_snapshot = current.as_ref().map(SharedProject::snapshot);
        let next_snapshot = project.as_ref().map(SharedProject::snapshot);
        for observer in self.inner.observers() {
            let answer =
                observer.before_project(current_snapshot.as_ref(), next_snapshot.as_ref());
            if answer == ProjectChange::Veto {
                info!("Project change vetoed by {}", observer.name());
                return Selection::Vetoed;
            }
        }

        self.inner.lock().selected_project = project.clone();

        let tab_store = &self.inner.deps.tab_store;
        tab_store.set_selected_tab(None);

        if let (Some(project), Some(snapshot)) = (&project, &next_snapshot) {
            match &snapshot.kind {
                ProjectKind::Packaged { .. } | ProjectKind::Hosted => {
                    let manager = self.clone();
                    let project = project.clone();
                    self.spawn(async move {
                        if let Err(e) = manager.validate_project(&project).await {
                            warn!("Failed to validate {}: {}", project.location(), e);
                        }
                    });
                }
                ProjectKind::Tab { tab } => tab_store.set_selected_tab(Some(tab.clone())),
                _ => {}
            }
        }

        debug!(
            "Selected project: {}",
            next_snapshot
                .as_ref()
                .map(|p| p.location.as_str())
                .unwrap_or("none")
        );
        self.publish(AppManagerUpdate::Project);
        self.check_if_project_is_running();
        Selection::Changed
    }

    /// Clear the selection and delete the project from the store.
    ///
    /// A vetoed clear leaves both the selection and the store untouched.
    pub async fn remove_selected_project(&self) -> Result<Selection> {
        let project = self.selected_project().ok_or(Error::NoProjectSelected)?;
        let location = project.location();

        if self.select_project(None) == Selection::Vetoed {
            return Ok(Selection::Vetoed);
        }

        self.inner.deps.store.remove(location).await?;
        Ok(Selection::Changed)
    }

    pub fn selected_runtime(&self) -> Option<Arc<dyn Runtime>> {
        self.inner.lock().selected_runtime.clone()
    }

    /// Select `runtime`. Clearing it also clears a selected project that only
    /// exists on a runtime (main process, runtime app, tab).
    pub fn select_runtime(&self, runtime: Option<Arc<dyn Runtime>>) {
        let clear_project = {
            let mut state = self.inner.lock();
            state.selected_runtime = runtime.clone();
            runtime.is_none()
                && state
                    .selected_project
                    .as_ref()
                    .is_some_and(|p| p.project_type().requires_runtime())
        };
        if clear_project {
            self.select_project(None);
        }
        self.publish(AppManagerUpdate::RuntimeChanged);
    }

    // ─────────────────────────────────────────────────────────
    // Apps and running status
    // ─────────────────────────────────────────────────────────

    /// Installed apps of the connected runtime, by manifest URL.
    pub fn apps(&self) -> HashMap<String, Arc<dyn AppHandle>> {
        let front = self.inner.lock().apps_front.clone();
        front.map(|front| front.apps()).unwrap_or_default()
    }

    pub fn runtime_can_handle_apps(&self) -> bool {
        self.inner.lock().apps_front.is_some()
    }

    /// Manifest URL under which the runtime knows `project`, if any.
    pub fn project_manifest_url(&self, project: &Project) -> Option<String> {
        project.manifest_url()
    }

    /// The installed app behind `project`.
    pub(crate) fn project_front(&self, project: &Project) -> Option<Arc<dyn AppHandle>> {
        let manifest_url = self.project_manifest_url(project)?;
        let front = self.inner.lock().apps_front.clone()?;
        front.apps().get(&manifest_url).cloned()
    }

    /// Whether the selected project is running on the runtime.
    ///
    /// The main process and tabs always run; apps report their own state.
    pub fn is_project_running(&self) -> bool {
        let Some(project) = self.selected_project() else {
            return false;
        };
        let snapshot = project.snapshot();
        match snapshot.project_type() {
            ProjectType::MainProcess | ProjectType::Tab => true,
            _ => self
                .project_front(&snapshot)
                .is_some_and(|app| app.running()),
        }
    }

    /// Publish the running status of the selected project, if any.
    pub fn check_if_project_is_running(&self) {
        if self.selected_project().is_none() {
            return;
        }
        if self.is_project_running() {
            self.publish(AppManagerUpdate::ProjectIsRunning);
        } else {
            self.publish(AppManagerUpdate::ProjectIsNotRunning);
        }
    }
}
