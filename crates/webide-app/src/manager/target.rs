//! Target acquisition and runtime app / tab control

use std::sync::Arc;

use webide_core::prelude::*;
use webide_core::{ErrorKey, ErrorReport, Project, ProjectType, SharedProject, Tab};
use webide_remote::{AppHandle, Target};

use super::AppManager;

impl AppManager {
    /// Debuggable target of the selected project.
    ///
    /// App targets are retried: an app reported as launched may not be
    /// attachable yet. Up to `target.retry_attempts` tries, with
    /// `target.retry_delay_ms` after each failure; errors in between are
    /// ignored. Gives up early with [`Error::TargetAbandoned`] when the
    /// selected project changes while waiting.
    pub async fn get_target(&self) -> Result<Target> {
        let project = self.selected_project().ok_or(Error::NoProjectSelected)?;
        let snapshot = project.snapshot();

        match snapshot.project_type() {
            ProjectType::MainProcess => {
                let response = self
                    .inner
                    .lock()
                    .list_tabs_response
                    .clone()
                    .ok_or(Error::NotConnected)?;
                let client = self
                    .inner
                    .deps
                    .connection
                    .client()
                    .ok_or(Error::NotConnected)?;
                Ok(Target::new(response.to_form(), client, true))
            }
            ProjectType::Tab => self.inner.deps.tab_store.target_for_tab().await,
            _ => {
                let app = self.require_front(&snapshot)?;
                self.acquire_app_target(&project, app).await
            }
        }
    }

    async fn acquire_app_target(
        &self,
        project: &SharedProject,
        app: Arc<dyn AppHandle>,
    ) -> Result<Target> {
        let attempts = self.inner.settings.target.retry_attempts;
        let delay = self.inner.settings.target.retry_delay();

        for attempt in 1..=attempts {
            match app.get_target().await {
                Ok(target) => return Ok(target),
                Err(e) => trace!("App target not ready ({}/{}): {}", attempt, attempts, e),
            }
            tokio::time::sleep(delay).await;

            if !self.is_selected(project) {
                info!("Selected project changed, no longer waiting for its target");
                return Err(Error::TargetAbandoned);
            }
        }

        let manifest_url = app.manifest_url();
        self.report_error(ErrorReport::new(ErrorKey::CantConnectToApp).with_arg(&manifest_url));
        Err(Error::CantConnectToApp { manifest_url })
    }

    fn require_front(&self, project: &Project) -> Result<Arc<dyn AppHandle>> {
        self.project_front(project).ok_or_else(|| Error::AppNotFound {
            manifest_url: project.manifest_url(),
        })
    }

    /// The selected project, checked to be of `expected` type.
    fn require_selected(&self, operation: &'static str, expected: ProjectType) -> Result<Project> {
        let project = self
            .selected_project()
            .ok_or(Error::NoProjectSelected)?
            .snapshot();
        if project.project_type() != expected {
            return Err(Error::unsupported(operation, project.project_type()));
        }
        Ok(project)
    }

    // ─────────────────────────────────────────────────────────
    // Runtime apps
    // ─────────────────────────────────────────────────────────

    pub async fn launch_runtime_app(&self) -> Result<()> {
        let project = self.require_selected("launch", ProjectType::RuntimeApp)?;
        self.require_front(&project)?.launch().await
    }

    /// Launch the selected runtime app, or reload it when it already runs.
    pub async fn launch_or_reload_runtime_app(&self) -> Result<()> {
        let project = self.require_selected("launch or reload", ProjectType::RuntimeApp)?;
        let app = self.require_front(&project)?;
        if app.running() {
            app.reload().await
        } else {
            app.launch().await
        }
    }

    /// Close the app behind the selected project.
    pub async fn stop_running_app(&self) -> Result<()> {
        let project = self
            .selected_project()
            .ok_or(Error::NoProjectSelected)?
            .snapshot();
        self.require_front(&project)?.close().await
    }

    // ─────────────────────────────────────────────────────────
    // Tabs
    // ─────────────────────────────────────────────────────────

    pub async fn list_tabs(&self) -> Result<Vec<Tab>> {
        self.inner.deps.tab_store.list_tabs().await
    }

    /// Reload the selected tab.
    pub async fn reload_tab(&self) -> Result<()> {
        self.require_selected("reload", ProjectType::Tab)?;
        let target = self.get_target().await?;
        target.reload().await
    }
}
