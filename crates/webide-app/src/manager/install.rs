//! Install-and-run workflow: build, validate, install, launch or reload

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;

use webide_core::prelude::*;
use webide_core::{hosted_app_id, origin_url, ErrorKey, ErrorReport, Manifest, ProjectKind};
use webide_remote::{AppHandle, BuildLogger, HostedMetadata};

use super::AppManager;
use crate::update::AppManagerUpdate;

/// How an install-and-run request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Installed, launched and reported running
    Launched,
    /// Installed over a running app, which was reloaded
    Reloaded,
    /// Installed an addon; addons have nothing to launch
    Installed,
    /// Validation found errors; nothing was installed
    BlockedByValidation,
}

impl AppManager {
    /// Build, validate, install and run the selected project.
    ///
    /// Requires a packaged or hosted project and a runtime connected with an
    /// apps actor. Steps run strictly in order and the first failure aborts
    /// the rest; completed steps are not undone.
    ///
    /// A launched app is awaited until the project reports running, with no
    /// timeout.
    pub async fn install_and_run_project(&self) -> Result<InstallOutcome> {
        let project = self.selected_project().ok_or(Error::NoProjectSelected)?;

        let project_type = project.project_type();
        if !project_type.is_installable() {
            error!("Can't install project. Unknown type of project: {}", project_type);
            return Err(Error::unsupported("install", project_type));
        }

        let (has_response, front) = {
            let state = self.inner.lock();
            (state.list_tabs_response.is_some(), state.apps_front.clone())
        };
        if !has_response {
            self.report_error(ErrorReport::new(ErrorKey::CantInstallNotFullyConnected));
            return Err(Error::NotConnected);
        }
        let Some(front) = front else {
            error!("Runtime doesn't have an apps actor");
            return Err(Error::NoAppsActor);
        };

        // Build
        let weak = self.downgrade();
        let logger: BuildLogger = Arc::new(move |line| {
            if let Some(manager) = AppManager::from_weak(&weak) {
                manager.publish(AppManagerUpdate::PrePackage(line));
            }
        });
        let package_dir = self
            .inner
            .deps
            .builder
            .build(project.snapshot(), logger)
            .await?;

        // Validate
        self.validate_project(&project).await?;
        if project.with(|p| p.errors_count()) > 0 {
            self.report_error(ErrorReport::new(ErrorKey::CantInstallValidationErrors));
            return Ok(InstallOutcome::BlockedByValidation);
        }

        // Install
        let snapshot = project.snapshot();
        let app: Arc<dyn AppHandle> = match &snapshot.kind {
            ProjectKind::Packaged {
                packaged_app_origin,
            } => {
                let dir = package_dir.unwrap_or_else(|| PathBuf::from(&snapshot.location));
                info!("Installing app from {:?}", dir);
                let installed = front
                    .install_packaged(dir.clone(), packaged_app_origin.clone())
                    .await
                    .with_context(|| format!("Failed to install {:?}", dir))?;

                // The runtime may assign a different origin than requested
                let updated = project.update(|p| {
                    if let ProjectKind::Packaged {
                        packaged_app_origin,
                    } = &mut p.kind
                    {
                        *packaged_app_origin = Some(installed.app_id.clone());
                    }
                    p.clone()
                });
                self.inner
                    .deps
                    .store
                    .update(updated)
                    .await
                    .context("Failed to store the assigned app origin")?;
                installed.app
            }
            ProjectKind::Hosted => {
                let origin = origin_url(&snapshot.location)?;
                let app_id = hosted_app_id(&snapshot.location)?;
                let metadata = HostedMetadata {
                    origin: origin.to_string(),
                    manifest_url: snapshot.location.clone(),
                };
                info!("Installing hosted app {}", snapshot.location);
                front
                    .install_hosted(app_id, metadata, snapshot.manifest.clone())
                    .await
                    .with_context(|| format!("Failed to install {}", snapshot.location))?
                    .app
            }
            _ => return Err(Error::unsupported("install", project_type)),
        };

        if snapshot.manifest.as_ref().is_some_and(Manifest::is_addon) {
            info!("Installed addon {}, nothing to launch", snapshot.location);
            return Ok(InstallOutcome::Installed);
        }

        // Launch or reload
        if app.running() {
            app.reload().await?;
            return Ok(InstallOutcome::Reloaded);
        }

        let mut updates = self.subscribe();
        app.launch().await?;
        self.wait_until_running(&mut updates).await?;
        Ok(InstallOutcome::Launched)
    }

    async fn wait_until_running(
        &self,
        updates: &mut broadcast::Receiver<AppManagerUpdate>,
    ) -> Result<()> {
        loop {
            match updates.recv().await {
                Ok(AppManagerUpdate::ProjectIsRunning) => return Ok(()),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Update stream lagged by {} while waiting for launch", skipped);
                    if self.is_project_running() {
                        return Ok(());
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return Err(Error::ChannelClosed),
            }
        }
    }
}
