//! Validation pipeline and manifest writing

use std::path::{Path, PathBuf};

use webide_core::prelude::*;
use webide_core::{
    display_name, largest_icon, resolve_icon_url, Manifest, Project, ProjectKind, ProjectType,
    SharedProject, ValidationStatus,
};
use webide_remote::ValidationReport;

use super::AppManager;
use crate::config::ProjectSettings;
use crate::update::AppManagerUpdate;

const MANIFEST_FILENAME: &str = "manifest.webapp";

/// Apply a validation report to `project`: manifest, icon, name, warnings,
/// errors and the derived status.
pub(crate) fn apply_report(
    project: &mut Project,
    report: &ValidationReport,
    defaults: &ProjectSettings,
) {
    match &report.manifest {
        Some(manifest) => {
            project.icon = match largest_icon(manifest) {
                Some(icon_path) => resolve_icon_url(&project.kind, &project.location, icon_path)
                    .unwrap_or_else(|e| {
                        warn!("Can't resolve icon {} of {}: {}", icon_path, project.location, e);
                        defaults.default_icon.clone()
                    }),
                None => defaults.default_icon.clone(),
            };
            project.name = display_name(manifest, &defaults.default_name);
            project.manifest = Some(manifest.clone());
        }
        None => {
            project.manifest = None;
            project.icon = defaults.default_icon.clone();
            project.name = defaults.default_name.clone();
        }
    }

    project.warnings = report.warnings.clone();
    project.errors = report.errors.clone();
    project.validation_status =
        ValidationStatus::from_counts(project.warnings_count(), project.errors_count());
}

impl AppManager {
    /// Validate `project` and update it in place.
    ///
    /// A hosted project whose canonical manifest URL differs from its location
    /// is moved to that URL in the store; any other project already in the
    /// store is updated there. `project-validated` is published only if the
    /// project is still the selected one.
    pub async fn validate_project(&self, project: &SharedProject) -> Result<()> {
        let report = self.inner.deps.validator.validate(project.snapshot()).await?;

        let defaults = &self.inner.settings.project;
        let validated = project.update(|p| {
            apply_report(p, &report, defaults);
            p.clone()
        });
        debug!(
            "Validated {}: {} ({} warnings, {} errors)",
            validated.location,
            validated.validation_status,
            validated.warnings_count(),
            validated.errors_count()
        );

        let store = &self.inner.deps.store;
        let canonical = match (&validated.kind, &report.manifest_url) {
            (ProjectKind::Hosted, Some(url)) if *url != validated.location => Some(url.clone()),
            _ => None,
        };
        if let Some(canonical) = canonical {
            info!("Moving {} to {}", validated.location, canonical);
            let old_location = validated.location.clone();
            let moved = project.update(|p| {
                p.location = canonical;
                p.clone()
            });
            store
                .update_location(old_location, moved)
                .await
                .context("Failed to move the stored project")?;
        } else if store.get(validated.location.clone()).await?.is_some() {
            store.update(validated).await?;
        }

        if self.is_selected(project) {
            self.publish(AppManagerUpdate::ProjectValidated);
        }
        Ok(())
    }

    /// Validate the selected project.
    pub async fn validate_selected_project(&self) -> Result<()> {
        let project = self.selected_project().ok_or(Error::NoProjectSelected)?;
        self.validate_project(&project).await
    }

    /// Write the manifest of a packaged project to `<location>/manifest.webapp`.
    ///
    /// A project without a manifest gets an empty one.
    pub async fn write_manifest(&self, project: &Project) -> Result<()> {
        if project.project_type() != ProjectType::Packaged {
            return Err(Error::unsupported(
                "write the manifest of",
                project.project_type(),
            ));
        }

        let manifest = project.manifest.clone().unwrap_or_default();
        let folder = Path::new(&project.location);
        write_manifest_file(folder, &manifest).await
    }
}

async fn write_manifest_file(folder: &Path, manifest: &Manifest) -> Result<()> {
    let path = folder.join(MANIFEST_FILENAME);
    let temp_path: PathBuf = folder.join(format!(".{}.tmp", MANIFEST_FILENAME));

    let content = serde_json::to_string_pretty(manifest)?;

    tokio::fs::write(&temp_path, content)
        .await
        .map_err(|e| Error::manifest(&temp_path, e.to_string()))?;
    tokio::fs::rename(&temp_path, &path)
        .await
        .map_err(|e| Error::manifest(&path, e.to_string()))?;

    info!("Wrote manifest to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn manifest_with_icons(icons: &[(&str, &str)]) -> Manifest {
        Manifest {
            name: Some("Sample".to_string()),
            icons: Some(
                icons
                    .iter()
                    .map(|(size, path)| (size.to_string(), path.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_apply_report_picks_largest_icon_for_hosted() {
        let mut project = Project::hosted("http://example.com/app/manifest.webapp");
        let report = ValidationReport {
            manifest: Some(manifest_with_icons(&[("64", "a.png"), ("128", "b.png")])),
            ..Default::default()
        };

        apply_report(&mut project, &report, &ProjectSettings::default());

        assert_eq!(project.icon, "http://example.com/b.png");
        assert_eq!(project.name, "Sample");
        assert_eq!(project.validation_status, ValidationStatus::Valid);
    }

    #[test]
    fn test_apply_report_packaged_icon_is_folder_relative() {
        let mut project = Project::packaged("/home/dev/app");
        let report = ValidationReport {
            manifest: Some(manifest_with_icons(&[("16", "/icons/small.png")])),
            ..Default::default()
        };

        apply_report(&mut project, &report, &ProjectSettings::default());

        assert_eq!(project.icon, "file:///home/dev/app/icons/small.png");
    }

    #[test]
    fn test_apply_report_without_manifest_resets_to_defaults() {
        let mut project = Project::hosted("http://example.com/manifest.webapp");
        project.name = "Old".to_string();
        project.icon = "http://example.com/old.png".to_string();
        project.manifest = Some(Manifest::default());

        let report = ValidationReport {
            errors: vec!["Manifest not found".to_string()],
            ..Default::default()
        };
        apply_report(&mut project, &report, &ProjectSettings::default());

        assert!(project.manifest.is_none());
        assert_eq!(project.name, webide_core::DEFAULT_PROJECT_NAME);
        assert_eq!(project.icon, webide_core::DEFAULT_PROJECT_ICON);
        assert_eq!(project.validation_status, ValidationStatus::Error);
    }

    #[test]
    fn test_apply_report_nameless_manifest_gets_placeholder() {
        let mut project = Project::packaged("/tmp/app");
        let report = ValidationReport {
            manifest: Some(Manifest::default()),
            warnings: vec!["No icons".to_string()],
            errors: vec!["No launch path".to_string()],
            ..Default::default()
        };

        apply_report(&mut project, &report, &ProjectSettings::default());

        assert_eq!(project.name, "--");
        assert_eq!(project.icon, webide_core::DEFAULT_PROJECT_ICON);
        assert_eq!(project.validation_status, ValidationStatus::ErrorWarning);
        assert_eq!(project.warnings_count(), 1);
        assert_eq!(project.errors_count(), 1);
    }

    #[tokio::test]
    async fn test_write_manifest_file_is_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest {
            name: Some("Written".to_string()),
            ..Default::default()
        };

        write_manifest_file(dir.path(), &manifest).await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("manifest.webapp")).unwrap();
        assert_eq!(content, "{\n  \"name\": \"Written\"\n}");
        assert!(!dir.path().join(".manifest.webapp.tmp").exists());
    }
}
