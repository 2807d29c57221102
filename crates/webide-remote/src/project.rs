//! Project collaborators: validator, builder and persistent store

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use webide_core::prelude::*;
use webide_core::{Manifest, Project};

/// What a validator found out about a project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Parsed manifest, when one could be loaded
    pub manifest: Option<Manifest>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// Canonical manifest URL (hosted apps may redirect)
    pub manifest_url: Option<String>,
}

/// Checks a project's manifest and content.
pub trait ProjectValidator: Send + Sync {
    fn validate(&self, project: Project) -> BoxFuture<'_, Result<ValidationReport>>;
}

/// Receives build progress lines.
pub type BuildLogger = Arc<dyn Fn(String) + Send + Sync>;

/// Packaging step run before install.
pub trait ProjectBuilder: Send + Sync {
    /// Build `project`; returns the directory to install from, or `None`
    /// when the project is installed from its own location.
    fn build(
        &self,
        project: Project,
        logger: BuildLogger,
    ) -> BoxFuture<'_, Result<Option<PathBuf>>>;
}

/// Persistent project storage keyed by project location.
pub trait ProjectStore: Send + Sync {
    fn get(&self, location: String) -> BoxFuture<'_, Result<Option<Project>>>;

    /// Replace the stored project with the same location.
    fn update(&self, project: Project) -> BoxFuture<'_, Result<()>>;

    /// Re-key a stored project: drop `old_location`, store `project` under
    /// its (new) location.
    fn update_location(&self, old_location: String, project: Project) -> BoxFuture<'_, Result<()>>;

    fn remove(&self, location: String) -> BoxFuture<'_, Result<()>>;
}
