//! Core domain types: projects, manifests, tabs and runtime categories

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Icon shown for projects whose manifest declares none.
pub const DEFAULT_PROJECT_ICON: &str = "chrome://webide/skin/default-app-icon.png";

/// Name shown for projects whose manifest declares none.
pub const DEFAULT_PROJECT_NAME: &str = "--";

// ─────────────────────────────────────────────────────────────────
// Manifest
// ─────────────────────────────────────────────────────────────────

/// Parsed application manifest (`manifest.webapp`).
///
/// Only the fields the app manager reads are typed; everything else is
/// preserved in `extra` so writing the manifest back is lossless.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Icon paths keyed by size token ("16", "128", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<BTreeMap<String, String>>,

    /// App role; `"addon"` apps have no launchable document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    pub fn is_addon(&self) -> bool {
        self.role.as_deref() == Some("addon")
    }
}

// ─────────────────────────────────────────────────────────────────
// Tabs
// ─────────────────────────────────────────────────────────────────

/// A browser tab exposed by the connected runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// Tab actor id on the remote side
    pub actor: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Projects
// ─────────────────────────────────────────────────────────────────

/// Project tag without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectType {
    Packaged,
    Hosted,
    Tab,
    RuntimeApp,
    MainProcess,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Packaged => "packaged",
            ProjectType::Hosted => "hosted",
            ProjectType::Tab => "tab",
            ProjectType::RuntimeApp => "runtimeApp",
            ProjectType::MainProcess => "mainProcess",
        }
    }

    /// Packaged and hosted projects are validated, built and installed locally.
    pub fn is_installable(&self) -> bool {
        matches!(self, ProjectType::Packaged | ProjectType::Hosted)
    }

    /// Projects that only exist while a runtime is connected.
    pub fn requires_runtime(&self) -> bool {
        matches!(
            self,
            ProjectType::MainProcess | ProjectType::RuntimeApp | ProjectType::Tab
        )
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tag project payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProjectKind {
    /// A packaged app in a local folder; `location` is the folder path.
    #[serde(rename_all = "camelCase")]
    Packaged {
        #[serde(default)]
        packaged_app_origin: Option<String>,
    },
    /// A hosted app; `location` is its manifest URL.
    Hosted,
    /// A tab running on the runtime; `location` is the tab URL.
    Tab { tab: Tab },
    /// An app already installed on the runtime.
    #[serde(rename_all = "camelCase")]
    RuntimeApp { manifest_url: String },
    /// The runtime's main process.
    MainProcess,
}

impl ProjectKind {
    pub fn project_type(&self) -> ProjectType {
        match self {
            ProjectKind::Packaged { .. } => ProjectType::Packaged,
            ProjectKind::Hosted => ProjectType::Hosted,
            ProjectKind::Tab { .. } => ProjectType::Tab,
            ProjectKind::RuntimeApp { .. } => ProjectType::RuntimeApp,
            ProjectKind::MainProcess => ProjectType::MainProcess,
        }
    }
}

/// Validation outcome attached to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationStatus {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "valid")]
    Valid,
    #[serde(rename = "warning")]
    Warning,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "error warning")]
    ErrorWarning,
}

impl ValidationStatus {
    /// Derive the status from the number of warnings and errors.
    pub fn from_counts(warnings: usize, errors: usize) -> Self {
        match (warnings > 0, errors > 0) {
            (false, false) => ValidationStatus::Valid,
            (true, false) => ValidationStatus::Warning,
            (false, true) => ValidationStatus::Error,
            (true, true) => ValidationStatus::ErrorWarning,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::None => "none",
            ValidationStatus::Valid => "valid",
            ValidationStatus::Warning => "warning",
            ValidationStatus::Error => "error",
            ValidationStatus::ErrorWarning => "error warning",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of deployable or debuggable content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(flatten)]
    pub kind: ProjectKind,

    /// Folder path, manifest URL or tab URL depending on `kind`
    pub location: String,

    pub name: String,

    pub icon: String,

    #[serde(default)]
    pub manifest: Option<Manifest>,

    #[serde(default)]
    pub validation_status: ValidationStatus,

    #[serde(default)]
    pub warnings: Vec<String>,

    #[serde(default)]
    pub errors: Vec<String>,
}

impl Project {
    fn with_kind(kind: ProjectKind, location: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            name: DEFAULT_PROJECT_NAME.to_string(),
            icon: DEFAULT_PROJECT_ICON.to_string(),
            manifest: None,
            validation_status: ValidationStatus::None,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn packaged(folder: impl Into<String>) -> Self {
        Self::with_kind(
            ProjectKind::Packaged {
                packaged_app_origin: None,
            },
            folder,
        )
    }

    pub fn hosted(manifest_url: impl Into<String>) -> Self {
        Self::with_kind(ProjectKind::Hosted, manifest_url)
    }

    pub fn tab(tab: Tab) -> Self {
        let location = tab.url.clone();
        let name = tab.title.clone();
        let mut project = Self::with_kind(ProjectKind::Tab { tab }, location);
        if let Some(name) = name {
            project.name = name;
        }
        project
    }

    pub fn runtime_app(manifest_url: impl Into<String>, name: impl Into<String>) -> Self {
        let manifest_url = manifest_url.into();
        let mut project = Self::with_kind(
            ProjectKind::RuntimeApp {
                manifest_url: manifest_url.clone(),
            },
            manifest_url,
        );
        project.name = name.into();
        project
    }

    pub fn main_process() -> Self {
        let mut project = Self::with_kind(ProjectKind::MainProcess, "mainProcess");
        project.name = "Main Process".to_string();
        project
    }

    pub fn project_type(&self) -> ProjectType {
        self.kind.project_type()
    }

    pub fn warnings_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn errors_count(&self) -> usize {
        self.errors.len()
    }

    pub fn packaged_app_origin(&self) -> Option<&str> {
        match &self.kind {
            ProjectKind::Packaged {
                packaged_app_origin,
            } => packaged_app_origin.as_deref(),
            _ => None,
        }
    }

    /// Manifest URL under which the runtime knows this project, if any.
    pub fn manifest_url(&self) -> Option<String> {
        match &self.kind {
            ProjectKind::RuntimeApp { manifest_url } => Some(manifest_url.clone()),
            ProjectKind::Hosted => Some(self.location.clone()),
            ProjectKind::Packaged {
                packaged_app_origin: Some(origin),
            } => Some(format!("app://{}/manifest.webapp", origin)),
            _ => None,
        }
    }
}

/// A project shared between the selection slot and in-flight workflows.
///
/// Workflows mutate the project in place; identity (not contents) decides
/// whether a finished workflow still concerns the selected project.
#[derive(Debug, Clone)]
pub struct SharedProject(Arc<RwLock<Project>>);

impl SharedProject {
    pub fn new(project: Project) -> Self {
        Self(Arc::new(RwLock::new(project)))
    }

    /// Clone of the current contents
    pub fn snapshot(&self) -> Project {
        self.0.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Read a value out of the project without cloning it whole.
    pub fn with<R>(&self, f: impl FnOnce(&Project) -> R) -> R {
        f(&self.0.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Mutate the project in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut Project) -> R) -> R {
        f(&mut self.0.write().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn project_type(&self) -> ProjectType {
        self.with(|p| p.project_type())
    }

    pub fn location(&self) -> String {
        self.with(|p| p.location.clone())
    }

    /// Same underlying project (identity).
    pub fn ptr_eq(&self, other: &SharedProject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Same contents (structural equality).
    pub fn same_contents(&self, other: &SharedProject) -> bool {
        self.ptr_eq(other) || self.snapshot() == other.snapshot()
    }
}

impl From<Project> for SharedProject {
    fn from(project: Project) -> Self {
        Self::new(project)
    }
}

// ─────────────────────────────────────────────────────────────────
// Runtimes
// ─────────────────────────────────────────────────────────────────

/// Category tag of a runtime descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuntimeType {
    Usb,
    Wifi,
    Simulator,
    Remote,
    Local,
    #[serde(other)]
    Other,
}

impl RuntimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeType::Usb => "USB",
            RuntimeType::Wifi => "WIFI",
            RuntimeType::Simulator => "SIMULATOR",
            RuntimeType::Remote => "REMOTE",
            RuntimeType::Local => "LOCAL",
            RuntimeType::Other => "OTHER",
        }
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────
// Install progress
// ─────────────────────────────────────────────────────────────────

/// Upload progress reported by the apps actor while installing a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
}
