//! WebIDE app manager
//!
//! Orchestrates the connection to a runtime, project and runtime selection,
//! project validation and the install-and-run workflow.
//!
//! The work is split across the workspace crates, re-exported here:
//! - [`core`] - domain types, errors, logging, manifest helpers
//! - [`remote`] - contracts of the connection, actor fronts and collaborators
//! - [`app`] - the [`AppManager`] itself, settings and the file project store

pub use webide_app as app;
pub use webide_core as core;
pub use webide_remote as remote;

// Re-export main entry points
pub use webide_app::{
    AppManager, AppManagerObserver, AppManagerUpdate, Collaborators, FileProjectStore,
    InstallOutcome, ProjectChange, RuntimeList, Selection, Settings,
};
pub use webide_core::logging::{init as init_logging, init_with as init_logging_with, LogConfig};
pub use webide_core::{Error, Result};
