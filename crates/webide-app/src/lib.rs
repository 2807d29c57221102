//! webide-app - App manager orchestration for the WebIDE
//!
//! This crate implements the [`AppManager`]: the stateful hub that tracks the
//! connection to a runtime, the selected project and runtime, and runs the
//! validation and install-and-run workflows. It also provides settings
//! loading and a JSON file project store.

pub mod config;
pub mod manager;
pub mod observer;
pub mod store;
pub mod update;

// Re-export primary types
pub use config::Settings;
pub use manager::{AppManager, Collaborators, InstallOutcome, RuntimeList, Selection};
pub use observer::{AppManagerObserver, ObserverId, ProjectChange};
pub use store::FileProjectStore;
pub use update::AppManagerUpdate;
