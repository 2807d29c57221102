//! # webide-core - Core Domain Types
//!
//! Foundation crate for the WebIDE app manager. Provides domain types, error
//! handling, logging setup, user-visible messages and manifest helpers.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing, url).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`Project`], [`ProjectKind`], [`ProjectType`] - The selectable unit of work
//! - [`SharedProject`] - A project shared by reference between the selection and workflows
//! - [`ValidationStatus`] - Outcome of manifest validation
//! - [`Manifest`], [`Tab`], [`RuntimeType`], [`InstallProgress`]
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with precondition / recoverable classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Manifest helpers (`manifest`)
//! - [`largest_icon()`], [`resolve_icon_url()`], [`display_name()`]
//!
//! ### Messages (`strings`)
//! - [`ErrorKey`], [`ErrorReport`] - Localization-keyed user-visible errors
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use webide_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod manifest;
pub mod prelude;
pub mod strings;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use error::{Error, Result, ResultExt};
pub use manifest::{
    display_name, hosted_app_id, largest_icon, origin_url, resolve_icon_url,
};
pub use strings::{ErrorKey, ErrorReport, TAB_LOADING_NAME};
pub use types::{
    InstallProgress, Manifest, Project, ProjectKind, ProjectType, RuntimeType, SharedProject,
    Tab, ValidationStatus, DEFAULT_PROJECT_ICON, DEFAULT_PROJECT_NAME,
};
