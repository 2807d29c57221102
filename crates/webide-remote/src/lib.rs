//! # webide-remote - Remote Runtime Contracts
//!
//! Contracts of everything the app manager drives but does not own: the
//! debugging-protocol connection, runtime descriptors and their registry,
//! the apps actor front, the tab store, the project validator, builder and
//! store, and telemetry.
//!
//! Depends on [`webide_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Connection
//! - [`Connection`] - Status machine plus connect/disconnect requests
//! - [`ConnectionStatus`], [`StatusListener`], [`ListenerId`]
//!
//! ### Protocol
//! - [`ProtocolClient`] - Low-level `listTabs` and actor requests
//! - [`ListTabsResponse`] - Root actor reply, cached per connection
//! - [`Target`] - Debuggable handle for a toolbox
//! - [`ActorFront`], [`FrontKind`] - Device, preference and settings actors
//!
//! ### Runtimes
//! - [`Runtime`], [`RuntimeRegistry`], [`same_runtime()`]
//!
//! ### Apps
//! - [`AppsFront`], [`AppsFrontFactory`], [`AppHandle`]
//!
//! ### Collaborators
//! - [`TabStore`], [`ProjectValidator`], [`ProjectBuilder`], [`ProjectStore`]
//! - [`Telemetry`], [`TracingTelemetry`]
//!
//! ## Test helpers
//!
//! With the `test-helpers` feature, [`test_utils`] provides in-memory doubles
//! of every contract.

pub mod apps;
pub mod connection;
pub mod project;
pub mod protocol;
pub mod runtimes;
pub mod tabs;
pub mod telemetry;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use apps::{
    AppHandle, AppsChanged, AppsFront, AppsFrontFactory, HostedInstall, HostedMetadata,
    PackagedInstall,
};
pub use connection::{Connection, ConnectionStatus, ListenerId, StatusListener};
pub use project::{BuildLogger, ProjectBuilder, ProjectStore, ProjectValidator, ValidationReport};
pub use protocol::{ActorFront, FrontKind, ListTabsResponse, ProtocolClient, Target};
pub use runtimes::{same_runtime, Runtime, RuntimeRegistry};
pub use tabs::{TabEvent, TabStore};
pub use telemetry::{
    connection_result_for, Telemetry, TracingTelemetry, CONNECTION_RESULT, CONNECTION_TIME,
};
#[cfg(any(test, feature = "test-helpers"))]
pub use telemetry::MockTelemetry;
