//! Apps actor front: installed apps, install requests and app control
//!
//! Every method other than [`AppsFront::watch_apps`] requires `watch_apps`
//! to have resolved first; the actor only tracks apps for watchers.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use webide_core::prelude::*;
use webide_core::{InstallProgress, Manifest};

use crate::protocol::{ListTabsResponse, ProtocolClient, Target};

/// Callback invoked whenever an app is installed, uninstalled, launched or closed.
pub type AppsChanged = Arc<dyn Fn() + Send + Sync>;

/// An app installed on the runtime.
pub trait AppHandle: Send + Sync + fmt::Debug {
    fn manifest_url(&self) -> String;

    fn running(&self) -> bool;

    fn launch(&self) -> BoxFuture<'_, Result<()>>;

    fn reload(&self) -> BoxFuture<'_, Result<()>>;

    fn close(&self) -> BoxFuture<'_, Result<()>>;

    /// Target for the app's document; fails until the app is attachable.
    fn get_target(&self) -> BoxFuture<'_, Result<Target>>;
}

/// Metadata sent with a hosted-app install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedMetadata {
    pub origin: String,
    #[serde(rename = "manifestURL")]
    pub manifest_url: String,
}

/// Reply to a packaged install.
#[derive(Debug, Clone)]
pub struct PackagedInstall {
    /// Origin the runtime assigned to the app
    pub app_id: String,
    pub app: Arc<dyn AppHandle>,
}

/// Reply to a hosted install.
#[derive(Debug, Clone)]
pub struct HostedInstall {
    pub app: Arc<dyn AppHandle>,
}

/// Client-side proxy of the runtime's apps actor.
pub trait AppsFront: Send + Sync {
    /// Start tracking installed apps; `on_change` fires on every app change.
    fn watch_apps(&self, on_change: AppsChanged) -> BoxFuture<'_, Result<()>>;

    fn unwatch_apps(&self) -> BoxFuture<'_, Result<()>>;

    /// Installed apps by manifest URL.
    fn apps(&self) -> HashMap<String, Arc<dyn AppHandle>>;

    fn install_packaged(
        &self,
        package_dir: PathBuf,
        origin_hint: Option<String>,
    ) -> BoxFuture<'_, Result<PackagedInstall>>;

    fn install_hosted(
        &self,
        app_id: String,
        metadata: HostedMetadata,
        manifest: Option<Manifest>,
    ) -> BoxFuture<'_, Result<HostedInstall>>;

    /// Prefetch icons of all installed apps.
    fn fetch_icons(&self) -> BoxFuture<'_, Result<()>>;

    /// Upload progress of packaged installs.
    fn subscribe_install_progress(&self) -> broadcast::Receiver<InstallProgress>;
}

/// Builds an [`AppsFront`] for a connection whose `listTabs` reply
/// advertised an apps actor.
pub trait AppsFrontFactory: Send + Sync {
    fn create(
        &self,
        client: Arc<dyn ProtocolClient>,
        response: &ListTabsResponse,
    ) -> Arc<dyn AppsFront>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_metadata_wire_names() {
        let metadata = HostedMetadata {
            origin: "http://example.com/".to_string(),
            manifest_url: "http://example.com/manifest.webapp".to_string(),
        };
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["origin"], "http://example.com/");
        assert_eq!(value["manifestURL"], "http://example.com/manifest.webapp");
    }
}
