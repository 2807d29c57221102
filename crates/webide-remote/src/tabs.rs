//! Tab enumeration source

use futures_util::future::BoxFuture;
use tokio::sync::broadcast;

use webide_core::prelude::*;
use webide_core::Tab;

use crate::protocol::Target;

/// Changes to the tracked selected tab.
#[derive(Debug, Clone, PartialEq)]
pub enum TabEvent {
    /// The selected tab navigated (URL or title changed)
    Navigate,
    /// The selected tab was closed
    Closed,
}

/// Lists the runtime's tabs and tracks the one the user selected.
pub trait TabStore: Send + Sync {
    fn list_tabs(&self) -> BoxFuture<'_, Result<Vec<Tab>>>;

    fn selected_tab(&self) -> Option<Tab>;

    fn set_selected_tab(&self, tab: Option<Tab>);

    /// Target for the selected tab.
    fn target_for_tab(&self) -> BoxFuture<'_, Result<Target>>;

    fn subscribe(&self) -> broadcast::Receiver<TabEvent>;
}
