//! Runtime list buckets

use std::sync::{Arc, Weak};

use tokio::sync::broadcast;

use webide_core::prelude::*;
use webide_core::RuntimeType;
use webide_remote::Runtime;

use super::{AppManager, Inner};
use crate::update::AppManagerUpdate;

/// Known runtimes grouped by category.
#[derive(Debug, Clone, Default)]
pub struct RuntimeList {
    pub usb: Vec<Arc<dyn Runtime>>,
    pub wifi: Vec<Arc<dyn Runtime>>,
    pub simulator: Vec<Arc<dyn Runtime>>,
    pub other: Vec<Arc<dyn Runtime>>,
}

impl RuntimeList {
    /// Bucket `runtimes` by category, keeping their order.
    pub fn from_runtimes(runtimes: impl IntoIterator<Item = Arc<dyn Runtime>>) -> Self {
        let mut list = Self::default();
        for runtime in runtimes {
            match runtime.runtime_type() {
                RuntimeType::Usb => list.usb.push(runtime),
                RuntimeType::Wifi => list.wifi.push(runtime),
                RuntimeType::Simulator => list.simulator.push(runtime),
                _ => list.other.push(runtime),
            }
        }
        list
    }

    pub fn len(&self) -> usize {
        self.usb.len() + self.wifi.len() + self.simulator.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AppManager {
    /// Snapshot of the runtime list.
    pub fn runtime_list(&self) -> RuntimeList {
        self.inner.lock().runtime_list.clone()
    }

    /// Replace the runtime list with the registry's current runtimes.
    pub fn rebuild_runtime_list(&self) {
        let list = RuntimeList::from_runtimes(self.inner.deps.registry.list_runtimes());
        debug!("Runtime list rebuilt with {} runtimes", list.len());
        self.inner.lock().runtime_list = list;
        self.publish(AppManagerUpdate::RuntimeDetails);
        self.publish(AppManagerUpdate::RuntimeList);
    }
}

pub(super) async fn watch_registry(manager: Weak<Inner>, mut rx: broadcast::Receiver<()>) {
    loop {
        match rx.recv().await {
            // A lagged receiver still means the list changed
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => break,
        }
        match AppManager::from_weak(&manager) {
            Some(manager) => manager.rebuild_runtime_list(),
            None => break,
        }
    }
}
