//! The app manager: the stateful hub between the UI and a connected runtime
//!
//! `AppManager` owns the selected project and runtime, the per-connection
//! caches (apps front, `listTabs` reply) and the runtime list, and republishes
//! every transition as an [`AppManagerUpdate`].
//!
//! Operations are split by concern:
//! - `connection` - status lifecycle, connect/disconnect, telemetry
//! - `selection` - project/runtime selection and running status
//! - `validation` - validation pipeline and manifest writing
//! - `install` - build, validate, install and launch-or-reload
//! - `target` - target acquisition with bounded retry, runtime app control
//! - `tabs` - tab store events
//! - `runtime_list` - runtime list buckets
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`, a collaborator call or an observer callback.

mod connection;
mod install;
mod runtime_list;
mod selection;
mod tabs;
mod target;
mod validation;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use webide_core::prelude::*;
use webide_core::{ErrorReport, SharedProject};
use webide_remote::{
    AppsFront, AppsFrontFactory, Connection, ListTabsResponse, ListenerId, ProjectBuilder,
    ProjectStore, ProjectValidator, Runtime, RuntimeRegistry, TabStore, Telemetry,
};

use crate::config::Settings;
use crate::observer::{AppManagerObserver, ObserverId};
use crate::update::AppManagerUpdate;

pub use install::InstallOutcome;
pub use runtime_list::RuntimeList;
pub use selection::Selection;
pub use tabs::{tab_display_name, tab_favicon};

/// External collaborators the manager drives.
#[derive(Clone)]
pub struct Collaborators {
    pub connection: Arc<dyn Connection>,
    pub registry: Arc<dyn RuntimeRegistry>,
    pub apps_factory: Arc<dyn AppsFrontFactory>,
    pub tab_store: Arc<dyn TabStore>,
    pub validator: Arc<dyn ProjectValidator>,
    pub builder: Arc<dyn ProjectBuilder>,
    pub store: Arc<dyn ProjectStore>,
    pub telemetry: Arc<dyn Telemetry>,
}

#[derive(Default)]
struct ManagerState {
    selected_project: Option<SharedProject>,
    selected_runtime: Option<Arc<dyn Runtime>>,

    /// Present only while connected to a runtime with an apps actor
    apps_front: Option<Arc<dyn AppsFront>>,
    list_tabs_response: Option<ListTabsResponse>,

    runtime_list: RuntimeList,

    /// Bumped on every connection transition; stale apps-front setups
    /// compare against it and discard themselves
    generation: u64,

    /// Forwards install progress of the current apps front
    progress_task: Option<JoinHandle<()>>,

    lifecycle_listener: Option<ListenerId>,
    background: Vec<JoinHandle<()>>,
    runtime: Option<Handle>,
    initialized: bool,
}

struct Inner {
    deps: Collaborators,
    settings: Settings,
    state: Mutex<ManagerState>,
    updates: broadcast::Sender<AppManagerUpdate>,
    observers: Mutex<Vec<(ObserverId, Arc<dyn AppManagerObserver>)>>,
    next_observer: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn observers(&self) -> Vec<Arc<dyn AppManagerObserver>> {
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, o)| o.clone())
            .collect()
    }
}

/// Orchestrates connection, selection and project workflows.
///
/// Cheap to clone; clones share the same state. Construct one per session,
/// call [`AppManager::init`] inside a Tokio runtime, and
/// [`AppManager::shutdown`] when done.
#[derive(Clone)]
pub struct AppManager {
    inner: Arc<Inner>,
}

impl AppManager {
    pub fn new(deps: Collaborators, settings: Settings) -> Self {
        let (updates, _) = broadcast::channel(settings.events.capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                deps,
                settings,
                state: Mutex::new(ManagerState::default()),
                updates,
                observers: Mutex::new(Vec::new()),
                next_observer: AtomicU64::new(1),
            }),
        }
    }

    fn from_weak(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Start observing the connection, the tab store and the runtime
    /// registry, and build the initial runtime list.
    ///
    /// Must be called from within a Tokio runtime. Calling it twice is a no-op.
    pub fn init(&self) {
        {
            let mut state = self.inner.lock();
            if state.initialized {
                return;
            }
            state.initialized = true;
            state.runtime = Some(Handle::current());
        }

        let weak = self.downgrade();
        let listener = self
            .inner
            .deps
            .connection
            .add_status_listener(Arc::new(move |status| {
                if let Some(manager) = AppManager::from_weak(&weak) {
                    manager.on_connection_changed(status);
                }
            }));

        let mut background = Vec::new();
        background.extend(self.spawn(tabs::watch_tab_store(
            self.downgrade(),
            self.inner.deps.tab_store.subscribe(),
        )));
        background.extend(self.spawn(runtime_list::watch_registry(
            self.downgrade(),
            self.inner.deps.registry.subscribe(),
        )));

        {
            let mut state = self.inner.lock();
            state.lifecycle_listener = Some(listener);
            state.background = background;
        }

        self.inner.deps.registry.enable();
        self.rebuild_runtime_list();
        info!("App manager initialized");
    }

    /// Clear the selection, stop background work, drop per-connection
    /// caches and disconnect.
    pub fn shutdown(&self) {
        self.select_project(None);
        self.select_runtime(None);
        self.inner.deps.registry.disable();

        self.teardown_apps_front();

        let (listener, background) = {
            let mut state = self.inner.lock();
            state.initialized = false;
            state.runtime_list = RuntimeList::default();
            (
                state.lifecycle_listener.take(),
                std::mem::take(&mut state.background),
            )
        };
        for task in background {
            task.abort();
        }
        if let Some(id) = listener {
            self.inner.deps.connection.remove_status_listener(id);
        }

        self.inner.deps.connection.disconnect();
        info!("App manager shut down");
    }

    // ─────────────────────────────────────────────────────────
    // Notification
    // ─────────────────────────────────────────────────────────

    /// Receive every update published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AppManagerUpdate> {
        self.inner.updates.subscribe()
    }

    /// Register an observer for synchronous delivery.
    pub fn register_observer(&self, observer: Arc<dyn AppManagerObserver>) -> ObserverId {
        let id = ObserverId(self.inner.next_observer.fetch_add(1, Ordering::SeqCst));
        debug!("Registered observer {}", observer.name());
        self.inner
            .observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, observer));
        id
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.inner.observers.lock().unwrap_or_else(|e| e.into_inner());
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    pub(crate) fn publish(&self, update: AppManagerUpdate) {
        trace!("app-manager-update: {}", update.reason());
        let _ = self.inner.updates.send(update.clone());
        for observer in self.inner.observers() {
            observer.on_update(&update);
        }
    }

    /// Log a user-visible error and hand it to observers.
    pub fn report_error(&self, report: ErrorReport) {
        warn!("{} ({})", report, report.key.id());
        for observer in self.inner.observers() {
            observer.on_error(&report);
        }
    }

    // ─────────────────────────────────────────────────────────
    // Background tasks
    // ─────────────────────────────────────────────────────────

    pub(crate) fn spawn<F>(&self, task: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = self
            .inner
            .lock()
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok());
        match handle {
            Some(handle) => Some(handle.spawn(task)),
            None => {
                warn!("No Tokio runtime available, dropping background task");
                None
            }
        }
    }

    pub(crate) fn is_selected(&self, project: &SharedProject) -> bool {
        self.inner
            .lock()
            .selected_project
            .as_ref()
            .is_some_and(|selected| selected.ptr_eq(project))
    }
}
