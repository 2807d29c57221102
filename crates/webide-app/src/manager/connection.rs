//! Connection lifecycle: reacting to status changes, connect/disconnect
//! workflows and connection telemetry

use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use tokio::sync::{broadcast, oneshot};

use webide_core::prelude::*;
use webide_core::InstallProgress;
use webide_remote::{
    connection_result_for, same_runtime, ActorFront, AppsChanged, AppsFront, Connection,
    ConnectionStatus, FrontKind, ListenerId, Runtime, CONNECTION_RESULT, CONNECTION_TIME,
};

use super::AppManager;
use crate::update::AppManagerUpdate;

/// One-shot wait for a connection status matching a predicate.
///
/// The listener is registered on creation and removed on drop, so it fires
/// at most once and never outlives the wait.
pub(crate) struct StatusWaiter {
    connection: Arc<dyn Connection>,
    id: ListenerId,
    rx: oneshot::Receiver<ConnectionStatus>,
}

impl StatusWaiter {
    pub(crate) fn new(
        connection: Arc<dyn Connection>,
        accept: impl Fn(ConnectionStatus) -> bool + Send + Sync + 'static,
    ) -> Self {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let id = connection.add_status_listener(Arc::new(move |status| {
            if accept(status) {
                if let Some(tx) = tx.lock().unwrap_or_else(|e| e.into_inner()).take() {
                    let _ = tx.send(status);
                }
            }
        }));
        Self { connection, id, rx }
    }

    pub(crate) async fn wait(mut self) -> Result<ConnectionStatus> {
        (&mut self.rx).await.map_err(|_| Error::ChannelClosed)
    }
}

impl Drop for StatusWaiter {
    fn drop(&mut self) {
        self.connection.remove_status_listener(self.id);
    }
}

impl AppManager {
    /// Whether the connection is CONNECTED.
    pub fn connected(&self) -> bool {
        self.inner.deps.connection.status() == ConnectionStatus::Connected
    }

    pub(crate) fn on_connection_changed(&self, status: ConnectionStatus) {
        info!("Connection status changed: {}", status);

        if status == ConnectionStatus::Disconnected {
            self.select_runtime(None);
        }

        if status == ConnectionStatus::Connected {
            let generation = {
                let mut state = self.inner.lock();
                state.generation += 1;
                state.generation
            };
            let manager = self.clone();
            self.spawn(async move {
                if let Err(e) = manager.attach(generation).await {
                    warn!("Failed to query the connected runtime: {}", e);
                }
            });
        } else {
            self.teardown_apps_front();
        }

        self.publish(AppManagerUpdate::Connection(status));
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    /// Query the freshly connected runtime and, when it has an apps actor,
    /// set up the apps front.
    async fn attach(&self, generation: u64) -> Result<()> {
        let client = self
            .inner
            .deps
            .connection
            .client()
            .ok_or(Error::NotConnected)?;
        let response = client.list_tabs().await?;

        if !response.has_apps_actor() {
            {
                let mut state = self.inner.lock();
                if state.generation != generation {
                    debug!("Discarding listTabs reply of a previous connection");
                    return Ok(());
                }
                state.list_tabs_response = Some(response);
            }
            self.publish(AppManagerUpdate::ListTabsResponse);
            return Ok(());
        }

        if !self.is_current(generation) {
            debug!("Discarding listTabs reply of a previous connection");
            return Ok(());
        }

        let front = self.inner.deps.apps_factory.create(client, &response);
        let progress_task = self.spawn(forward_install_progress(
            self.downgrade(),
            front.subscribe_install_progress(),
        ));

        let weak = self.downgrade();
        let on_change: AppsChanged = Arc::new(move || {
            if let Some(manager) = AppManager::from_weak(&weak) {
                manager.check_if_project_is_running();
            }
        });

        if let Err(e) = front.watch_apps(on_change).await {
            if let Some(task) = progress_task {
                task.abort();
            }
            return Err(e);
        }

        // Nothing but watch_apps may reach the front before this point
        let installed = {
            let mut state = self.inner.lock();
            if state.generation == generation {
                state.apps_front = Some(front.clone());
                state.list_tabs_response = Some(response);
                if let Some(old) = std::mem::replace(&mut state.progress_task, progress_task) {
                    old.abort();
                }
                true
            } else {
                if let Some(task) = progress_task {
                    task.abort();
                }
                false
            }
        };

        if !installed {
            debug!("Connection changed while watching apps, dropping the apps front");
            self.unwatch_in_background(front);
            return Ok(());
        }

        self.publish(AppManagerUpdate::ListTabsResponse);
        self.check_if_project_is_running();
        self.publish(AppManagerUpdate::RuntimeAppsFound);

        self.spawn(async move {
            if let Err(e) = front.fetch_icons().await {
                debug!("Failed to fetch app icons: {}", e);
            }
        });
        Ok(())
    }

    /// Drop the apps front and the `listTabs` reply.
    pub(crate) fn teardown_apps_front(&self) {
        let (front, progress_task) = {
            let mut state = self.inner.lock();
            state.generation += 1;
            state.list_tabs_response = None;
            (state.apps_front.take(), state.progress_task.take())
        };
        if let Some(task) = progress_task {
            task.abort();
        }
        if let Some(front) = front {
            self.unwatch_in_background(front);
        }
    }

    fn unwatch_in_background(&self, front: Arc<dyn AppsFront>) {
        self.spawn(async move {
            if let Err(e) = front.unwatch_apps().await {
                debug!("Failed to unwatch apps: {}", e);
            }
        });
    }

    // ─────────────────────────────────────────────────────────
    // Connect / disconnect
    // ─────────────────────────────────────────────────────────

    /// Connect the shared connection to `runtime`.
    ///
    /// Resolves once the connection reaches CONNECTED, or fails when it falls
    /// back to DISCONNECTED. A failing connect capability fails the call only
    /// if neither status was reached before it failed.
    /// Already being connected to `runtime` succeeds immediately.
    pub async fn connect_to_runtime(&self, runtime: Arc<dyn Runtime>) -> Result<()> {
        let already_connected = self.connected()
            && self
                .inner
                .lock()
                .selected_runtime
                .as_ref()
                .is_some_and(|selected| same_runtime(selected, &runtime));
        if already_connected {
            debug!("Already connected to {}", runtime.name());
            return Ok(());
        }

        let result = self.open_connection(&runtime).await;
        self.record_connection_result(&runtime, result.is_ok());
        if let Err(e) = &result {
            warn!("Failed to connect to {}: {}", runtime.name(), e);
        }
        result
    }

    async fn open_connection(&self, runtime: &Arc<dyn Runtime>) -> Result<()> {
        self.disconnect_runtime().await?;
        self.select_runtime(Some(runtime.clone()));

        let connection = self.inner.deps.connection.clone();
        let waiter = StatusWaiter::new(connection.clone(), |status| {
            matches!(
                status,
                ConnectionStatus::Connected | ConnectionStatus::Disconnected
            )
        });

        connection.reset_options();
        info!("Connecting to {} ({})", runtime.name(), runtime.runtime_type());
        let mut attempt = runtime.connect(connection);
        let wait = waiter.wait();
        tokio::pin!(wait);

        let status = tokio::select! {
            status = &mut wait => status?,
            attempted = &mut attempt => match attempted {
                Ok(()) => wait.as_mut().await?,
                // A status seen before the capability failed still decides
                Err(e) => match wait.as_mut().now_or_never() {
                    Some(status) => status?,
                    None => return Err(e),
                },
            }
        };

        match status {
            ConnectionStatus::Connected => Ok(()),
            _ => Err(Error::connection_failed(runtime.name())),
        }
    }

    fn record_connection_result(&self, runtime: &Arc<dyn Runtime>, success: bool) {
        let telemetry = self.inner.deps.telemetry.clone();
        telemetry.log(CONNECTION_RESULT, success);
        telemetry.log(&connection_result_for(runtime.runtime_type()), success);

        if success {
            telemetry.start_timer(CONNECTION_TIME);
            // Any status change ends the connection-time measurement
            let waiter = StatusWaiter::new(self.inner.deps.connection.clone(), |_| true);
            self.spawn(async move {
                let _ = waiter.wait().await;
                telemetry.stop_timer(CONNECTION_TIME);
            });
        }
    }

    /// Disconnect and resolve once DISCONNECTED is observed; succeeds
    /// immediately when not connected.
    pub async fn disconnect_runtime(&self) -> Result<()> {
        if !self.connected() {
            return Ok(());
        }
        let connection = self.inner.deps.connection.clone();
        let waiter = StatusWaiter::new(connection.clone(), |status| {
            status == ConnectionStatus::Disconnected
        });
        connection.disconnect();
        waiter.wait().await?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Global actor fronts
    // ─────────────────────────────────────────────────────────

    /// Whether the runtime exposes its main process for debugging.
    pub fn is_main_process_debuggable(&self) -> bool {
        self.inner
            .lock()
            .list_tabs_response
            .as_ref()
            .is_some_and(|response| response.console_actor.is_some())
    }

    pub fn device_front(&self) -> Option<ActorFront> {
        self.actor_front(FrontKind::Device)
    }

    pub fn preference_front(&self) -> Option<ActorFront> {
        self.actor_front(FrontKind::Preference)
    }

    pub fn settings_front(&self) -> Option<ActorFront> {
        self.actor_front(FrontKind::Settings)
    }

    fn actor_front(&self, kind: FrontKind) -> Option<ActorFront> {
        let response = self.inner.lock().list_tabs_response.clone()?;
        let client = self.inner.deps.connection.client()?;
        ActorFront::from_response(kind, client, &response)
    }
}

async fn forward_install_progress(
    manager: std::sync::Weak<super::Inner>,
    mut rx: broadcast::Receiver<InstallProgress>,
) {
    loop {
        match rx.recv().await {
            Ok(progress) => match AppManager::from_weak(&manager) {
                Some(manager) => manager.publish(AppManagerUpdate::InstallProgress(progress)),
                None => break,
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Install progress lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
