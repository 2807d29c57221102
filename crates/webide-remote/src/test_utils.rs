//! In-memory doubles of the remote contracts
//!
//! Available to other crates through the `test-helpers` feature. Each double
//! records the calls made on it so tests can assert on ordering and counts.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::BoxFuture;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Notify};

use webide_core::prelude::*;
use webide_core::{InstallProgress, Manifest, Project, RuntimeType, Tab};

use crate::apps::{
    AppHandle, AppsChanged, AppsFront, AppsFrontFactory, HostedInstall, HostedMetadata,
    PackagedInstall,
};
use crate::connection::{Connection, ConnectionStatus, ListenerId, StatusListener};
use crate::project::{
    BuildLogger, ProjectBuilder, ProjectStore, ProjectValidator, ValidationReport,
};
use crate::protocol::{ListTabsResponse, ProtocolClient, Target};
use crate::runtimes::{Runtime, RuntimeRegistry};
use crate::tabs::{TabEvent, TabStore};
use crate::telemetry::Telemetry;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// `listTabs` reply of a runtime with an apps actor and the usual globals.
pub fn apps_capable_response() -> ListTabsResponse {
    ListTabsResponse {
        from: Some("root".to_string()),
        webapps_actor: Some("conn0.webapps1".to_string()),
        console_actor: Some("conn0.console2".to_string()),
        device_actor: Some("conn0.device3".to_string()),
        preference_actor: Some("conn0.preference4".to_string()),
        settings_actor: Some("conn0.settings5".to_string()),
        ..Default::default()
    }
}

/// `listTabs` reply of a runtime that can't handle apps.
pub fn tabs_only_response() -> ListTabsResponse {
    ListTabsResponse {
        from: Some("root".to_string()),
        ..Default::default()
    }
}

pub fn test_tab(actor: &str, url: &str, title: Option<&str>) -> Tab {
    Tab {
        actor: actor.to_string(),
        url: url.to_string(),
        title: title.map(str::to_string),
    }
}

// ─────────────────────────────────────────────────────────────────
// Protocol client
// ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct MockProtocolClient {
    response: Mutex<ListTabsResponse>,
    requests: Mutex<Vec<Value>>,
    list_tabs_calls: AtomicUsize,
}

impl MockProtocolClient {
    pub fn new(response: ListTabsResponse) -> Self {
        Self {
            response: Mutex::new(response),
            requests: Mutex::new(Vec::new()),
            list_tabs_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_response(&self, response: ListTabsResponse) {
        *lock(&self.response) = response;
    }

    /// Packets sent through [`ProtocolClient::request`], oldest first.
    pub fn requests(&self) -> Vec<Value> {
        lock(&self.requests).clone()
    }

    pub fn list_tabs_calls(&self) -> usize {
        self.list_tabs_calls.load(Ordering::SeqCst)
    }
}

impl ProtocolClient for MockProtocolClient {
    fn list_tabs(&self) -> BoxFuture<'_, Result<ListTabsResponse>> {
        self.list_tabs_calls.fetch_add(1, Ordering::SeqCst);
        let response = lock(&self.response).clone();
        Box::pin(async move { Ok(response) })
    }

    fn request(&self, packet: Value) -> BoxFuture<'_, Result<Value>> {
        let from = packet.get("to").cloned().unwrap_or(Value::Null);
        lock(&self.requests).push(packet);
        Box::pin(async move { Ok(json!({ "from": from })) })
    }
}

// ─────────────────────────────────────────────────────────────────
// Connection
// ─────────────────────────────────────────────────────────────────

/// How [`MockConnection::connect`] behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
    /// CONNECTING then CONNECTED
    Succeed,
    /// CONNECTING then DISCONNECTED
    Refuse,
    /// Stays CONNECTING
    Hang,
}

struct ConnectionState {
    status: ConnectionStatus,
    listeners: Vec<(ListenerId, StatusListener)>,
    next_listener: u64,
    endpoint: Option<(String, u16)>,
    behavior: ConnectBehavior,
    client: Option<Arc<dyn ProtocolClient>>,
    connect_calls: usize,
    disconnect_calls: usize,
    reset_calls: usize,
}

/// Connection whose status machine is driven synchronously.
pub struct MockConnection {
    state: Mutex<ConnectionState>,
}

impl fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("MockConnection")
            .field("status", &state.status)
            .field("listeners", &state.listeners.len())
            .field("endpoint", &state.endpoint)
            .finish()
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState {
                status: ConnectionStatus::Disconnected,
                listeners: Vec::new(),
                next_listener: 0,
                endpoint: None,
                behavior: ConnectBehavior::Succeed,
                client: None,
                connect_calls: 0,
                disconnect_calls: 0,
                reset_calls: 0,
            }),
        }
    }

    pub fn with_client(client: Arc<dyn ProtocolClient>) -> Self {
        let connection = Self::new();
        lock(&connection.state).client = Some(client);
        connection
    }

    pub fn set_behavior(&self, behavior: ConnectBehavior) {
        lock(&self.state).behavior = behavior;
    }

    /// Force a status transition and notify listeners, as the transport would.
    pub fn set_status(&self, status: ConnectionStatus) {
        let listeners: Vec<StatusListener> = {
            let mut state = lock(&self.state);
            state.status = status;
            state.listeners.iter().map(|(_, l)| l.clone()).collect()
        };
        for listener in listeners {
            listener(status);
        }
    }

    pub fn connect_calls(&self) -> usize {
        lock(&self.state).connect_calls
    }

    pub fn disconnect_calls(&self) -> usize {
        lock(&self.state).disconnect_calls
    }

    pub fn reset_calls(&self) -> usize {
        lock(&self.state).reset_calls
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.state).listeners.len()
    }

    pub fn endpoint(&self) -> Option<(String, u16)> {
        lock(&self.state).endpoint.clone()
    }
}

impl Connection for MockConnection {
    fn status(&self) -> ConnectionStatus {
        lock(&self.state).status
    }

    fn add_status_listener(&self, listener: StatusListener) -> ListenerId {
        let mut state = lock(&self.state);
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state.listeners.push((id, listener));
        id
    }

    fn remove_status_listener(&self, id: ListenerId) {
        lock(&self.state).listeners.retain(|(lid, _)| *lid != id);
    }

    fn set_endpoint(&self, host: &str, port: u16) {
        lock(&self.state).endpoint = Some((host.to_string(), port));
    }

    fn connect(&self) {
        let behavior = {
            let mut state = lock(&self.state);
            state.connect_calls += 1;
            state.behavior
        };
        self.set_status(ConnectionStatus::Connecting);
        match behavior {
            ConnectBehavior::Succeed => self.set_status(ConnectionStatus::Connected),
            ConnectBehavior::Refuse => self.set_status(ConnectionStatus::Disconnected),
            ConnectBehavior::Hang => {}
        }
    }

    fn disconnect(&self) {
        let status = {
            let mut state = lock(&self.state);
            state.disconnect_calls += 1;
            state.status
        };
        if status == ConnectionStatus::Disconnected {
            return;
        }
        self.set_status(ConnectionStatus::Disconnecting);
        self.set_status(ConnectionStatus::Disconnected);
    }

    fn reset_options(&self) {
        let mut state = lock(&self.state);
        state.reset_calls += 1;
        state.endpoint = None;
    }

    fn client(&self) -> Option<Arc<dyn ProtocolClient>> {
        lock(&self.state).client.clone()
    }
}

// ─────────────────────────────────────────────────────────────────
// Runtimes
// ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct MockRuntime {
    name: String,
    runtime_type: RuntimeType,
    fail: AtomicBool,
    fail_after_connect: AtomicBool,
    connect_calls: AtomicUsize,
}

impl MockRuntime {
    pub fn new(name: &str, runtime_type: RuntimeType) -> Self {
        Self {
            name: name.to_string(),
            runtime_type,
            fail: AtomicBool::new(false),
            fail_after_connect: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
        }
    }

    /// Make the connect capability itself fail.
    pub fn failing(name: &str, runtime_type: RuntimeType) -> Self {
        let runtime = Self::new(name, runtime_type);
        runtime.fail.store(true, Ordering::SeqCst);
        runtime
    }

    /// Connect the connection, then report the capability as failed.
    pub fn connects_then_fails(name: &str, runtime_type: RuntimeType) -> Self {
        let runtime = Self::new(name, runtime_type);
        runtime.fail_after_connect.store(true, Ordering::SeqCst);
        runtime
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }
}

impl Runtime for MockRuntime {
    fn runtime_type(&self) -> RuntimeType {
        self.runtime_type
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn connect(&self, connection: Arc<dyn Connection>) -> BoxFuture<'static, Result<()>> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail.load(Ordering::SeqCst);
        let fail_after_connect = self.fail_after_connect.load(Ordering::SeqCst);
        let name = self.name.clone();
        Box::pin(async move {
            if fail {
                return Err(Error::connection_failed(name));
            }
            connection.set_endpoint("localhost", 6000);
            connection.connect();
            if fail_after_connect {
                return Err(Error::protocol("connect capability failed after connecting"));
            }
            Ok(())
        })
    }
}

pub struct MockRegistry {
    runtimes: Mutex<Vec<Arc<dyn Runtime>>>,
    changes: broadcast::Sender<()>,
    enabled: AtomicBool,
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRegistry {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            runtimes: Mutex::new(Vec::new()),
            changes,
            enabled: AtomicBool::new(false),
        }
    }

    /// Replace the known runtimes and notify subscribers.
    pub fn set_runtimes(&self, runtimes: Vec<Arc<dyn Runtime>>) {
        *lock(&self.runtimes) = runtimes;
        let _ = self.changes.send(());
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl RuntimeRegistry for MockRegistry {
    fn list_runtimes(&self) -> Vec<Arc<dyn Runtime>> {
        lock(&self.runtimes).clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }
}

// ─────────────────────────────────────────────────────────────────
// Apps
// ─────────────────────────────────────────────────────────────────

type Watcher = Arc<Mutex<Option<AppsChanged>>>;

fn notify_watcher(watcher: &Watcher) {
    let callback = lock(watcher).clone();
    if let Some(callback) = callback {
        callback();
    }
}

pub struct MockApp {
    manifest_url: String,
    running: AtomicBool,
    target_failures: AtomicUsize,
    target_attempts: AtomicUsize,
    fail_launch: AtomicBool,
    launch_calls: AtomicUsize,
    reload_calls: AtomicUsize,
    close_calls: AtomicUsize,
    watcher: Watcher,
    client: Arc<dyn ProtocolClient>,
}

impl fmt::Debug for MockApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockApp")
            .field("manifest_url", &self.manifest_url)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

impl MockApp {
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Make the next `count` target requests fail.
    pub fn fail_targets(&self, count: usize) {
        self.target_failures.store(count, Ordering::SeqCst);
    }

    pub fn target_attempts(&self) -> usize {
        self.target_attempts.load(Ordering::SeqCst)
    }

    /// Make every launch fail without starting the app.
    pub fn fail_launches(&self) {
        self.fail_launch.store(true, Ordering::SeqCst);
    }

    pub fn launch_calls(&self) -> usize {
        self.launch_calls.load(Ordering::SeqCst)
    }

    pub fn reload_calls(&self) -> usize {
        self.reload_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl AppHandle for MockApp {
    fn manifest_url(&self) -> String {
        self.manifest_url.clone()
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn launch(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.launch_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_launch.load(Ordering::SeqCst) {
                return Err(Error::protocol("launch refused"));
            }
            self.running.store(true, Ordering::SeqCst);
            notify_watcher(&self.watcher);
            Ok(())
        })
    }

    fn reload(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.reload_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn close(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
            self.running.store(false, Ordering::SeqCst);
            notify_watcher(&self.watcher);
            Ok(())
        })
    }

    fn get_target(&self) -> BoxFuture<'_, Result<Target>> {
        Box::pin(async move {
            self.target_attempts.fetch_add(1, Ordering::SeqCst);
            let remaining = self.target_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.target_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(Error::protocol("app is not attachable yet"));
            }
            let form = json!({ "actor": format!("{}#tab", self.manifest_url) });
            Ok(Target::new(form, self.client.clone(), false))
        })
    }
}

/// Apps front keeping installed apps in memory.
///
/// Calls made before `watch_apps` resolved are counted as contract
/// violations.
pub struct MockAppsFront {
    client: Arc<dyn ProtocolClient>,
    apps: Mutex<BTreeMap<String, Arc<MockApp>>>,
    watcher: Watcher,
    watching: AtomicBool,
    calls: Mutex<Vec<&'static str>>,
    violations: AtomicUsize,
    hosted_installs: Mutex<Vec<(String, HostedMetadata)>>,
    packaged_installs: Mutex<Vec<(PathBuf, Option<String>)>>,
    assigned_origin: Mutex<Option<String>>,
    fail_install: AtomicBool,
    progress: broadcast::Sender<InstallProgress>,
}

impl MockAppsFront {
    pub fn new(client: Arc<dyn ProtocolClient>) -> Self {
        let (progress, _) = broadcast::channel(16);
        Self {
            client,
            apps: Mutex::new(BTreeMap::new()),
            watcher: Arc::new(Mutex::new(None)),
            watching: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            violations: AtomicUsize::new(0),
            hosted_installs: Mutex::new(Vec::new()),
            packaged_installs: Mutex::new(Vec::new()),
            assigned_origin: Mutex::new(None),
            fail_install: AtomicBool::new(false),
            progress,
        }
    }

    fn record(&self, call: &'static str) {
        if call != "watchApps" && !self.watching.load(Ordering::SeqCst) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        lock(&self.calls).push(call);
    }

    fn install_app(&self, manifest_url: &str) -> Arc<MockApp> {
        lock(&self.apps)
            .entry(manifest_url.to_string())
            .or_insert_with(|| {
                Arc::new(MockApp {
                    manifest_url: manifest_url.to_string(),
                    running: AtomicBool::new(false),
                    target_failures: AtomicUsize::new(0),
                    target_attempts: AtomicUsize::new(0),
                    fail_launch: AtomicBool::new(false),
                    launch_calls: AtomicUsize::new(0),
                    reload_calls: AtomicUsize::new(0),
                    close_calls: AtomicUsize::new(0),
                    watcher: self.watcher.clone(),
                    client: self.client.clone(),
                })
            })
            .clone()
    }

    /// Seed an installed app.
    pub fn add_app(&self, manifest_url: &str, running: bool) -> Arc<MockApp> {
        let app = self.install_app(manifest_url);
        app.set_running(running);
        app
    }

    pub fn app(&self, manifest_url: &str) -> Option<Arc<MockApp>> {
        lock(&self.apps).get(manifest_url).cloned()
    }

    /// Origin the runtime will assign to the next packaged install.
    pub fn assign_origin(&self, origin: &str) {
        *lock(&self.assigned_origin) = Some(origin.to_string());
    }

    /// Make packaged and hosted installs fail before anything is installed.
    pub fn fail_installs(&self) {
        self.fail_install.store(true, Ordering::SeqCst);
    }

    fn check_install(&self) -> Result<()> {
        if self.fail_install.load(Ordering::SeqCst) {
            return Err(Error::install("not enough storage"));
        }
        Ok(())
    }

    /// Simulate the actor reporting an app change.
    pub fn notify_apps_changed(&self) {
        notify_watcher(&self.watcher);
    }

    pub fn emit_progress(&self, progress: InstallProgress) {
        let _ = self.progress.send(progress);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        lock(&self.calls).clone()
    }

    pub fn contract_violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::SeqCst)
    }

    pub fn hosted_installs(&self) -> Vec<(String, HostedMetadata)> {
        lock(&self.hosted_installs).clone()
    }

    pub fn packaged_installs(&self) -> Vec<(PathBuf, Option<String>)> {
        lock(&self.packaged_installs).clone()
    }
}

impl AppsFront for MockAppsFront {
    fn watch_apps(&self, on_change: AppsChanged) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.record("watchApps");
            *lock(&self.watcher) = Some(on_change);
            tokio::task::yield_now().await;
            self.watching.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn unwatch_apps(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.record("unwatchApps");
            *lock(&self.watcher) = None;
            self.watching.store(false, Ordering::SeqCst);
            Ok(())
        })
    }

    fn apps(&self) -> HashMap<String, Arc<dyn AppHandle>> {
        lock(&self.apps)
            .iter()
            .map(|(url, app)| (url.clone(), app.clone() as Arc<dyn AppHandle>))
            .collect()
    }

    fn install_packaged(
        &self,
        package_dir: PathBuf,
        origin_hint: Option<String>,
    ) -> BoxFuture<'_, Result<PackagedInstall>> {
        Box::pin(async move {
            self.record("installPackaged");
            self.check_install()?;
            lock(&self.packaged_installs).push((package_dir, origin_hint.clone()));
            let app_id = lock(&self.assigned_origin)
                .clone()
                .or(origin_hint)
                .unwrap_or_else(|| "generated-origin".to_string());
            let app = self.install_app(&format!("app://{}/manifest.webapp", app_id));
            notify_watcher(&self.watcher);
            Ok(PackagedInstall {
                app_id,
                app: app as Arc<dyn AppHandle>,
            })
        })
    }

    fn install_hosted(
        &self,
        app_id: String,
        metadata: HostedMetadata,
        _manifest: Option<Manifest>,
    ) -> BoxFuture<'_, Result<HostedInstall>> {
        Box::pin(async move {
            self.record("installHosted");
            self.check_install()?;
            let app = self.install_app(&metadata.manifest_url);
            lock(&self.hosted_installs).push((app_id, metadata));
            notify_watcher(&self.watcher);
            Ok(HostedInstall {
                app: app as Arc<dyn AppHandle>,
            })
        })
    }

    fn fetch_icons(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.record("fetchIcons");
            Ok(())
        })
    }

    fn subscribe_install_progress(&self) -> broadcast::Receiver<InstallProgress> {
        self.progress.subscribe()
    }
}

/// Factory handing out one shared [`MockAppsFront`].
pub struct MockAppsFrontFactory {
    front: Arc<MockAppsFront>,
    created: AtomicUsize,
}

impl MockAppsFrontFactory {
    pub fn new(front: Arc<MockAppsFront>) -> Self {
        Self {
            front,
            created: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl AppsFrontFactory for MockAppsFrontFactory {
    fn create(
        &self,
        _client: Arc<dyn ProtocolClient>,
        _response: &ListTabsResponse,
    ) -> Arc<dyn AppsFront> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.front.clone()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tabs
// ─────────────────────────────────────────────────────────────────

pub struct MockTabStore {
    tabs: Mutex<Vec<Tab>>,
    selected: Mutex<Option<Tab>>,
    events: broadcast::Sender<TabEvent>,
    client: Arc<dyn ProtocolClient>,
}

impl MockTabStore {
    pub fn new(client: Arc<dyn ProtocolClient>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            tabs: Mutex::new(Vec::new()),
            selected: Mutex::new(None),
            events,
            client,
        }
    }

    pub fn set_tabs(&self, tabs: Vec<Tab>) {
        *lock(&self.tabs) = tabs;
    }

    /// Replace the selected tab's details and emit `event`.
    pub fn emit(&self, event: TabEvent, selected: Option<Tab>) {
        if selected.is_some() {
            *lock(&self.selected) = selected;
        }
        let _ = self.events.send(event);
    }
}

impl TabStore for MockTabStore {
    fn list_tabs(&self) -> BoxFuture<'_, Result<Vec<Tab>>> {
        let tabs = lock(&self.tabs).clone();
        Box::pin(async move { Ok(tabs) })
    }

    fn selected_tab(&self) -> Option<Tab> {
        lock(&self.selected).clone()
    }

    fn set_selected_tab(&self, tab: Option<Tab>) {
        *lock(&self.selected) = tab;
    }

    fn target_for_tab(&self) -> BoxFuture<'_, Result<Target>> {
        let selected = lock(&self.selected).clone();
        let client = self.client.clone();
        Box::pin(async move {
            let tab = selected.ok_or_else(|| Error::protocol("no tab selected"))?;
            Ok(Target::new(json!({ "actor": tab.actor }), client, false))
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<TabEvent> {
        self.events.subscribe()
    }
}

// ─────────────────────────────────────────────────────────────────
// Validator, builder, store
// ─────────────────────────────────────────────────────────────────

/// Validator answering with canned reports keyed by project location.
#[derive(Default)]
pub struct MockValidator {
    reports: Mutex<HashMap<String, ValidationReport>>,
    holds: Mutex<HashMap<String, Arc<Notify>>>,
    failures: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
}

impl MockValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_report(&self, location: &str, report: ValidationReport) {
        lock(&self.reports).insert(location.to_string(), report);
    }

    /// Make validations of `location` fail with `message`.
    pub fn fail(&self, location: &str, message: &str) {
        lock(&self.failures).insert(location.to_string(), message.to_string());
    }

    /// Block validations of `location` until the returned handle is notified.
    pub fn hold(&self, location: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        lock(&self.holds).insert(location.to_string(), notify.clone());
        notify
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProjectValidator for MockValidator {
    fn validate(&self, project: Project) -> BoxFuture<'_, Result<ValidationReport>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let hold = lock(&self.holds).remove(&project.location);
        let failure = lock(&self.failures).get(&project.location).cloned();
        let report = lock(&self.reports)
            .get(&project.location)
            .cloned()
            .unwrap_or_default();
        Box::pin(async move {
            if let Some(hold) = hold {
                hold.notified().await;
            }
            match failure {
                Some(message) => Err(Error::validation(message)),
                None => Ok(report),
            }
        })
    }
}

#[derive(Default)]
pub struct MockBuilder {
    output: Mutex<Option<PathBuf>>,
    log_lines: Mutex<Vec<String>>,
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl MockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_output(&self, dir: Option<PathBuf>) {
        *lock(&self.output) = dir;
    }

    /// Lines passed to the build logger on every build.
    pub fn set_log_lines(&self, lines: &[&str]) {
        *lock(&self.log_lines) = lines.iter().map(|l| l.to_string()).collect();
    }

    /// Make every build fail with `message` after logging its lines.
    pub fn fail_with(&self, message: &str) {
        *lock(&self.failure) = Some(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProjectBuilder for MockBuilder {
    fn build(
        &self,
        _project: Project,
        logger: BuildLogger,
    ) -> BoxFuture<'_, Result<Option<PathBuf>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lines = lock(&self.log_lines).clone();
        let output = lock(&self.output).clone();
        let failure = lock(&self.failure).clone();
        Box::pin(async move {
            for line in lines {
                logger(line);
            }
            match failure {
                Some(message) => Err(Error::build(message)),
                None => Ok(output),
            }
        })
    }
}

/// Project store operation, as recorded by [`MemoryProjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Update(String),
    UpdateLocation { from: String, to: String },
    Remove(String),
}

#[derive(Default)]
pub struct MemoryProjectStore {
    projects: Mutex<BTreeMap<String, Project>>,
    ops: Mutex<Vec<StoreOp>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, project: Project) {
        lock(&self.projects).insert(project.location.clone(), project);
    }

    pub fn stored(&self, location: &str) -> Option<Project> {
        lock(&self.projects).get(location).cloned()
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        lock(&self.ops).clone()
    }
}

impl ProjectStore for MemoryProjectStore {
    fn get(&self, location: String) -> BoxFuture<'_, Result<Option<Project>>> {
        let project = lock(&self.projects).get(&location).cloned();
        Box::pin(async move { Ok(project) })
    }

    fn update(&self, project: Project) -> BoxFuture<'_, Result<()>> {
        lock(&self.ops).push(StoreOp::Update(project.location.clone()));
        lock(&self.projects).insert(project.location.clone(), project);
        Box::pin(async { Ok(()) })
    }

    fn update_location(&self, old_location: String, project: Project) -> BoxFuture<'_, Result<()>> {
        lock(&self.ops).push(StoreOp::UpdateLocation {
            from: old_location.clone(),
            to: project.location.clone(),
        });
        {
            let mut projects = lock(&self.projects);
            projects.remove(&old_location);
            projects.insert(project.location.clone(), project);
        }
        Box::pin(async { Ok(()) })
    }

    fn remove(&self, location: String) -> BoxFuture<'_, Result<()>> {
        lock(&self.ops).push(StoreOp::Remove(location.clone()));
        lock(&self.projects).remove(&location);
        Box::pin(async { Ok(()) })
    }
}

// ─────────────────────────────────────────────────────────────────
// Telemetry
// ─────────────────────────────────────────────────────────────────

/// A recorded telemetry call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    Log(String, bool),
    StartTimer(String),
    StopTimer(String),
}

/// Telemetry sink that records every call.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        lock(&self.events).clone()
    }
}

impl Telemetry for RecordingTelemetry {
    fn log(&self, histogram: &str, value: bool) {
        lock(&self.events).push(TelemetryEvent::Log(histogram.to_string(), value));
    }

    fn start_timer(&self, timer: &str) {
        lock(&self.events).push(TelemetryEvent::StartTimer(timer.to_string()));
    }

    fn stop_timer(&self, timer: &str) {
        lock(&self.events).push(TelemetryEvent::StopTimer(timer.to_string()));
    }
}
