//! AppManager workflow tests
//!
//! Drive the manager against the in-memory doubles from
//! `webide_remote::test_utils`. Tests run on the current-thread runtime, so
//! background work only progresses while the test awaits; `settle()` yields
//! until it has drained.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mockall::predicate;
use serde_json::json;
use tokio::sync::broadcast;
use tokio_test::{assert_pending, assert_ready};

use webide_core::{
    ErrorKey, ErrorReport, InstallProgress, Manifest, Project, ProjectKind, RuntimeType,
    SharedProject, ValidationStatus,
};
use webide_remote::test_utils::*;
use webide_remote::{
    connection_result_for, ConnectionStatus, ListTabsResponse, MockTelemetry, Runtime, TabEvent,
    Telemetry, ValidationReport, CONNECTION_RESULT, CONNECTION_TIME,
};

use super::*;
use crate::config::Settings;
use crate::observer::{AppManagerObserver, ProjectChange};
use crate::update::AppManagerUpdate;

const HOSTED_URL: &str = "http://example.com/app/manifest.webapp";
const RUNTIME_APP_URL: &str = "app://clock.gaiamobile.org/manifest.webapp";

struct Harness {
    manager: AppManager,
    client: Arc<MockProtocolClient>,
    connection: Arc<MockConnection>,
    registry: Arc<MockRegistry>,
    front: Arc<MockAppsFront>,
    factory: Arc<MockAppsFrontFactory>,
    tabs: Arc<MockTabStore>,
    validator: Arc<MockValidator>,
    builder: Arc<MockBuilder>,
    store: Arc<MemoryProjectStore>,
    telemetry: Arc<RecordingTelemetry>,
    observer: Arc<TestObserver>,
}

fn harness() -> Harness {
    harness_with(apps_capable_response(), None)
}

/// Build an initialized manager; `telemetry` replaces the recording sink.
fn harness_with(response: ListTabsResponse, telemetry: Option<Arc<dyn Telemetry>>) -> Harness {
    let client = Arc::new(MockProtocolClient::new(response));
    let connection = Arc::new(MockConnection::with_client(client.clone()));
    let registry = Arc::new(MockRegistry::new());
    let front = Arc::new(MockAppsFront::new(client.clone()));
    let factory = Arc::new(MockAppsFrontFactory::new(front.clone()));
    let tabs = Arc::new(MockTabStore::new(client.clone()));
    let validator = Arc::new(MockValidator::new());
    let builder = Arc::new(MockBuilder::new());
    let store = Arc::new(MemoryProjectStore::new());
    let recording = Arc::new(RecordingTelemetry::new());

    let deps = Collaborators {
        connection: connection.clone(),
        registry: registry.clone(),
        apps_factory: factory.clone(),
        tab_store: tabs.clone(),
        validator: validator.clone(),
        builder: builder.clone(),
        store: store.clone(),
        telemetry: telemetry.unwrap_or_else(|| recording.clone() as Arc<dyn Telemetry>),
    };

    let manager = AppManager::new(deps, Settings::default());
    let observer = Arc::new(TestObserver::default());
    manager.register_observer(observer.clone());
    manager.init();

    Harness {
        manager,
        client,
        connection,
        registry,
        front,
        factory,
        tabs,
        validator,
        builder,
        store,
        telemetry: recording,
        observer,
    }
}

#[derive(Debug, Default)]
struct TestObserver {
    veto: AtomicBool,
    before_calls: AtomicUsize,
    errors: Mutex<Vec<ErrorReport>>,
}

impl TestObserver {
    fn errors(&self) -> Vec<ErrorReport> {
        self.errors.lock().unwrap().clone()
    }
}

impl AppManagerObserver for TestObserver {
    fn name(&self) -> &str {
        "test"
    }

    fn before_project(&self, _current: Option<&Project>, _next: Option<&Project>) -> ProjectChange {
        self.before_calls.fetch_add(1, Ordering::SeqCst);
        if self.veto.load(Ordering::SeqCst) {
            ProjectChange::Veto
        } else {
            ProjectChange::Allow
        }
    }

    fn on_error(&self, report: &ErrorReport) {
        self.errors.lock().unwrap().push(report.clone());
    }
}

/// Let spawned background work run to completion.
async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn reasons(rx: &mut broadcast::Receiver<AppManagerUpdate>) -> Vec<&'static str> {
    let mut out = Vec::new();
    while let Ok(update) = rx.try_recv() {
        out.push(update.reason());
    }
    out
}

fn usb_runtime(name: &str) -> Arc<dyn Runtime> {
    Arc::new(MockRuntime::new(name, RuntimeType::Usb))
}

async fn connect(h: &Harness) -> Arc<dyn Runtime> {
    let runtime = usb_runtime("device");
    h.manager.connect_to_runtime(runtime.clone()).await.unwrap();
    settle().await;
    runtime
}

fn shared(project: Project) -> SharedProject {
    SharedProject::new(project)
}

fn report_with_name(name: &str) -> ValidationReport {
    ValidationReport {
        manifest: Some(Manifest {
            name: Some(name.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn position(list: &[&str], reason: &str) -> usize {
    list.iter()
        .position(|r| *r == reason)
        .unwrap_or_else(|| panic!("{} not in {:?}", reason, list))
}

// ─────────────────────────────────────────────────────────────────
// Connection lifecycle
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_sets_up_apps_front_after_watch() {
    let h = harness();
    let mut rx = h.manager.subscribe();

    let runtime = connect(&h).await;

    assert!(h.manager.connected());
    assert!(h.manager.runtime_can_handle_apps());
    assert!(same_runtime_selected(&h, &runtime));
    assert_eq!(h.connection.endpoint(), Some(("localhost".to_string(), 6000)));
    assert_eq!(h.connection.reset_calls(), 1);
    assert_eq!(h.factory.created(), 1);

    let calls = h.front.calls();
    assert_eq!(calls.first(), Some(&"watchApps"));
    assert!(calls.contains(&"fetchIcons"));
    assert_eq!(h.front.contract_violations(), 0);

    let seen = reasons(&mut rx);
    assert!(position(&seen, "runtime-changed") < position(&seen, "connection"));
    assert!(position(&seen, "list-tabs-response") < position(&seen, "runtime-apps-found"));
}

fn same_runtime_selected(h: &Harness, runtime: &Arc<dyn Runtime>) -> bool {
    h.manager
        .selected_runtime()
        .is_some_and(|selected| webide_remote::same_runtime(&selected, runtime))
}

#[tokio::test]
async fn test_connect_without_apps_actor_only_caches_response() {
    let h = harness_with(tabs_only_response(), None);
    let mut rx = h.manager.subscribe();

    connect(&h).await;

    assert!(!h.manager.runtime_can_handle_apps());
    assert_eq!(h.factory.created(), 0);
    assert!(h.front.calls().is_empty());
    assert!(h.manager.apps().is_empty());
    assert!(!h.manager.is_main_process_debuggable());

    let seen = reasons(&mut rx);
    assert!(seen.contains(&"list-tabs-response"));
    assert!(!seen.contains(&"runtime-apps-found"));
}

#[tokio::test]
async fn test_connect_to_connected_runtime_is_noop() {
    let h = harness();
    let runtime = connect(&h).await;

    h.manager.connect_to_runtime(runtime.clone()).await.unwrap();

    assert_eq!(h.connection.connect_calls(), 1);
    assert_eq!(h.connection.disconnect_calls(), 0);
}

#[tokio::test]
async fn test_connect_to_other_runtime_disconnects_first() {
    let h = harness();
    connect(&h).await;

    let other = usb_runtime("other");
    h.manager.connect_to_runtime(other.clone()).await.unwrap();
    settle().await;

    assert_eq!(h.connection.disconnect_calls(), 1);
    assert_eq!(h.connection.connect_calls(), 2);
    assert!(same_runtime_selected(&h, &other));
    assert!(h.manager.runtime_can_handle_apps());
}

#[tokio::test]
async fn test_refused_connection_fails_and_clears_runtime() {
    let h = harness();
    h.connection.set_behavior(ConnectBehavior::Refuse);

    let err = h
        .manager
        .connect_to_runtime(usb_runtime("device"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConnectionFailed { .. }));
    assert!(h.manager.selected_runtime().is_none());
    assert_eq!(
        h.telemetry.events(),
        vec![
            TelemetryEvent::Log(CONNECTION_RESULT.to_string(), false),
            TelemetryEvent::Log(connection_result_for(RuntimeType::Usb), false),
        ]
    );
}

#[tokio::test]
async fn test_failing_connect_capability_removes_status_waiter() {
    let mut telemetry = MockTelemetry::new();
    telemetry
        .expect_log()
        .with(predicate::always(), predicate::eq(false))
        .times(2)
        .return_const(());
    telemetry.expect_start_timer().never();

    let h = harness_with(apps_capable_response(), Some(Arc::new(telemetry)));
    let runtime: Arc<dyn Runtime> = Arc::new(MockRuntime::failing("broken", RuntimeType::Wifi));

    let err = h.manager.connect_to_runtime(runtime).await.unwrap_err();

    assert!(matches!(err, Error::ConnectionFailed { .. }));
    assert_eq!(h.connection.connect_calls(), 0);
    // Only the lifecycle listener remains
    assert_eq!(h.connection.listener_count(), 1);
}

#[tokio::test]
async fn test_capability_failing_after_connected_still_connects() {
    let h = harness();
    let runtime: Arc<dyn Runtime> =
        Arc::new(MockRuntime::connects_then_fails("flaky", RuntimeType::Usb));

    h.manager.connect_to_runtime(runtime.clone()).await.unwrap();
    settle().await;

    assert!(h.manager.connected());
    assert!(same_runtime_selected(&h, &runtime));
    assert_eq!(
        h.telemetry.events(),
        vec![
            TelemetryEvent::Log(CONNECTION_RESULT.to_string(), true),
            TelemetryEvent::Log(connection_result_for(RuntimeType::Usb), true),
            TelemetryEvent::StartTimer(CONNECTION_TIME.to_string()),
        ]
    );
}

#[tokio::test]
async fn test_connection_time_stops_on_next_status_change() {
    let h = harness();
    connect(&h).await;

    assert_eq!(
        h.telemetry.events(),
        vec![
            TelemetryEvent::Log(CONNECTION_RESULT.to_string(), true),
            TelemetryEvent::Log(connection_result_for(RuntimeType::Usb), true),
            TelemetryEvent::StartTimer(CONNECTION_TIME.to_string()),
        ]
    );

    h.manager.disconnect_runtime().await.unwrap();
    settle().await;

    let events = h.telemetry.events();
    assert_eq!(
        events.last(),
        Some(&TelemetryEvent::StopTimer(CONNECTION_TIME.to_string()))
    );
    assert_eq!(events.len(), 4);
}

#[tokio::test]
async fn test_disconnect_tears_down_connection_state() {
    let h = harness();
    connect(&h).await;
    h.manager
        .select_project(Some(shared(Project::main_process())));

    h.manager.disconnect_runtime().await.unwrap();
    settle().await;

    assert!(!h.manager.connected());
    assert!(!h.manager.runtime_can_handle_apps());
    assert!(h.manager.selected_runtime().is_none());
    assert!(h.manager.selected_project().is_none());
    assert!(h.manager.apps().is_empty());
    assert!(!h.manager.is_main_process_debuggable());
    assert!(!h.front.is_watching());
    assert_eq!(h.front.calls().last(), Some(&"unwatchApps"));
}

#[tokio::test]
async fn test_disconnect_when_not_connected_is_noop() {
    let h = harness();
    h.manager.disconnect_runtime().await.unwrap();
    assert_eq!(h.connection.disconnect_calls(), 0);
}

#[tokio::test]
async fn test_stale_apps_front_setup_is_discarded() {
    let h = harness();
    h.manager
        .connect_to_runtime(usb_runtime("device"))
        .await
        .unwrap();

    // Drop the connection before the setup task got to run
    h.connection.set_status(ConnectionStatus::Disconnected);
    settle().await;

    assert!(!h.manager.runtime_can_handle_apps());
    assert_eq!(h.factory.created(), 0);
    assert!(h.manager.selected_runtime().is_none());
}

#[tokio::test]
async fn test_install_progress_is_forwarded() {
    let h = harness();
    connect(&h).await;
    let mut rx = h.manager.subscribe();

    let progress = InstallProgress {
        bytes_sent: 512,
        total_bytes: 2048,
    };
    h.front.emit_progress(progress);
    settle().await;

    let update = rx.try_recv().unwrap();
    assert_eq!(update, AppManagerUpdate::InstallProgress(progress));
}

#[tokio::test]
async fn test_actor_fronts_from_list_tabs_response() {
    let h = harness();
    assert!(h.manager.device_front().is_none());

    connect(&h).await;

    assert!(h.manager.is_main_process_debuggable());
    assert_eq!(
        h.manager.preference_front().map(|f| f.actor),
        Some("conn0.preference4".to_string())
    );
    assert_eq!(
        h.manager.settings_front().map(|f| f.actor),
        Some("conn0.settings5".to_string())
    );

    let device = h.manager.device_front().unwrap();
    device.request("getDescription", None).await.unwrap();
    assert_eq!(
        h.client.requests().last(),
        Some(&json!({ "to": "conn0.device3", "type": "getDescription" }))
    );
}

#[tokio::test]
async fn test_shutdown_releases_everything() {
    let h = harness();
    assert!(h.registry.is_enabled());
    connect(&h).await;
    h.manager
        .select_project(Some(shared(Project::hosted(HOSTED_URL))));
    settle().await;

    h.manager.shutdown();
    settle().await;

    assert!(!h.registry.is_enabled());
    assert!(h.manager.selected_project().is_none());
    assert!(h.manager.selected_runtime().is_none());
    assert!(!h.manager.connected());
    assert!(!h.manager.runtime_can_handle_apps());
    assert!(h.manager.runtime_list().is_empty());
    assert_eq!(h.connection.listener_count(), 0);
}

#[tokio::test]
async fn test_init_twice_is_noop() {
    let h = harness();
    h.manager.init();
    assert_eq!(h.connection.listener_count(), 1);
}

// ─────────────────────────────────────────────────────────────────
// Selection
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_selecting_equal_project_is_noop() {
    let h = harness();
    assert_eq!(
        h.manager
            .select_project(Some(shared(Project::main_process()))),
        Selection::Changed
    );
    let mut rx = h.manager.subscribe();

    let equal = shared(Project::main_process());
    let again = h.manager.select_project(Some(equal));

    assert_eq!(again, Selection::Unchanged);
    assert!(reasons(&mut rx).is_empty());
    assert_eq!(h.observer.before_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.manager.select_project(None), Selection::Changed);
    assert_eq!(h.manager.select_project(None), Selection::Unchanged);
}

#[tokio::test]
async fn test_vetoed_project_change_keeps_selection() {
    let h = harness();
    let first = shared(Project::main_process());
    h.manager.select_project(Some(first.clone()));
    h.observer.veto.store(true, Ordering::SeqCst);
    let mut rx = h.manager.subscribe();

    let result = h
        .manager
        .select_project(Some(shared(Project::hosted(HOSTED_URL))));

    assert_eq!(result, Selection::Vetoed);
    assert!(h.manager.selected_project().unwrap().ptr_eq(&first));
    assert!(reasons(&mut rx).is_empty());
    settle().await;
    assert_eq!(h.validator.calls(), 0);
}

#[tokio::test]
async fn test_select_project_publishes_running_status() {
    let h = harness();
    let mut rx = h.manager.subscribe();

    h.manager
        .select_project(Some(shared(Project::main_process())));

    assert_eq!(reasons(&mut rx), vec!["project", "project-is-running"]);

    h.manager
        .select_project(Some(shared(Project::runtime_app(RUNTIME_APP_URL, "Clock"))));
    assert_eq!(reasons(&mut rx), vec!["project", "project-is-not-running"]);
}

#[tokio::test]
async fn test_clearing_runtime_clears_runtime_bound_projects() {
    let h = harness();
    let bound = [
        Project::main_process(),
        Project::runtime_app(RUNTIME_APP_URL, "Clock"),
        Project::tab(test_tab("tab1", "https://example.org/", Some("Example"))),
    ];

    for project in bound {
        h.manager.select_runtime(Some(usb_runtime("device")));
        h.manager.select_project(Some(shared(project)));
        h.manager.select_runtime(None);
        assert!(h.manager.selected_project().is_none());
    }

    h.manager.select_runtime(Some(usb_runtime("device")));
    h.manager
        .select_project(Some(shared(Project::hosted(HOSTED_URL))));
    h.manager.select_runtime(None);
    assert!(h.manager.selected_project().is_some());
}

#[tokio::test]
async fn test_selecting_tab_project_selects_tab() {
    let h = harness();
    let tab = test_tab("tab1", "https://example.org/", Some("Example"));

    h.manager
        .select_project(Some(shared(Project::tab(tab.clone()))));
    assert_eq!(h.tabs.selected_tab(), Some(tab));

    h.manager
        .select_project(Some(shared(Project::main_process())));
    assert_eq!(h.tabs.selected_tab(), None);
}

#[tokio::test]
async fn test_remove_selected_project() {
    let h = harness();
    assert!(matches!(
        h.manager.remove_selected_project().await,
        Err(Error::NoProjectSelected)
    ));

    let project = Project::hosted(HOSTED_URL);
    h.store.insert(project.clone());
    h.manager.select_project(Some(shared(project)));
    settle().await;

    h.observer.veto.store(true, Ordering::SeqCst);
    assert_eq!(
        h.manager.remove_selected_project().await.unwrap(),
        Selection::Vetoed
    );
    assert!(h.store.stored(HOSTED_URL).is_some());

    h.observer.veto.store(false, Ordering::SeqCst);
    assert_eq!(
        h.manager.remove_selected_project().await.unwrap(),
        Selection::Changed
    );
    assert!(h.manager.selected_project().is_none());
    assert!(h.store.stored(HOSTED_URL).is_none());
    assert_eq!(h.store.ops().last(), Some(&StoreOp::Remove(HOSTED_URL.to_string())));
}

#[tokio::test]
async fn test_apps_changed_rechecks_running_status() {
    let h = harness();
    connect(&h).await;
    let app = h.front.add_app(RUNTIME_APP_URL, false);
    h.manager
        .select_project(Some(shared(Project::runtime_app(RUNTIME_APP_URL, "Clock"))));
    assert!(!h.manager.is_project_running());
    let mut rx = h.manager.subscribe();

    app.set_running(true);
    h.front.notify_apps_changed();

    assert!(h.manager.is_project_running());
    assert_eq!(reasons(&mut rx), vec!["project-is-running"]);
}

// ─────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_selecting_hosted_project_validates_it() {
    let h = harness();
    h.validator.set_report(
        HOSTED_URL,
        ValidationReport {
            manifest: Some(Manifest {
                name: Some("Hosted".to_string()),
                icons: Some(
                    [("64", "a.png"), ("128", "b.png")]
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                ),
                ..Default::default()
            }),
            warnings: vec!["Deprecated permission".to_string()],
            ..Default::default()
        },
    );
    let mut rx = h.manager.subscribe();

    let project = shared(Project::hosted(HOSTED_URL));
    h.manager.select_project(Some(project.clone()));
    settle().await;

    let validated = project.snapshot();
    assert_eq!(validated.name, "Hosted");
    assert_eq!(validated.icon, "http://example.com/b.png");
    assert_eq!(validated.validation_status, ValidationStatus::Warning);
    assert_eq!(h.validator.calls(), 1);
    assert!(reasons(&mut rx).contains(&"project-validated"));
    // Not in the store, so nothing is written
    assert!(h.store.ops().is_empty());
}

#[tokio::test]
async fn test_validation_updates_stored_project() {
    let h = harness();
    let project = Project::packaged("/apps/stored");
    h.store.insert(project.clone());
    h.validator.set_report("/apps/stored", report_with_name("Stored"));

    h.manager.validate_project(&shared(project)).await.unwrap();

    assert_eq!(h.store.ops(), vec![StoreOp::Update("/apps/stored".to_string())]);
    assert_eq!(h.store.stored("/apps/stored").unwrap().name, "Stored");
}

#[tokio::test]
async fn test_hosted_validation_moves_to_canonical_url() {
    let h = harness();
    let old = "http://example.com/old.webapp";
    let canonical = "http://example.com/manifest.webapp";
    h.store.insert(Project::hosted(old));
    h.validator.set_report(
        old,
        ValidationReport {
            manifest_url: Some(canonical.to_string()),
            ..report_with_name("Moved")
        },
    );

    let project = shared(Project::hosted(old));
    h.manager.validate_project(&project).await.unwrap();

    assert_eq!(project.location(), canonical);
    assert_eq!(
        h.store.ops(),
        vec![StoreOp::UpdateLocation {
            from: old.to_string(),
            to: canonical.to_string(),
        }]
    );
    assert!(h.store.stored(old).is_none());
    assert!(h.store.stored(canonical).is_some());
}

#[tokio::test]
async fn test_stale_validation_does_not_publish() {
    let h = harness();
    let release = h.validator.hold(HOSTED_URL);
    h.validator.set_report(HOSTED_URL, report_with_name("Late"));

    let hosted = shared(Project::hosted(HOSTED_URL));
    h.manager.select_project(Some(hosted.clone()));
    settle().await;
    h.manager
        .select_project(Some(shared(Project::main_process())));
    let mut rx = h.manager.subscribe();

    release.notify_one();
    settle().await;

    assert!(!reasons(&mut rx).contains(&"project-validated"));
    // The project itself still got the result
    assert_eq!(hosted.snapshot().name, "Late");
}

#[tokio::test]
async fn test_validate_selected_project_requires_selection() {
    let h = harness();
    assert!(matches!(
        h.manager.validate_selected_project().await,
        Err(Error::NoProjectSelected)
    ));
}

#[tokio::test]
async fn test_write_manifest() {
    let h = harness();
    let dir = tempfile::tempdir().unwrap();
    let mut project = Project::packaged(dir.path().to_string_lossy().to_string());
    project.manifest = Some(Manifest {
        name: Some("On disk".to_string()),
        ..Default::default()
    });

    h.manager.write_manifest(&project).await.unwrap();

    let content = std::fs::read_to_string(dir.path().join("manifest.webapp")).unwrap();
    let written: Manifest = serde_json::from_str(&content).unwrap();
    assert_eq!(written.name.as_deref(), Some("On disk"));

    let err = h
        .manager
        .write_manifest(&Project::hosted(HOSTED_URL))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedProject { .. }));
}

// ─────────────────────────────────────────────────────────────────
// Install and run
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_install_preconditions() {
    let h = harness();
    assert!(matches!(
        h.manager.install_and_run_project().await,
        Err(Error::NoProjectSelected)
    ));

    h.manager
        .select_project(Some(shared(Project::main_process())));
    assert!(matches!(
        h.manager.install_and_run_project().await,
        Err(Error::UnsupportedProject { .. })
    ));

    h.manager
        .select_project(Some(shared(Project::hosted(HOSTED_URL))));
    settle().await;
    assert!(matches!(
        h.manager.install_and_run_project().await,
        Err(Error::NotConnected)
    ));
    assert_eq!(
        h.observer.errors(),
        vec![ErrorReport::new(ErrorKey::CantInstallNotFullyConnected)]
    );
    assert_eq!(h.builder.calls(), 0);
}

#[tokio::test]
async fn test_install_without_apps_actor_fails() {
    let h = harness_with(tabs_only_response(), None);
    connect(&h).await;
    h.manager
        .select_project(Some(shared(Project::hosted(HOSTED_URL))));
    settle().await;

    assert!(matches!(
        h.manager.install_and_run_project().await,
        Err(Error::NoAppsActor)
    ));
    assert_eq!(h.builder.calls(), 0);
}

#[tokio::test]
async fn test_install_blocked_by_validation_errors() {
    let h = harness();
    connect(&h).await;
    h.validator.set_report(
        HOSTED_URL,
        ValidationReport {
            errors: vec!["Missing launch_path".to_string()],
            ..report_with_name("Broken")
        },
    );
    h.manager
        .select_project(Some(shared(Project::hosted(HOSTED_URL))));
    settle().await;

    let outcome = h.manager.install_and_run_project().await.unwrap();

    assert_eq!(outcome, InstallOutcome::BlockedByValidation);
    assert!(h.front.hosted_installs().is_empty());
    assert_eq!(
        h.observer.errors(),
        vec![ErrorReport::new(ErrorKey::CantInstallValidationErrors)]
    );
}

#[tokio::test]
async fn test_install_packaged_records_assigned_origin() {
    let h = harness();
    connect(&h).await;
    h.validator.set_report("/apps/packaged", report_with_name("Packaged"));
    h.builder.set_output(Some(PathBuf::from("/tmp/build/out")));
    h.builder.set_log_lines(&["zipping", "done"]);
    h.front.assign_origin("assigned.origin");

    let project = shared(Project::packaged("/apps/packaged"));
    h.manager.select_project(Some(project.clone()));
    settle().await;
    let mut rx = h.manager.subscribe();

    let outcome = h.manager.install_and_run_project().await.unwrap();

    assert_eq!(outcome, InstallOutcome::Launched);
    assert_eq!(
        h.front.packaged_installs(),
        vec![(PathBuf::from("/tmp/build/out"), None)]
    );
    assert_eq!(project.snapshot().packaged_app_origin(), Some("assigned.origin"));
    assert_eq!(
        h.store.ops().last(),
        Some(&StoreOp::Update("/apps/packaged".to_string()))
    );
    let app = h.front.app("app://assigned.origin/manifest.webapp").unwrap();
    assert_eq!(app.launch_calls(), 1);

    let seen = reasons(&mut rx);
    assert_eq!(seen.iter().filter(|r| **r == "pre-package").count(), 2);
    assert!(seen.contains(&"project-is-running"));
}

#[tokio::test]
async fn test_install_packaged_without_build_uses_folder() {
    let h = harness();
    connect(&h).await;
    let project = shared(Project::packaged("/apps/plain"));
    h.manager.select_project(Some(project));
    settle().await;

    h.manager.install_and_run_project().await.unwrap();

    assert_eq!(
        h.front.packaged_installs(),
        vec![(PathBuf::from("/apps/plain"), None)]
    );
}

#[tokio::test]
async fn test_install_hosted_reloads_running_app() {
    let h = harness();
    connect(&h).await;
    let app = h.front.add_app(HOSTED_URL, true);
    h.manager
        .select_project(Some(shared(Project::hosted(HOSTED_URL))));
    settle().await;

    let outcome = h.manager.install_and_run_project().await.unwrap();

    assert_eq!(outcome, InstallOutcome::Reloaded);
    assert_eq!(app.reload_calls(), 1);
    assert_eq!(app.launch_calls(), 0);

    let installs = h.front.hosted_installs();
    assert_eq!(installs.len(), 1);
    assert_eq!(installs[0].0, "example.com");
    assert_eq!(installs[0].1.origin, "http://example.com/");
    assert_eq!(installs[0].1.manifest_url, HOSTED_URL);
}

#[tokio::test]
async fn test_install_addon_is_not_launched() {
    let h = harness();
    connect(&h).await;
    h.validator.set_report(
        HOSTED_URL,
        ValidationReport {
            manifest: Some(Manifest {
                name: Some("Addon".to_string()),
                role: Some("addon".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
    );
    h.manager
        .select_project(Some(shared(Project::hosted(HOSTED_URL))));
    settle().await;

    let outcome = h.manager.install_and_run_project().await.unwrap();

    assert_eq!(outcome, InstallOutcome::Installed);
    assert_eq!(h.front.app(HOSTED_URL).unwrap().launch_calls(), 0);
}

#[tokio::test]
async fn test_install_build_failure_skips_install() {
    let h = harness();
    connect(&h).await;
    h.builder.fail_with("missing build script");
    h.manager
        .select_project(Some(shared(Project::packaged("/apps/packaged"))));
    settle().await;
    let validations = h.validator.calls();

    let err = h.manager.install_and_run_project().await.unwrap_err();

    assert!(matches!(err, Error::Build { .. }));
    assert_eq!(h.validator.calls(), validations);
    assert!(h.front.packaged_installs().is_empty());
    assert!(!h.front.calls().contains(&"installPackaged"));
}

#[tokio::test]
async fn test_install_failure_skips_launch_and_origin_write() {
    let h = harness();
    connect(&h).await;
    h.front.fail_installs();
    h.front.assign_origin("assigned.origin");
    let project = shared(Project::packaged("/apps/packaged"));
    h.manager.select_project(Some(project.clone()));
    settle().await;

    let err = h.manager.install_and_run_project().await.unwrap_err();

    assert!(matches!(err, Error::Install { .. }));
    assert!(h.front.calls().contains(&"installPackaged"));
    assert!(h.front.app("app://assigned.origin/manifest.webapp").is_none());
    assert_eq!(project.snapshot().packaged_app_origin(), None);
    assert!(h.store.ops().is_empty());
}

#[tokio::test]
async fn test_launch_failure_keeps_app_installed() {
    let h = harness();
    connect(&h).await;
    let app = h.front.add_app(HOSTED_URL, false);
    app.fail_launches();
    h.manager
        .select_project(Some(shared(Project::hosted(HOSTED_URL))));
    settle().await;

    let err = h.manager.install_and_run_project().await.unwrap_err();

    assert!(matches!(err, Error::Protocol { .. }));
    assert_eq!(app.launch_calls(), 1);
    assert_eq!(h.front.hosted_installs().len(), 1);
    assert!(h.manager.apps().contains_key(HOSTED_URL));
    assert!(!h.manager.is_project_running());
    assert!(h.front.calls().iter().all(|call| *call != "unwatchApps"));
}

#[tokio::test]
async fn test_validation_failure_propagates_without_update() {
    let h = harness();
    h.validator.fail("/apps/packaged", "unreadable manifest");
    h.manager
        .select_project(Some(shared(Project::packaged("/apps/packaged"))));
    settle().await;
    let mut rx = h.manager.subscribe();

    let err = h.manager.validate_selected_project().await.unwrap_err();

    assert!(matches!(err, Error::Validation { .. }));
    assert!(!reasons(&mut rx).contains(&"project-validated"));
}

// ─────────────────────────────────────────────────────────────────
// Targets
// ─────────────────────────────────────────────────────────────────

async fn select_runtime_app(h: &Harness, running: bool) -> Arc<MockApp> {
    connect(h).await;
    let app = h.front.add_app(RUNTIME_APP_URL, running);
    h.manager
        .select_project(Some(shared(Project::runtime_app(RUNTIME_APP_URL, "Clock"))));
    app
}

#[tokio::test(start_paused = true)]
async fn test_app_target_retries_until_attachable() {
    let h = harness();
    let app = select_runtime_app(&h, true).await;
    app.fail_targets(3);

    let start = tokio::time::Instant::now();
    let target = h.manager.get_target().await.unwrap();

    // Three delays of 500ms, one after each failure
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1500) && elapsed < Duration::from_millis(2000));
    assert_eq!(app.target_attempts(), 4);
    assert!(!target.chrome);
    assert_eq!(target.actor(), Some("app://clock.gaiamobile.org/manifest.webapp#tab"));
}

#[tokio::test(start_paused = true)]
async fn test_app_target_gives_up_after_all_attempts() {
    let h = harness();
    let app = select_runtime_app(&h, true).await;
    app.fail_targets(usize::MAX);

    let start = tokio::time::Instant::now();
    let err = h.manager.get_target().await.unwrap_err();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(5000) && elapsed < Duration::from_millis(5500));
    assert_eq!(app.target_attempts(), 10);
    assert!(matches!(
        err,
        Error::CantConnectToApp { ref manifest_url } if manifest_url == RUNTIME_APP_URL
    ));
    assert_eq!(
        h.observer.errors(),
        vec![ErrorReport::new(ErrorKey::CantConnectToApp).with_arg(RUNTIME_APP_URL)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_app_target_abandoned_when_selection_changes() {
    let h = harness();
    let app = select_runtime_app(&h, true).await;
    app.fail_targets(usize::MAX);

    let mut acquire = tokio_test::task::spawn(h.manager.get_target());
    assert_pending!(acquire.poll());

    h.manager
        .select_project(Some(shared(Project::main_process())));
    tokio::time::advance(Duration::from_millis(500)).await;

    let result = assert_ready!(acquire.poll());
    assert!(matches!(result, Err(Error::TargetAbandoned)));
    assert_eq!(app.target_attempts(), 1);
    assert!(h.observer.errors().is_empty());
}

#[tokio::test]
async fn test_app_target_requires_installed_app() {
    let h = harness();
    connect(&h).await;
    h.manager
        .select_project(Some(shared(Project::runtime_app(RUNTIME_APP_URL, "Clock"))));

    assert!(matches!(
        h.manager.get_target().await,
        Err(Error::AppNotFound { .. })
    ));
}

#[tokio::test]
async fn test_main_process_target_is_chrome() {
    let h = harness();
    connect(&h).await;
    h.manager
        .select_project(Some(shared(Project::main_process())));

    let target = h.manager.get_target().await.unwrap();

    assert!(target.chrome);
    assert_eq!(target.form["webappsActor"], "conn0.webapps1");
}

#[tokio::test]
async fn test_runtime_app_launch_reload_and_stop() {
    let h = harness();
    let app = select_runtime_app(&h, false).await;
    let mut rx = h.manager.subscribe();

    h.manager.launch_or_reload_runtime_app().await.unwrap();
    assert_eq!(app.launch_calls(), 1);
    assert!(reasons(&mut rx).contains(&"project-is-running"));

    h.manager.launch_or_reload_runtime_app().await.unwrap();
    assert_eq!(app.reload_calls(), 1);

    h.manager.stop_running_app().await.unwrap();
    assert_eq!(app.close_calls(), 1);
    assert!(!h.manager.is_project_running());
    assert!(reasons(&mut rx).contains(&"project-is-not-running"));
}

#[tokio::test]
async fn test_launch_runtime_app_rejects_other_projects() {
    let h = harness();
    connect(&h).await;
    h.manager
        .select_project(Some(shared(Project::main_process())));

    assert!(matches!(
        h.manager.launch_runtime_app().await,
        Err(Error::UnsupportedProject { .. })
    ));
}

// ─────────────────────────────────────────────────────────────────
// Tabs
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_tab_navigation_updates_tab_project() {
    let h = harness();
    let project = shared(Project::tab(test_tab("tab1", "https://example.org/", Some("Home"))));
    h.manager.select_project(Some(project.clone()));
    let mut rx = h.manager.subscribe();

    h.tabs.emit(
        TabEvent::Navigate,
        Some(test_tab("tab1", "https://news.example.org/today", Some("News"))),
    );
    settle().await;

    let updated = project.snapshot();
    assert_eq!(updated.location, "https://news.example.org/today");
    assert_eq!(updated.name, "news.example.org: News");
    assert_eq!(updated.icon, "https://news.example.org/favicon.ico");
    assert!(matches!(
        updated.kind,
        ProjectKind::Tab { ref tab } if tab.title.as_deref() == Some("News")
    ));
    assert_eq!(reasons(&mut rx), vec!["project-validated"]);
}

#[tokio::test]
async fn test_tab_closed_clears_only_tab_projects() {
    let h = harness();
    h.manager
        .select_project(Some(shared(Project::hosted(HOSTED_URL))));
    h.tabs.emit(TabEvent::Closed, None);
    settle().await;
    assert!(h.manager.selected_project().is_some());

    h.manager.select_project(Some(shared(Project::tab(test_tab(
        "tab1",
        "https://example.org/",
        None,
    )))));
    h.tabs.emit(TabEvent::Closed, None);
    settle().await;
    assert!(h.manager.selected_project().is_none());
}

#[tokio::test]
async fn test_reload_tab_sends_reload_to_tab_actor() {
    let h = harness();
    h.manager.select_project(Some(shared(Project::tab(test_tab(
        "tab7",
        "https://example.org/",
        Some("Example"),
    )))));

    h.manager.reload_tab().await.unwrap();

    assert_eq!(
        h.client.requests(),
        vec![json!({ "to": "tab7", "type": "reload" })]
    );

    h.manager
        .select_project(Some(shared(Project::main_process())));
    assert!(matches!(
        h.manager.reload_tab().await,
        Err(Error::UnsupportedProject { .. })
    ));
}

#[tokio::test]
async fn test_list_tabs_passes_through() {
    let h = harness();
    let tabs = vec![
        test_tab("tab1", "https://a.example/", Some("A")),
        test_tab("tab2", "https://b.example/", None),
    ];
    h.tabs.set_tabs(tabs.clone());

    assert_eq!(h.manager.list_tabs().await.unwrap(), tabs);
}

// ─────────────────────────────────────────────────────────────────
// Runtime list
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_registry_change_rebuilds_runtime_list() {
    let h = harness();
    assert!(h.manager.runtime_list().is_empty());
    let mut rx = h.manager.subscribe();

    let runtimes: Vec<Arc<dyn Runtime>> = vec![
        usb_runtime("phone"),
        Arc::new(MockRuntime::new("wifi", RuntimeType::Wifi)),
        Arc::new(MockRuntime::new("sim", RuntimeType::Simulator)),
        Arc::new(MockRuntime::new("remote", RuntimeType::Remote)),
    ];
    h.registry.set_runtimes(runtimes);
    settle().await;

    let list = h.manager.runtime_list();
    assert_eq!(list.usb.len(), 1);
    assert_eq!(list.wifi.len(), 1);
    assert_eq!(list.simulator.len(), 1);
    assert_eq!(list.other.len(), 1);
    assert_eq!(list.usb[0].name(), "phone");
    assert_eq!(reasons(&mut rx), vec!["runtime-details", "runtimelist"]);
}

// ─────────────────────────────────────────────────────────────────
// Observers
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct CountingObserver {
    updates: AtomicUsize,
}

impl AppManagerObserver for CountingObserver {
    fn name(&self) -> &str {
        "counting"
    }

    fn on_update(&self, _update: &AppManagerUpdate) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_unregistered_observer_stops_receiving() {
    let h = harness();
    let counting = Arc::new(CountingObserver::default());
    let id = h.manager.register_observer(counting.clone());

    h.manager
        .select_project(Some(shared(Project::main_process())));
    assert_eq!(counting.updates.load(Ordering::SeqCst), 2);

    assert!(h.manager.unregister_observer(id));
    assert!(!h.manager.unregister_observer(id));
    h.manager.select_project(None);
    assert_eq!(counting.updates.load(Ordering::SeqCst), 2);
}
