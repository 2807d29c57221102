//! Connection lifecycle and runtime list tests

use std::sync::Arc;

use crate::{drain, stack, wait_for};
use webide::core::{Project, RuntimeType, SharedProject};
use webide::remote::test_utils::MockRuntime;
use webide::remote::{same_runtime, Connection, ConnectionStatus, Runtime};

#[tokio::test]
async fn test_connect_then_disconnect() {
    let stack = stack();
    let mut rx = stack.manager.subscribe();

    let runtime = stack.connect().await;

    assert!(stack.manager.connected());
    assert!(stack.manager.runtime_can_handle_apps());
    assert!(stack.manager.is_main_process_debuggable());
    assert_eq!(stack.client.list_tabs_calls(), 1);
    assert_eq!(stack.front.contract_violations(), 0);
    assert!(stack
        .manager
        .selected_runtime()
        .is_some_and(|selected| same_runtime(&selected, &runtime)));

    let reasons = drain(&mut rx);
    let connected = reasons.iter().position(|r| *r == "connection").unwrap();
    let apps_found = reasons
        .iter()
        .position(|r| *r == "runtime-apps-found")
        .unwrap();
    assert!(connected < apps_found);

    stack
        .manager
        .select_project(Some(SharedProject::new(Project::main_process())));
    stack.manager.disconnect_runtime().await.unwrap();

    assert_eq!(stack.connection.status(), ConnectionStatus::Disconnected);
    assert!(!stack.manager.runtime_can_handle_apps());
    assert!(stack.manager.selected_runtime().is_none());
    assert!(stack.manager.selected_project().is_none());
}

#[tokio::test]
async fn test_reconnecting_same_runtime_is_noop() {
    let stack = stack();
    let runtime = stack.connect().await;

    stack.manager.connect_to_runtime(runtime).await.unwrap();

    assert_eq!(stack.connection.connect_calls(), 1);
    assert_eq!(stack.connection.disconnect_calls(), 0);
}

#[tokio::test]
async fn test_runtime_list_buckets_registry_runtimes() {
    let stack = stack();
    let mut rx = stack.manager.subscribe();

    let runtimes: Vec<Arc<dyn Runtime>> = vec![
        Arc::new(MockRuntime::new("d0", RuntimeType::Usb)),
        Arc::new(MockRuntime::new("d1", RuntimeType::Wifi)),
        Arc::new(MockRuntime::new("d2", RuntimeType::Usb)),
        Arc::new(MockRuntime::new("d3", RuntimeType::Other)),
    ];
    stack.registry.set_runtimes(runtimes);
    wait_for(&mut rx, "runtimelist").await;

    let names = |list: &[Arc<dyn Runtime>]| list.iter().map(|r| r.name()).collect::<Vec<_>>();
    let list = stack.manager.runtime_list();
    assert_eq!(names(&list.usb), vec!["d0", "d2"]);
    assert_eq!(names(&list.wifi), vec!["d1"]);
    assert!(list.simulator.is_empty());
    assert_eq!(names(&list.other), vec!["d3"]);
}
