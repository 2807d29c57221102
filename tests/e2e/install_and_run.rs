//! Install-and-run workflow tests
//!
//! Select a project, connect, then build, validate, install and launch it
//! against an apps-capable runtime.

use crate::{drain, stack, wait_for};
use webide::core::{Manifest, Project, SharedProject};
use webide::remote::ValidationReport;
use webide::InstallOutcome;

const MANIFEST_URL: &str = "http://example.com/app/manifest.webapp";

fn valid_report() -> ValidationReport {
    ValidationReport {
        manifest: Some(Manifest {
            name: Some("Example".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_hosted_project_is_installed_then_launched() {
    let stack = stack();
    stack.validator.set_report(MANIFEST_URL, valid_report());

    let mut rx = stack.manager.subscribe();
    stack
        .manager
        .select_project(Some(SharedProject::new(Project::hosted(MANIFEST_URL))));
    wait_for(&mut rx, "project-validated").await;
    stack.connect().await;
    drain(&mut rx);

    let outcome = stack.manager.install_and_run_project().await.unwrap();

    assert_eq!(outcome, InstallOutcome::Launched);
    let installs = stack
        .front
        .calls()
        .into_iter()
        .filter(|call| *call == "installHosted")
        .count();
    assert_eq!(installs, 1);
    assert_eq!(stack.front.app(MANIFEST_URL).unwrap().launch_calls(), 1);
    assert_eq!(drain(&mut rx).last(), Some(&"project-is-running"));
    assert!(stack.manager.is_project_running());
    assert!(stack.errors.ids().is_empty());
}

#[tokio::test]
async fn test_validation_error_stops_before_install() {
    let stack = stack();
    stack.validator.set_report(
        MANIFEST_URL,
        ValidationReport {
            errors: vec!["Missing launch_path".to_string()],
            ..valid_report()
        },
    );

    let mut rx = stack.manager.subscribe();
    stack
        .manager
        .select_project(Some(SharedProject::new(Project::hosted(MANIFEST_URL))));
    wait_for(&mut rx, "project-validated").await;
    stack.connect().await;

    let outcome = stack.manager.install_and_run_project().await.unwrap();

    assert_eq!(outcome, InstallOutcome::BlockedByValidation);
    let calls = stack.front.calls();
    assert!(!calls.contains(&"installHosted"));
    assert!(!calls.contains(&"installPackaged"));
    assert!(stack.front.app(MANIFEST_URL).is_none());
    assert_eq!(stack.errors.ids(), vec!["error_cantInstallValidationErrors"]);
}

#[tokio::test]
async fn test_reinstalling_running_app_reloads_it() {
    let stack = stack();
    stack.validator.set_report(MANIFEST_URL, valid_report());
    stack.connect().await;

    let mut rx = stack.manager.subscribe();
    stack
        .manager
        .select_project(Some(SharedProject::new(Project::hosted(MANIFEST_URL))));
    wait_for(&mut rx, "project-validated").await;

    assert_eq!(
        stack.manager.install_and_run_project().await.unwrap(),
        InstallOutcome::Launched
    );
    assert_eq!(
        stack.manager.install_and_run_project().await.unwrap(),
        InstallOutcome::Reloaded
    );

    let app = stack.front.app(MANIFEST_URL).unwrap();
    assert_eq!(app.launch_calls(), 1);
    assert_eq!(app.reload_calls(), 1);
    assert_eq!(stack.builder.calls(), 2);
}
