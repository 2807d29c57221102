//! Project persistence through the JSON file store

use tempfile::tempdir;

use crate::{stack_with_file_store, wait_for};
use webide::core::{Project, SharedProject};
use webide::remote::{ProjectStore, ValidationReport};
use webide::{FileProjectStore, Selection};

const OLD_URL: &str = "http://example.com/old/manifest.webapp";
const CANONICAL_URL: &str = "http://example.com/manifest.webapp";

#[tokio::test]
async fn test_hosted_project_moves_to_canonical_url_on_disk() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("projects.json");
    let store = FileProjectStore::new(&path);
    store.update(Project::hosted(OLD_URL)).await.unwrap();

    let stack = stack_with_file_store(&path);
    stack.validator.set_report(
        OLD_URL,
        ValidationReport {
            manifest_url: Some(CANONICAL_URL.to_string()),
            ..Default::default()
        },
    );

    let project = SharedProject::new(Project::hosted(OLD_URL));
    stack.manager.validate_project(&project).await.unwrap();

    assert_eq!(project.location(), CANONICAL_URL);
    let locations: Vec<_> = store.load().unwrap().into_iter().map(|p| p.location).collect();
    assert_eq!(locations, vec![CANONICAL_URL.to_string()]);
}

#[tokio::test]
async fn test_removing_selected_project_deletes_it_from_disk() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("projects.json");
    let store = FileProjectStore::new(&path);
    store.update(Project::packaged("/apps/keep")).await.unwrap();
    store.update(Project::packaged("/apps/drop")).await.unwrap();

    let stack = stack_with_file_store(&path);
    let mut rx = stack.manager.subscribe();
    stack
        .manager
        .select_project(Some(SharedProject::new(Project::packaged("/apps/drop"))));
    wait_for(&mut rx, "project-validated").await;

    assert_eq!(
        stack.manager.remove_selected_project().await.unwrap(),
        Selection::Changed
    );

    let locations: Vec<_> = store.load().unwrap().into_iter().map(|p| p.location).collect();
    assert_eq!(locations, vec!["/apps/keep".to_string()]);
}
