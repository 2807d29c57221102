//! Tab store events for tab projects

use std::sync::Weak;

use tokio::sync::broadcast;
use url::Url;

use webide_core::prelude::*;
use webide_core::{ProjectKind, ProjectType, Tab, TAB_LOADING_NAME};
use webide_remote::TabEvent;

use super::{AppManager, Inner};
use crate::update::AppManagerUpdate;

/// `scheme://host[:port]`, or `scheme:` for URLs without a host.
fn pre_path(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}://{}:{}", url.scheme(), host, port),
        (Some(host), None) => format!("{}://{}", url.scheme(), host),
        (None, _) => format!("{}:", url.scheme()),
    }
}

/// Name shown for a tab project: its title (or a loading placeholder),
/// prefixed with the host for http(s) pages.
pub fn tab_display_name(tab: &Tab) -> String {
    let title = tab
        .title
        .as_deref()
        .filter(|title| !title.is_empty())
        .unwrap_or(TAB_LOADING_NAME);
    match Url::parse(&tab.url) {
        Ok(url) if url.scheme().starts_with("http") => {
            format!("{}: {}", url.host_str().unwrap_or_default(), title)
        }
        _ => title.to_string(),
    }
}

/// Favicon guess for a tab: `/favicon.ico` at the page's origin.
pub fn tab_favicon(tab: &Tab) -> Option<String> {
    let url = Url::parse(&tab.url).ok()?;
    Some(format!("{}/favicon.ico", pre_path(&url)))
}

impl AppManager {
    pub(crate) fn on_tab_navigate(&self) {
        let Some(project) = self.selected_project() else {
            return;
        };
        if project.project_type() != ProjectType::Tab {
            return;
        }
        let Some(tab) = self.inner.deps.tab_store.selected_tab() else {
            return;
        };

        let name = tab_display_name(&tab);
        let favicon = tab_favicon(&tab);
        project.update(|p| {
            p.location = tab.url.clone();
            p.name = name;
            if let Some(favicon) = favicon {
                p.icon = favicon;
            }
            p.kind = ProjectKind::Tab { tab };
        });
        self.publish(AppManagerUpdate::ProjectValidated);
    }

    pub(crate) fn on_tab_closed(&self) {
        let is_tab = self
            .selected_project()
            .is_some_and(|p| p.project_type() == ProjectType::Tab);
        if is_tab {
            self.select_project(None);
        }
    }
}

pub(super) async fn watch_tab_store(manager: Weak<Inner>, mut rx: broadcast::Receiver<TabEvent>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!("Tab events lagged, skipped {}", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let Some(manager) = AppManager::from_weak(&manager) else {
            break;
        };
        match event {
            TabEvent::Navigate => manager.on_tab_navigate(),
            TabEvent::Closed => manager.on_tab_closed(),
        }
    }
}
