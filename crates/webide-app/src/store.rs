//! JSON file project store
//!
//! Projects are kept in one JSON document keyed by location. Every
//! operation holds an exclusive `fs2` lock on the file while it reads and
//! rewrites it, so several app manager processes can share one store.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use webide_core::prelude::*;
use webide_core::Project;
use webide_remote::ProjectStore;

use crate::config::StoreSettings;

const STORE_FILENAME: &str = "projects.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProjectsFile {
    #[serde(default)]
    projects: Vec<Project>,
}

impl ProjectsFile {
    fn position(&self, location: &str) -> Option<usize> {
        self.projects.iter().position(|p| p.location == location)
    }

    fn upsert(&mut self, project: Project) {
        match self.position(&project.location) {
            Some(index) => self.projects[index] = project,
            None => self.projects.push(project),
        }
    }

    fn remove(&mut self, location: &str) -> bool {
        match self.position(location) {
            Some(index) => {
                self.projects.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Project store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileProjectStore {
    path: PathBuf,
}

impl FileProjectStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_local_dir>/webide/projects.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("webide").join(STORE_FILENAME))
    }

    /// Store at the configured path, or the default one.
    pub fn from_settings(settings: &StoreSettings) -> Result<Self> {
        settings
            .path
            .clone()
            .or_else(Self::default_path)
            .map(Self::new)
            .ok_or_else(|| Error::store("No data directory for the project store"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored projects, in insertion order.
    pub fn load(&self) -> Result<Vec<Project>> {
        self.with_locked(|file| Ok((file.projects.clone(), false)))
    }

    /// Run `f` on the locked document; rewrite it when `f` reports a change.
    fn with_locked<R>(&self, f: impl FnOnce(&mut ProjectsFile) -> Result<(R, bool)>) -> Result<R> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        file.lock_exclusive()
            .map_err(|e| Error::store(format!("Failed to lock {:?}: {}", self.path, e)))?;

        let mut document = read_document(&mut file)?;
        let (result, changed) = f(&mut document)?;
        if changed {
            write_document(&mut file, &document)?;
        }

        // Lock is released when the file is dropped
        Ok(result)
    }

    fn run<R, F>(&self, f: F) -> BoxFuture<'static, Result<R>>
    where
        R: Send + 'static,
        F: FnOnce(&mut ProjectsFile) -> Result<(R, bool)> + Send + 'static,
    {
        let store = self.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || store.with_locked(f))
                .await
                .map_err(|e| Error::store(format!("Project store task failed: {}", e)))?
        })
    }
}

fn read_document(file: &mut File) -> Result<ProjectsFile> {
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    if content.trim().is_empty() {
        return Ok(ProjectsFile::default());
    }
    Ok(serde_json::from_str(&content)?)
}

fn write_document(file: &mut File, document: &ProjectsFile) -> Result<()> {
    let content = serde_json::to_string_pretty(document)?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(())
}

impl ProjectStore for FileProjectStore {
    fn get(&self, location: String) -> BoxFuture<'_, Result<Option<Project>>> {
        self.run(move |file| {
            let project = file.position(&location).map(|i| file.projects[i].clone());
            Ok((project, false))
        })
    }

    fn update(&self, project: Project) -> BoxFuture<'_, Result<()>> {
        debug!("Storing project {}", project.location);
        self.run(move |file| {
            file.upsert(project);
            Ok(((), true))
        })
    }

    fn update_location(&self, old_location: String, project: Project) -> BoxFuture<'_, Result<()>> {
        debug!("Moving stored project {} to {}", old_location, project.location);
        self.run(move |file| {
            file.remove(&old_location);
            file.upsert(project);
            Ok(((), true))
        })
    }

    fn remove(&self, location: String) -> BoxFuture<'_, Result<()>> {
        self.run(move |file| {
            let removed = file.remove(&location);
            if !removed {
                debug!("No stored project at {}", location);
            }
            Ok(((), removed))
        })
    }
}
