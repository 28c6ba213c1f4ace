//! Persisted list of initialized projects
//!
//! Stored as `{"projects": [...]}`. The in-process lock covers concurrent access from one
//! process only; another process writing the same file is not coordinated.

use crate::fs::{ensure_directory, write_atomic_with_mode};
use crate::{Result, VibeError};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    projects: Vec<Utf8PathBuf>,
}

#[derive(Debug)]
pub struct ProjectRegistry {
    path: PathBuf,
    file_mode: u32,
    projects: RwLock<Vec<Utf8PathBuf>>,
    saves: AtomicUsize,
}

impl ProjectRegistry {
    /// Read the registry at `path`, creating and persisting an empty one when missing
    pub fn load(path: impl Into<PathBuf>, dir_mode: u32, file_mode: u32) -> Result<Self> {
        let path = path.into();
        debug!(path = %path.display(), "loading project registry");

        if !path.exists() {
            if let Some(parent) = path.parent() {
                ensure_directory(parent, dir_mode)?;
            }
            let registry = Self::with_projects(path, file_mode, Vec::new());
            registry.save(&[])?;
            return Ok(registry);
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| VibeError::operation("read project registry", &path, e))?;
        let file: RegistryFile = serde_json::from_str(&contents).map_err(|e| {
            VibeError::parse(path.display().to_string(), Some(e.line()), e)
        })?;

        debug!(count = file.projects.len(), "project registry loaded");
        Ok(Self::with_projects(path, file_mode, file.projects))
    }

    fn with_projects(path: PathBuf, file_mode: u32, projects: Vec<Utf8PathBuf>) -> Self {
        Self {
            path,
            file_mode,
            projects: RwLock::new(projects),
            saves: AtomicUsize::new(0),
        }
    }

    /// Register `project`; returns `false` without touching disk when already present
    pub fn add_project(&self, project: &Path) -> Result<bool> {
        let project = utf8_path(project)?;

        let mut projects = self.projects.write();
        if projects.iter().any(|p| p == &project) {
            debug!(project = %project, "project already registered");
            return Ok(false);
        }

        let mut updated = projects.clone();
        updated.push(project.clone());
        self.save(&updated)?;
        *projects = updated;
        debug!(project = %project, "project registered");
        Ok(true)
    }

    /// Snapshot of the registered paths, in registration order
    pub fn projects(&self) -> Vec<Utf8PathBuf> {
        self.projects.read().clone()
    }

    pub fn contains(&self, project: &Utf8Path) -> bool {
        self.projects.read().iter().any(|p| p == project)
    }

    pub fn len(&self) -> usize {
        self.projects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.read().is_empty()
    }

    /// Drop entries whose directory no longer exists, returning how many went
    pub fn clean_projects(&self) -> Result<usize> {
        let mut projects = self.projects.write();

        let retained: Vec<Utf8PathBuf> = projects
            .iter()
            .filter(|project| {
                let keep = project.is_dir();
                if !keep {
                    debug!(project = %project, "removing missing project");
                }
                keep
            })
            .cloned()
            .collect();

        let removed = projects.len() - retained.len();
        if removed > 0 {
            self.save(&retained)?;
            *projects = retained;
        }

        info!(removed, "project registry cleaned");
        Ok(removed)
    }

    /// Number of times the file has been written by this instance
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, projects: &[Utf8PathBuf]) -> Result<()> {
        let file = RegistryFile {
            projects: projects.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        write_atomic_with_mode(&self.path, json, self.file_mode)
            .map_err(|e| VibeError::operation("save project registry", &self.path, e))?;

        self.saves.fetch_add(1, Ordering::Relaxed);
        debug!(path = %self.path.display(), "project registry saved");
        Ok(())
    }
}

fn utf8_path(path: &Path) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).map_err(|p| {
        VibeError::validation("project", format!("'{}' is not valid UTF-8", p.display()))
    })
}
