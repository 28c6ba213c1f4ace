//! Common test helpers and utilities
//!
//! This module provides reusable test infrastructure

// The `unreachable_pub` is to silence false positives in IDEs.
// The `dead_code` is because not all test utilities are used by all tests.
#![allow(dead_code, unreachable_pub)]

use fs_err as fs;
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;
use vibe::config::Config;
use vibe::git::GitService;
use vibe::paths::AppPaths;
use vibe::sync::AgentInitializer;
use vibe::{Result, VibeError};

/// Test context that owns an isolated application root and any number of projects
///
/// Automatically cleans up on drop. Provides convenient methods for:
/// - Building an initializer against a fake git
/// - Writing definitions into the canonical store and into projects
/// - Reading them back
pub struct TestContext {
    /// Temporary directory (auto-cleaned on drop)
    temp_dir: TempDir,
    pub config: Config,
    pub paths: AppPaths,
}

impl TestContext {
    /// Create a new test context with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let paths = AppPaths::rooted(&temp_dir.path().join("app"));
        Self {
            temp_dir,
            config,
            paths,
        }
    }

    /// Get the temporary root path
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get a path relative to the temporary root
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Canonical store of agent definitions
    pub fn store(&self) -> PathBuf {
        self.paths.rules_dir(&self.config)
    }

    /// Create an empty project directory
    pub fn project(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        fs::create_dir_all(&path).expect("Failed to create project dir");
        path
    }

    /// Rules directory inside `project`
    pub fn project_rules(&self, project: &Path) -> PathBuf {
        project.join(&self.config.rules_dir_name)
    }

    /// Write a definition into the canonical store
    pub fn create_store_definition(&self, relative: &str, content: &str) -> PathBuf {
        write_file(&self.store().join(relative), content)
    }

    /// Write a definition into a project's rules directory
    pub fn create_project_definition(
        &self,
        project: &Path,
        relative: &str,
        content: &str,
    ) -> PathBuf {
        write_file(&self.project_rules(project).join(relative), content)
    }

    /// Read a definition from a project's rules directory
    pub fn read_project_definition(&self, project: &Path, relative: &str) -> String {
        fs::read_to_string(self.project_rules(project).join(relative))
            .expect("Failed to read definition")
    }

    /// Initializer whose git writes `files` on clone
    pub fn initializer(&self, files: &[&'static str]) -> (AgentInitializer, Rc<Cell<usize>>) {
        let git = FakeGit::new(files);
        let clones = Rc::clone(&git.clones);
        let init = AgentInitializer::new(self.config.clone(), &self.paths, Box::new(git))
            .expect("Failed to build initializer");
        (init, clones)
    }

    /// Initializer whose git always fails
    pub fn offline_initializer(&self) -> AgentInitializer {
        AgentInitializer::new(self.config.clone(), &self.paths, Box::new(OfflineGit))
            .expect("Failed to build initializer")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Pretends to clone by writing each file as a one-heading definition
pub struct FakeGit {
    files: Vec<&'static str>,
    pub clones: Rc<Cell<usize>>,
    pub pulls: Rc<Cell<usize>>,
}

impl FakeGit {
    pub fn new(files: &[&'static str]) -> Self {
        Self {
            files: files.to_vec(),
            clones: Rc::default(),
            pulls: Rc::default(),
        }
    }
}

impl GitService for FakeGit {
    fn clone_repo(&self, _url: &str, dest: &Path) -> Result<()> {
        self.clones.set(self.clones.get() + 1);
        for file in &self.files {
            let title = Path::new(file)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            write_file(&dest.join(file), &format!("# {title}\n\nCloned definition.\n"));
        }
        Ok(())
    }

    fn pull(&self, _repo: &Path) -> Result<()> {
        self.pulls.set(self.pulls.get() + 1);
        Ok(())
    }
}

/// Git without a network
pub struct OfflineGit;

impl GitService for OfflineGit {
    fn clone_repo(&self, url: &str, _dest: &Path) -> Result<()> {
        Err(VibeError::Other(format!("could not resolve host for {url}")))
    }

    fn pull(&self, _repo: &Path) -> Result<()> {
        Err(VibeError::Other("could not resolve host".to_string()))
    }
}

/// Write `content` to `path`, creating parent directories
pub fn write_file(path: &Path, content: &str) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).expect("Failed to create parent dir");
    fs::write(path, content).expect("Failed to write file");
    path.to_path_buf()
}

/// A definition with a title heading and a role section
pub fn definition(title: &str, description: &str) -> String {
    format!("# {title}\n\n## 🎯 Role:\n{description}\n\nWork carefully.\n")
}
