//! Canonical store ↔ project synchronization.

use crate::config::Config;
use crate::fs::{
    copy_definitions, count_files, ensure_directory, has_definition_files, CopyOptions,
    CopyReport, DEFINITION_EXTENSION,
};
use crate::git::{clone_or_pull, GitService};
use crate::ignore::ensure_entry;
use crate::paths::AppPaths;
use crate::projects::ProjectRegistry;
use crate::{Result, VibeError};
use anstream::println;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Repository cloned into the canonical store when it has no definitions yet
pub const DEFAULT_REPOSITORY: &str = "https://github.com/nsnarender5511/AgenticSystem";

const IGNORED_DIR: &str = ".cursor";
const CURSOR_IGNORE_FILE: &str = ".cursorignore";

/// Result of initializing one project
#[derive(Debug)]
pub struct InitReport {
    pub project: PathBuf,
    pub target: PathBuf,
    pub copied: CopyReport,
    /// The canonical store had to be cloned or pulled first
    pub setup_ran: bool,
    /// False when the project was already registered
    pub registered: bool,
}

/// Result of pushing one project's rules back and out to every other project
#[derive(Debug, Default)]
pub struct MergeReport {
    pub merged: CopyReport,
    pub succeeded: Vec<PathBuf>,
    /// (project, error)
    pub failed: Vec<(PathBuf, VibeError)>,
}

impl MergeReport {
    pub fn has_errors(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Print merge summary
    #[allow(clippy::print_stdout)] // This is user-facing output, not debug logging
    pub fn print_summary(&self) {
        print_copy_summary(&self.merged);

        if !self.succeeded.is_empty() {
            println!("\n✓ Updated {} project(s):", self.succeeded.len());
            for project in &self.succeeded {
                println!("  + {}", project.display());
            }
        }

        if self.has_errors() {
            println!("\n✗ Failed to update {} project(s):", self.failed.len());
            for (project, error) in &self.failed {
                println!("  ! {}: {error}", project.display());
            }
        }
    }
}

/// Print what a copy changed
#[allow(clippy::print_stdout)] // This is user-facing output, not debug logging
pub fn print_copy_summary(report: &CopyReport) {
    if !report.added.is_empty() {
        println!("\n✓ Added {} definition(s):", report.added.len());
        for path in &report.added {
            println!("  + {}", path.display());
        }
    }

    if !report.updated.is_empty() {
        println!("\n✓ Updated {} definition(s):", report.updated.len());
        for path in &report.updated {
            println!("  ~ {}", path.display());
        }
    }

    if !report.unchanged.is_empty() {
        println!(
            "\n→ Skipped {} definition(s) (already up-to-date)",
            report.unchanged.len()
        );
    }

    if report.total() == 0 {
        println!("→ No agent definitions to copy");
    } else if report.written() == 0 {
        println!("✓ All definitions are up-to-date");
    }
}

/// Moves definitions between the canonical store and registered projects
pub struct AgentInitializer {
    config: Config,
    agent_path: PathBuf,
    registry: ProjectRegistry,
    git: Box<dyn GitService>,
    repository: String,
}

impl std::fmt::Debug for AgentInitializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentInitializer")
            .field("agent_path", &self.agent_path)
            .field("repository", &self.repository)
            .field("projects", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl AgentInitializer {
    /// Create the config, data, log and canonical directories and load the project registry
    pub fn new(config: Config, paths: &AppPaths, git: Box<dyn GitService>) -> Result<Self> {
        paths.ensure(config.dir_permission)?;

        let agent_path = paths.rules_dir(&config);
        ensure_directory(&agent_path, config.dir_permission)?;
        debug!(path = %agent_path.display(), "using canonical store");

        let registry_path = paths.registry_file(&config);
        let registry =
            ProjectRegistry::load(&registry_path, config.dir_permission, config.file_permission)
                .map_err(|e| VibeError::operation("load project registry", &registry_path, e))?;

        Ok(Self {
            config,
            agent_path,
            registry,
            git,
            repository: DEFAULT_REPOSITORY.to_string(),
        })
    }

    /// Clone from `url` instead of [`DEFAULT_REPOSITORY`] during setup
    #[must_use]
    pub fn with_repository(mut self, url: impl Into<String>) -> Self {
        self.repository = url.into();
        self
    }

    /// Canonical store root
    pub fn agent_path(&self) -> &Path {
        &self.agent_path
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Where project copies come from: the store, or its configured source folder
    pub fn source_dir(&self) -> PathBuf {
        if self.config.source_folder.is_empty() {
            self.agent_path.clone()
        } else {
            self.agent_path.join(&self.config.source_folder)
        }
    }

    fn target_dir(&self, project: &Path) -> PathBuf {
        project.join(&self.config.rules_dir_name)
    }

    fn copy_options(&self) -> CopyOptions {
        CopyOptions {
            extension: DEFINITION_EXTENSION.to_string(),
            file_mode: self.config.file_permission,
            dir_mode: self.config.dir_permission,
        }
    }

    /// Initialize the current working directory
    pub fn init(&self) -> Result<InitReport> {
        let project = current_dir("init")?;
        self.init_in(&project)
    }

    /// Copy the canonical definitions into `project` and register it
    ///
    /// When the store (or its source folder) has no definitions, the default repository
    /// is cloned or pulled first. A failed setup aborts the whole call.
    pub fn init_in(&self, project: &Path) -> Result<InitReport> {
        let target = self.target_dir(project);
        info!(project = %project.display(), "initializing project");

        let setup_ran = self.needs_setup();
        if setup_ran {
            self.setup()?;
        }

        let source = self.source_dir();
        let copied = copy_definitions(&source, &target, &self.copy_options())
            .map_err(|e| VibeError::operation("init", &target, e))?;
        debug!(copied = copied.total(), target = %target.display(), "definitions copied");

        let registered = self
            .registry
            .add_project(project)
            .map_err(|e| VibeError::operation("register project", project, e))?;

        update_ignore_files(project);

        Ok(InitReport {
            project: project.to_path_buf(),
            target,
            copied,
            setup_ran,
            registered,
        })
    }

    fn needs_setup(&self) -> bool {
        let source = self.source_dir();
        if !source.is_dir() {
            warn!(path = %source.display(), "agent source does not exist");
            return true;
        }
        if !has_definition_files(&source, DEFINITION_EXTENSION) {
            warn!(path = %source.display(), "agent source contains no definitions");
            return true;
        }
        false
    }

    fn setup(&self) -> Result<()> {
        info!(url = self.repository, path = %self.agent_path.display(), "populating canonical store");

        clone_or_pull(
            self.git.as_ref(),
            &self.repository,
            &self.agent_path,
            self.config.dir_permission,
        )
        .map_err(|e| VibeError::operation("setup", &self.agent_path, e))?;

        if !self.config.source_folder.is_empty() {
            let source = self.source_dir();
            if !source.is_dir() {
                return Err(VibeError::operation(
                    "setup",
                    &source,
                    VibeError::not_found("source folder", self.config.source_folder.clone()),
                ));
            }
            if !has_definition_files(&source, DEFINITION_EXTENSION) {
                warn!(path = %source.display(), "source folder contains no agent definitions");
            }
        }

        info!(
            files = count_files(&self.agent_path, DEFINITION_EXTENSION),
            "canonical store ready"
        );
        Ok(())
    }

    /// Merge the current working directory
    pub fn merge(&self) -> Result<MergeReport> {
        let project = current_dir("merge")?;
        self.merge_from(&project)
    }

    /// Copy `project`'s rules over the canonical store, then out to every other project
    ///
    /// Failures on other projects are collected in the report, never returned.
    pub fn merge_from(&self, project: &Path) -> Result<MergeReport> {
        let local = self.target_dir(project);
        if !local.is_dir() {
            return Err(VibeError::operation(
                "merge",
                &local,
                VibeError::not_found("rules directory", local.display().to_string()),
            ));
        }

        let source = self.source_dir();
        let merged = copy_definitions(&local, &source, &self.copy_options())
            .map_err(|e| VibeError::operation("merge", &source, e))?;
        info!(written = merged.written(), "merged project into canonical store");

        let mut report = MergeReport {
            merged,
            ..MergeReport::default()
        };

        for other in self.registry.projects() {
            let other = other.into_std_path_buf();
            if other.as_path() == project {
                continue;
            }

            match self.copy_into_project(&source, &other) {
                Ok(copied) => {
                    debug!(project = %other.display(), written = copied.written(), "project updated");
                    report.succeeded.push(other);
                }
                Err(e) => {
                    warn!(project = %other.display(), error = %e, "failed to update project");
                    report.failed.push((other, e));
                }
            }
        }

        Ok(report)
    }

    fn copy_into_project(&self, source: &Path, project: &Path) -> Result<CopyReport> {
        if !project.is_dir() {
            return Err(VibeError::not_found("project", project.display().to_string()));
        }
        copy_definitions(source, &self.target_dir(project), &self.copy_options())
    }

    /// Sync the current working directory
    pub fn sync(&self) -> Result<CopyReport> {
        let project = current_dir("sync")?;
        self.sync_into(&project)
    }

    /// Copy the canonical definitions into `project`; no setup, no registration
    pub fn sync_into(&self, project: &Path) -> Result<CopyReport> {
        let target = self.target_dir(project);
        copy_definitions(&self.source_dir(), &target, &self.copy_options())
            .map_err(|e| VibeError::operation("sync", &target, e))
    }

    /// Forget registered projects whose directory is gone
    pub fn clean_projects(&self) -> Result<usize> {
        self.registry.clean_projects()
    }
}

fn current_dir(op: &str) -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| VibeError::operation(op, "current directory", e))
}

/// Best effort: keep the generated directory out of git and the editor index
fn update_ignore_files(project: &Path) {
    let gitignore = project.join(".gitignore");
    let cursorignore = project.join(CURSOR_IGNORE_FILE);

    for (file, entry) in [
        (&gitignore, IGNORED_DIR),
        (&gitignore, CURSOR_IGNORE_FILE),
        (&cursorignore, IGNORED_DIR),
    ] {
        if let Err(e) = ensure_entry(file, entry) {
            warn!(file = %file.display(), entry, error = %e, "failed to update ignore file");
        }
    }
}
