//! Platform-specific locations for config, data, cache and logs

use crate::config::Config;
use crate::fs::ensure_directory;
use crate::{Result, VibeError};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const DEFAULT_APP_NAME: &str = "vibe";
pub const DEFAULT_LOG_FILE_NAME: &str = "vibe.log";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Overrides the application name used for every platform directory
pub const APP_NAME_ENV: &str = "APP_NAME";
/// Overrides the log file name inside the log directory
pub const LOG_FILE_NAME_ENV: &str = "LOG_FILE_NAME";

const CONTEXT_DIR_NAME: &str = "agent_context";

/// Resolved directories for one application name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    /// Directories for `$APP_NAME`, falling back to `vibe`
    pub fn resolve() -> Result<Self> {
        Self::for_app(&app_name())
    }

    pub fn for_app(name: &str) -> Result<Self> {
        let dirs = ProjectDirs::from("", "", name).ok_or_else(|| {
            VibeError::config(APP_NAME_ENV, "could not determine the home directory")
        })?;

        let log_dir = dirs
            .state_dir()
            .unwrap_or_else(|| dirs.data_local_dir())
            .join("logs");

        Ok(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            data_dir: dirs.data_dir().to_path_buf(),
            cache_dir: dirs.cache_dir().to_path_buf(),
            log_dir,
        })
    }

    /// Same layout under a single directory
    pub fn rooted(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
            cache_dir: root.join("cache"),
            log_dir: root.join("logs"),
        }
    }

    /// Canonical store of agent definitions
    pub fn rules_dir(&self, config: &Config) -> PathBuf {
        self.data_dir.join(&config.rules_dir_name)
    }

    pub fn registry_file(&self, config: &Config) -> PathBuf {
        self.data_dir.join(&config.registry_file_name)
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// `<log dir>/$LOG_FILE_NAME`, defaulting to `vibe.log`
    pub fn log_file(&self) -> PathBuf {
        let name = std::env::var(LOG_FILE_NAME_ENV)
            .ok()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILE_NAME.to_string());
        self.log_dir.join(name)
    }

    /// Per-agent context files
    pub fn context_dir(&self) -> PathBuf {
        self.data_dir.join(CONTEXT_DIR_NAME)
    }

    /// Create the config, data and log directories
    pub fn ensure(&self, dir_mode: u32) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.log_dir] {
            ensure_directory(dir, dir_mode)?;
        }
        Ok(())
    }
}

/// `$APP_NAME` if set and non-empty
pub fn app_name() -> String {
    std::env::var(APP_NAME_ENV)
        .ok()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_APP_NAME.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rooted_layout() {
        let root = TempDir::new().unwrap();
        let paths = AppPaths::rooted(root.path());
        let config = Config::default();

        assert_eq!(paths.rules_dir(&config), root.path().join("data/.cursor/rules"));
        assert_eq!(paths.registry_file(&config), root.path().join("data/registry.json"));
        assert_eq!(paths.config_file(), root.path().join("config/config.json"));
        assert_eq!(paths.context_dir(), root.path().join("data/agent_context"));
    }

    #[test]
    fn test_ensure_creates_directories() {
        let root = TempDir::new().unwrap();
        let paths = AppPaths::rooted(root.path());

        paths.ensure(0o755).unwrap();

        assert!(paths.config_dir.is_dir());
        assert!(paths.data_dir.is_dir());
        assert!(paths.log_dir.is_dir());
        assert!(!paths.cache_dir.exists());
    }

    #[test]
    fn test_for_app_uses_name() {
        // ProjectDirs needs a home directory, which CI sandboxes may not have
        if let Ok(paths) = AppPaths::for_app("vibe-test-app") {
            assert!(paths.data_dir.to_string_lossy().contains("vibe-test-app"));
            assert!(paths.log_dir.ends_with("logs"));
        }
    }
}
