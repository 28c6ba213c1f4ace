//! Load, validate, and save `config.json`
//!
//! The loaded [`Config`] is handed to each component that needs it; nothing reads
//! configuration from global state.

use crate::agents::validate_agent_id;
use crate::fs::{ensure_directory, write_atomic_with_mode};
use crate::security::validate_config_name;
use crate::{Result, VibeError};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_RULES_DIR_NAME: &str = ".cursor/rules";
pub const DEFAULT_AGENTS_DIR_NAME: &str = "cursor-rules";
pub const DEFAULT_REGISTRY_FILE_NAME: &str = "registry.json";
pub const DEFAULT_DIR_PERMISSION: u32 = 0o755;
pub const DEFAULT_FILE_PERMISSION: u32 = 0o644;

/// User configuration (`config.json`, camelCase keys)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Rules directory, relative to a project root and to the data directory
    pub rules_dir_name: String,
    /// Subdirectory that may hold agent definitions inside a rules directory
    pub agents_dir_name: String,
    pub registry_file_name: String,
    /// Only this subfolder of the canonical store is copied into projects, when set
    pub source_folder: String,
    pub dir_permission: u32,
    pub file_permission: u32,
    pub multi_agent_enabled: bool,
    pub last_selected_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules_dir_name: DEFAULT_RULES_DIR_NAME.to_string(),
            agents_dir_name: DEFAULT_AGENTS_DIR_NAME.to_string(),
            registry_file_name: DEFAULT_REGISTRY_FILE_NAME.to_string(),
            source_folder: String::new(),
            dir_permission: DEFAULT_DIR_PERMISSION,
            file_permission: DEFAULT_FILE_PERMISSION,
            multi_agent_enabled: false,
            last_selected_agent: String::new(),
        }
    }
}

impl Config {
    /// Check every key that is later joined onto a path or used as a mode
    pub fn validate(&self) -> Result<()> {
        validate_config_name("rulesDirName", &self.rules_dir_name)?;
        validate_config_name("agentsDirName", &self.agents_dir_name)?;

        let registry = &self.registry_file_name;
        if registry.trim().is_empty()
            || registry.len() > 255
            || registry.contains(['/', '\\'])
            || registry.contains("..")
        {
            return Err(VibeError::config(
                "registryFileName",
                format!("'{registry}' must be a plain file name"),
            ));
        }

        if !self.source_folder.is_empty() {
            validate_config_name("sourceFolder", &self.source_folder)?;
        }

        for (key, mode) in [
            ("dirPermission", self.dir_permission),
            ("filePermission", self.file_permission),
        ] {
            if mode > 0o777 {
                return Err(VibeError::config(
                    key,
                    format!("{mode:o} is not a valid permission mode"),
                ));
            }
        }

        if !self.last_selected_agent.is_empty() {
            validate_agent_id(&self.last_selected_agent).map_err(|e| {
                VibeError::config("lastSelectedAgent", e.to_string())
            })?;
        }

        Ok(())
    }
}

/// Load configuration, falling back to defaults when the file does not exist
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    if !path.exists() {
        debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&contents)
        .map_err(|e| VibeError::config(path.display().to_string(), e.to_string()))?;

    config.validate()?;

    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Save config atomically, creating its directory when needed
pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<()> {
    let path = path.as_ref();

    config.validate()?;

    if let Some(parent) = path.parent() {
        ensure_directory(parent, config.dir_permission)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    write_atomic_with_mode(path, json, config.file_permission)?;

    debug!(path = %path.display(), "saved configuration");
    Ok(())
}
