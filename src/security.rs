//! Path validation for rule sources and storage targets
//!
//! Paths handed to vibe come from three places: the command line (`vibe import ./rules.md`),
//! the config file (`rulesDirName`, `agentsDirName`) and file names derived from rule
//! names. Each gets checked here before anything touches the disk. Stored rule files and
//! synced definitions must also resolve inside their destination directory.

use crate::{Result, VibeError};
use std::path::{Component, Path, PathBuf};

/// Validate that `target` resolves to a location inside `base`
///
/// Both paths are canonicalized (symlinks, `.`, `..`). A target that does not exist yet is
/// resolved through its closest existing ancestor, so this works for files about to be
/// written.
///
/// # Errors
///
/// Returns `PathTraversal` when the target escapes the base directory and `Operation`
/// when the base itself cannot be resolved.
pub fn validate_path_within_base(base: &Path, target: &Path) -> Result<()> {
    let canonical_base = base
        .canonicalize()
        .map_err(|e| VibeError::operation("resolve base directory", base, e))?;

    let canonical_target = if let Ok(path) = target.canonicalize() {
        path
    } else {
        let parent = target.parent().ok_or_else(|| {
            VibeError::validation("path", format!("'{}' has no parent directory", target.display()))
        })?;
        let canonical_parent = canonicalize_existing_ancestor(parent)?;
        let relative = target.strip_prefix(parent).map_err(|_| {
            VibeError::validation(
                "path",
                format!("cannot compute relative path for '{}'", target.display()),
            )
        })?;
        canonical_parent.join(relative)
    };

    if !canonical_target.starts_with(&canonical_base) {
        return Err(VibeError::PathTraversal {
            base: base.display().to_string(),
            target: target.display().to_string(),
        });
    }

    Ok(())
}

/// Walk up from `path` until an ancestor can be canonicalized
fn canonicalize_existing_ancestor(path: &Path) -> Result<PathBuf> {
    let mut current = path;

    loop {
        match current.canonicalize() {
            Ok(canonical) => return Ok(canonical),
            Err(_) => {
                current = current.parent().ok_or_else(|| {
                    VibeError::not_found("existing ancestor", path.display().to_string())
                })?;
            }
        }
    }
}

/// Reject absolute paths and `..` components
///
/// Does not touch the filesystem.
pub fn validate_relative_path(path: &Path) -> Result<()> {
    if path.is_absolute() || has_parent_component(path) {
        return Err(VibeError::PathTraversal {
            base: ".".to_string(),
            target: path.display().to_string(),
        });
    }

    Ok(())
}

/// Check a local rule source given on the command line
///
/// Absolute paths are accepted as-is; relative paths must not climb out of the working
/// directory with `..`.
pub fn validate_local_rule_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(VibeError::validation("path", "rule path is empty"));
    }
    if path.is_absolute() {
        return Ok(());
    }
    if has_parent_component(path) {
        return Err(VibeError::validation(
            "path",
            format!(
                "'{}' contains a parent-directory reference; use an absolute path instead",
                path.display()
            ),
        ));
    }
    Ok(())
}

/// Validate a directory or file name taken from configuration
///
/// Names are joined onto the data directory or a project root, so they must be relative,
/// non-empty and free of `..`.
pub fn validate_config_name(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(VibeError::config(key, "value cannot be empty"));
    }

    validate_relative_path(Path::new(value)).map_err(|_| {
        VibeError::config(
            key,
            format!("'{value}' must be a relative path without '..' components"),
        )
    })
}

fn has_parent_component(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}
