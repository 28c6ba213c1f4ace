//! File system operations for vibe
//!
//! - Atomic writes (temp file + rename) with explicit permission bits
//! - Directory creation with a configured mode
//! - Selective copying of agent definition trees between the canonical store and projects

use crate::security::validate_path_within_base;
use crate::{Result, VibeError};
use fs_err as fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

/// Extension of agent definition files
pub const DEFINITION_EXTENSION: &str = "mdc";

/// Directories never descended into when copying or scanning definition trees
pub const EXCLUDED_DIRS: &[&str] = &[".git", ".github", ".vscode", "node_modules", ".cursor", ".vibe"];

/// Write data to a file atomically using temp file + rename
///
/// 1. Write to temporary file in same directory
/// 2. Flush to disk
/// 3. Atomically rename temp to target
pub fn write_atomic<P: AsRef<Path>>(path: P, content: impl AsRef<[u8]>) -> Result<()> {
    write_atomic_inner(path.as_ref(), content.as_ref(), None)
}

/// Like [`write_atomic`], but the file ends up with `mode` permission bits on unix
pub fn write_atomic_with_mode<P: AsRef<Path>>(
    path: P,
    content: impl AsRef<[u8]>,
    mode: u32,
) -> Result<()> {
    write_atomic_inner(path.as_ref(), content.as_ref(), Some(mode))
}

fn write_atomic_inner(path: &Path, content: &[u8], mode: Option<u32>) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| VibeError::validation("path", "must have a parent directory"))?;

    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent)?;
    }
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };

    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(content)?;
    temp_file.flush()?;
    if let Some(mode) = mode {
        set_file_mode(temp_file.as_file(), mode)?;
    }
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn set_file_mode(file: &std::fs::File, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_mode(_file: &std::fs::File, _mode: u32) -> Result<()> {
    Ok(())
}

/// Ensure a directory exists, creating it (and missing parents) with `mode`
///
/// Existing directories are left untouched.
pub fn ensure_directory<P: AsRef<Path>>(path: P, mode: u32) -> Result<()> {
    let path = path.as_ref();

    if path.is_dir() {
        return Ok(());
    }

    create_dir_with_mode(path, mode)
        .map_err(|e| VibeError::operation("create directory", path, e))
}

#[cfg(unix)]
fn create_dir_with_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
}

#[cfg(not(unix))]
fn create_dir_with_mode(path: &Path, _mode: u32) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

/// Options for [`copy_definitions`]
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Only files with this extension are copied
    pub extension: String,
    pub file_mode: u32,
    pub dir_mode: u32,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            extension: DEFINITION_EXTENSION.to_string(),
            file_mode: 0o644,
            dir_mode: 0o755,
        }
    }
}

/// Outcome of copying one definition tree into another
#[derive(Debug, Default)]
pub struct CopyReport {
    /// Files that did not exist in the destination
    pub added: Vec<PathBuf>,
    /// Files whose content changed
    pub updated: Vec<PathBuf>,
    /// Files already identical in the destination
    pub unchanged: Vec<PathBuf>,
}

impl CopyReport {
    /// Number of files written
    pub fn written(&self) -> usize {
        self.added.len() + self.updated.len()
    }

    /// Number of definition files found in the source
    pub fn total(&self) -> usize {
        self.written() + self.unchanged.len()
    }
}

/// Copy definition files from `src` into `dst`, keeping the relative layout
///
/// Only files ending in `opts.extension` are copied, and [`EXCLUDED_DIRS`] are never
/// entered. Files whose content already matches are not rewritten.
pub fn copy_definitions(src: &Path, dst: &Path, opts: &CopyOptions) -> Result<CopyReport> {
    if !src.is_dir() {
        return Err(VibeError::operation(
            "copy definitions",
            src,
            VibeError::not_found("source directory", src.display().to_string()),
        ));
    }

    ensure_directory(dst, opts.dir_mode)?;

    let mut report = CopyReport::default();
    for path in definition_files(src, &opts.extension) {
        let relative = path.strip_prefix(src).map_err(|_| {
            VibeError::validation("path", format!("'{}' is outside '{}'", path.display(), src.display()))
        })?;
        let target = dst.join(relative);
        validate_path_within_base(dst, &target)?;

        let content = fs::read(&path)
            .map_err(|e| VibeError::operation("read definition", &path, e))?;

        if target.exists() {
            let existing = fs::read(&target)
                .map_err(|e| VibeError::operation("read definition", &target, e))?;
            if existing == content {
                trace!(file = %target.display(), "unchanged");
                report.unchanged.push(target);
                continue;
            }
        }

        if let Some(parent) = target.parent() {
            ensure_directory(parent, opts.dir_mode)?;
        }

        let existed = target.exists();
        write_atomic_with_mode(&target, &content, opts.file_mode)
            .map_err(|e| VibeError::operation("write definition", &target, e))?;

        debug!(from = %path.display(), to = %target.display(), "copied definition");
        if existed {
            report.updated.push(target);
        } else {
            report.added.push(target);
        }
    }

    Ok(report)
}

/// True when `dir` holds at least one file with `extension` outside [`EXCLUDED_DIRS`]
pub fn has_definition_files(dir: &Path, extension: &str) -> bool {
    dir.is_dir() && definition_files(dir, extension).next().is_some()
}

/// Count files with `extension` under `dir`, skipping [`EXCLUDED_DIRS`]
pub fn count_files(dir: &Path, extension: &str) -> usize {
    if !dir.is_dir() {
        return 0;
    }
    definition_files(dir, extension).count()
}

/// Lazily walk `root` for files ending in `.<extension>`
///
/// Unreadable entries are logged and skipped.
pub fn definition_files<'a>(root: &Path, extension: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .filter(move |path| has_extension(path, extension))
}

fn is_excluded(entry: &DirEntry) -> bool {
    // the walk root itself may legitimately live inside `.cursor`
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == extension)
}
