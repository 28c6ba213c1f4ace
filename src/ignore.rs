//! Keep generated directories out of `.gitignore` and `.cursorignore`

use crate::Result;
use fs_err as fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Append `entry` to the ignore file unless an equivalent line is already there
///
/// `foo`, `foo/`, `/foo` and `/foo/` are treated as the same entry. The file is created
/// when missing. Returns whether the file changed.
pub fn ensure_entry(file: &Path, entry: &str) -> Result<bool> {
    if !file.exists() {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(file, format!("{entry}\n"))?;
        debug!(file = %file.display(), entry, "created ignore file");
        return Ok(true);
    }

    let content = fs::read_to_string(file)?;
    if has_entry(&content, entry) {
        debug!(file = %file.display(), entry, "ignore entry already present");
        return Ok(false);
    }

    let mut handle = fs::OpenOptions::new().append(true).open(file)?;
    if !content.is_empty() && !content.ends_with('\n') {
        writeln!(handle)?;
    }
    writeln!(handle, "{entry}")?;

    debug!(file = %file.display(), entry, "appended ignore entry");
    Ok(true)
}

fn has_entry(content: &str, entry: &str) -> bool {
    let wanted = normalize(entry);
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .any(|line| normalize(line) == wanted)
}

fn normalize(entry: &str) -> &str {
    let entry = entry.trim();
    let entry = entry.strip_prefix('/').unwrap_or(entry);
    entry.strip_suffix('/').unwrap_or(entry)
}
