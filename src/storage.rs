//! Persisting canonical rules as `<sanitized-name>.json`
//!
//! What happens when a file already exists is decided by a [`ConflictResolver`], so the
//! write path itself never talks to the terminal. The interactive prompt is just one
//! resolver among several.

use crate::config::DEFAULT_DIR_PERMISSION;
use crate::fs::{ensure_directory, write_atomic_with_mode};
use crate::models::CursorRule;
use crate::security::validate_path_within_base;
use crate::{Result, VibeError};
use chrono::Utc;
use fs_err as fs;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Longest sanitized file stem, extension excluded
pub const MAX_FILENAME_LEN: usize = 100;

const RULE_EXTENSION: &str = "json";
const INVALID_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// What to do with a rule whose file already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Overwrite,
    /// Keep the existing file and write under a timestamped name
    Rename,
    Skip,
}

/// Policy consulted for every filename collision
pub trait ConflictResolver {
    fn resolve(&mut self, rule_name: &str, existing: &Path) -> Result<Resolution>;
}

/// Always replace the existing file
#[derive(Debug, Default, Clone, Copy)]
pub struct Overwrite;

impl ConflictResolver for Overwrite {
    fn resolve(&mut self, _rule_name: &str, _existing: &Path) -> Result<Resolution> {
        Ok(Resolution::Overwrite)
    }
}

/// Never touch the existing file; write next to it
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoRename;

impl ConflictResolver for AutoRename {
    fn resolve(&mut self, _rule_name: &str, _existing: &Path) -> Result<Resolution> {
        Ok(Resolution::Rename)
    }
}

/// Abort the batch on the first collision
#[derive(Debug, Default, Clone, Copy)]
pub struct FailOnConflict;

impl ConflictResolver for FailOnConflict {
    fn resolve(&mut self, rule_name: &str, existing: &Path) -> Result<Resolution> {
        Err(VibeError::validation(
            "rules",
            format!("'{rule_name}' already exists at {}", existing.display()),
        ))
    }
}

/// Answers from a queue, then a fallback
#[derive(Debug, Clone)]
pub struct Scripted {
    answers: VecDeque<Resolution>,
    fallback: Resolution,
    asked: usize,
}

impl Scripted {
    pub fn new(answers: impl IntoIterator<Item = Resolution>, fallback: Resolution) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            fallback,
            asked: 0,
        }
    }

    /// How many collisions were resolved
    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl ConflictResolver for Scripted {
    fn resolve(&mut self, _rule_name: &str, _existing: &Path) -> Result<Resolution> {
        self.asked += 1;
        Ok(self.answers.pop_front().unwrap_or(self.fallback))
    }
}

/// Asks on the terminal; "no" keeps the existing file and renames the new one
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptResolver;

impl ConflictResolver for PromptResolver {
    fn resolve(&mut self, rule_name: &str, _existing: &Path) -> Result<Resolution> {
        let overwrite = dialoguer::Confirm::new()
            .with_prompt(format!("{rule_name} already exists. Overwrite?"))
            .default(false)
            .interact()
            .map_err(|e| VibeError::operation("prompt", rule_name, VibeError::Other(e.to_string())))?;

        Ok(if overwrite {
            Resolution::Overwrite
        } else {
            Resolution::Rename
        })
    }
}

/// Where each rule of a batch ended up
#[derive(Debug, Default)]
pub struct StoreReport {
    pub saved: Vec<PathBuf>,
    /// Names of rules left out because the resolver chose [`Resolution::Skip`]
    pub skipped: Vec<String>,
}

/// File stem for a rule name
///
/// Lower-cases, turns path separators, shell metacharacters and spaces into `-`, and cuts
/// the result at [`MAX_FILENAME_LEN`] bytes on a character boundary.
pub fn sanitize_filename(name: &str) -> String {
    let mut result: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c == ' ' || INVALID_FILENAME_CHARS.contains(&c) {
                '-'
            } else {
                c
            }
        })
        .collect();

    if result.len() > MAX_FILENAME_LEN {
        let mut end = MAX_FILENAME_LEN;
        while !result.is_char_boundary(end) {
            end -= 1;
        }
        result.truncate(end);
    }

    if result.is_empty() || result.chars().all(|c| c == '.') {
        // `.` and `..` would resolve to directories
        return "rule".to_string();
    }

    result
}

/// Write `rules` into `dir`, one JSON file each
///
/// With `force`, existing files are overwritten without consulting `resolver`. Partial
/// success is fine; storing nothing at all is an error.
pub fn store_rules_to_path(
    rules: &[CursorRule],
    dir: &Path,
    force: bool,
    resolver: &mut dyn ConflictResolver,
    file_mode: u32,
) -> Result<StoreReport> {
    ensure_directory(dir, DEFAULT_DIR_PERMISSION)?;

    let mut report = StoreReport::default();
    for rule in rules {
        let stem = sanitize_filename(rule.name());
        let mut path = dir.join(format!("{stem}.{RULE_EXTENSION}"));

        if path.exists() && !force {
            match resolver.resolve(rule.name(), &path)? {
                Resolution::Overwrite => {
                    debug!(rule = rule.name(), "overwriting existing rule");
                }
                Resolution::Rename => {
                    path = renamed_path(dir, &stem);
                    debug!(rule = rule.name(), path = %path.display(), "storing under new name");
                }
                Resolution::Skip => {
                    debug!(rule = rule.name(), "skipping existing rule");
                    report.skipped.push(rule.name().to_string());
                    continue;
                }
            }
        }

        validate_path_within_base(dir, &path)?;

        let data = serde_json::to_string_pretty(rule)
            .map_err(|e| VibeError::operation("serialize rule", &path, e))?;
        write_atomic_with_mode(&path, data, file_mode)
            .map_err(|e| VibeError::operation("write rule", &path, e))?;

        info!(rule = rule.name(), path = %path.display(), "saved rule");
        report.saved.push(path);
    }

    if report.saved.is_empty() {
        return Err(VibeError::validation("rules", "no rules were saved"));
    }

    Ok(report)
}

/// `<stem>-<unix seconds>.json`, with a counter when that is taken too
fn renamed_path(dir: &Path, stem: &str) -> PathBuf {
    let timestamp = Utc::now().timestamp();
    let mut candidate = dir.join(format!("{stem}-{timestamp}.{RULE_EXTENSION}"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}-{timestamp}-{counter}.{RULE_EXTENSION}"));
        counter += 1;
    }
    candidate
}

/// Read one stored rule back
pub fn load_rule(path: &Path) -> Result<CursorRule> {
    let content = fs::read_to_string(path).map_err(|e| VibeError::operation("read rule", path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        VibeError::parse(
            path.display().to_string(),
            Some(e.line()),
            e,
        )
    })
}

/// Every readable rule in `dir`, sorted by file name
///
/// Files that fail to parse are logged and left out.
pub fn list_rules(dir: &Path) -> Result<Vec<(PathBuf, CursorRule)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == RULE_EXTENSION)
        })
        .collect();
    paths.sort();

    let rules = paths
        .into_iter()
        .filter_map(|path| match load_rule(&path) {
            Ok(rule) => Some((path, rule)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable rule");
                None
            }
        })
        .collect();
    Ok(rules)
}
