//! Agent definition registry
//!
//! Agents are `<id>.mdc` files anywhere under a rules directory. A scan rebuilds the whole
//! map; there is no incremental update. Files that cannot become an agent are reported in
//! [`ScanReport::skipped`] and never abort the scan.

use crate::fs::{definition_files, ensure_directory, has_definition_files, DEFINITION_EXTENSION};
use crate::models::AgentDefinition;
use crate::parser::{parse_document, DefinitionFrontmatter};
use crate::{Result, VibeError};
use chrono::Utc;
use fs_err as fs;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

pub const MAX_AGENT_ID_LEN: usize = 100;
pub const DEFAULT_AGENT_VERSION: &str = "1.0";
pub const DEFAULT_AGENT_TYPE: &str = "ai";

/// Only the head of a definition is read for metadata
const METADATA_SCAN_LINES: usize = 50;
const ROLE_MARKER: &str = "## 🎯 Role:";
const TEMPLATES_DIR: &str = "templates";

/// Check an agent ID derived from a file name
///
/// IDs are used as map keys and file stems, so path separators, dots, spaces, the empty
/// string and anything over [`MAX_AGENT_ID_LEN`] bytes are rejected.
pub fn validate_agent_id(id: &str) -> Result<()> {
    let reason = if id.is_empty() {
        Some("empty")
    } else if id.len() > MAX_AGENT_ID_LEN {
        Some("longer than 100 characters")
    } else if id.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if id.contains("..") {
        Some("contains '..'")
    } else if id.contains('.') {
        Some("contains a dot")
    } else if id.chars().any(char::is_whitespace) {
        Some("contains whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(VibeError::InvalidAgentId {
            id: id.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Why a file did not become an agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InvalidId(String),
    Unreadable(String),
    /// Another file with the same stem was loaded first
    DuplicateId(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Result of one scan
#[derive(Debug, Default)]
pub struct ScanReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedEntry>,
}

/// Progress of a running scan, for callers that want to display it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Started { dir: PathBuf },
    FileFound(PathBuf),
    Loaded { id: String },
    Skipped(SkippedEntry),
    Completed { loaded: usize },
}

/// In-memory index of the agents under one rules directory
#[derive(Debug)]
pub struct AgentRegistry {
    rules_dir: PathBuf,
    dir_mode: u32,
    agents: BTreeMap<String, AgentDefinition>,
    events: Option<Sender<ScanEvent>>,
}

impl AgentRegistry {
    /// Empty registry; call [`AgentRegistry::scan`] to populate it
    pub fn new(rules_dir: impl Into<PathBuf>, dir_mode: u32) -> Self {
        Self {
            rules_dir: rules_dir.into(),
            dir_mode,
            agents: BTreeMap::new(),
            events: None,
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Receive [`ScanEvent`]s from subsequent scans
    pub fn subscribe(&mut self) -> Receiver<ScanEvent> {
        let (tx, rx) = mpsc::channel();
        self.events = Some(tx);
        rx
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(tx) = &self.events {
            // a dropped receiver only means nobody is watching
            let _ = tx.send(event);
        }
    }

    /// Discard the current map and rebuild it from disk
    ///
    /// A missing rules directory is created. Only failing to create it is an error.
    pub fn scan(&mut self) -> Result<ScanReport> {
        self.agents.clear();
        debug!(dir = %self.rules_dir.display(), "scanning for agent definitions");
        self.emit(ScanEvent::Started {
            dir: self.rules_dir.clone(),
        });

        ensure_directory(&self.rules_dir, self.dir_mode)?;

        let mut report = ScanReport::default();
        let files: Vec<PathBuf> = definition_files(&self.rules_dir, DEFINITION_EXTENSION).collect();
        info!(count = files.len(), "found agent definition files");

        for path in files {
            self.emit(ScanEvent::FileFound(path.clone()));
            match self.load_definition(&path) {
                Ok(definition) => {
                    let id = definition.id.clone();
                    debug!(id, name = definition.name, "added agent");
                    self.agents.insert(id.clone(), definition);
                    report.loaded += 1;
                    self.emit(ScanEvent::Loaded { id });
                }
                Err(reason) => {
                    warn!(path = %path.display(), ?reason, "skipping agent definition");
                    let entry = SkippedEntry { path, reason };
                    self.emit(ScanEvent::Skipped(entry.clone()));
                    report.skipped.push(entry);
                }
            }
        }

        self.emit(ScanEvent::Completed {
            loaded: report.loaded,
        });
        Ok(report)
    }

    /// Alias for [`AgentRegistry::scan`]
    pub fn rescan(&mut self) -> Result<ScanReport> {
        self.scan()
    }

    fn load_definition(&self, path: &Path) -> std::result::Result<AgentDefinition, SkipReason> {
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        if let Err(e) = validate_agent_id(&id) {
            return Err(SkipReason::InvalidId(e.to_string()));
        }
        if let Some(existing) = self.agents.get(&id) {
            return Err(SkipReason::DuplicateId(
                existing.definition_path.clone().unwrap_or_default(),
            ));
        }

        let head = read_head(path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;
        let metadata = extract_metadata(&head, &id);

        let templates = self.find_templates(&id).unwrap_or_else(|e| {
            warn!(id, error = %e, "failed to look up templates");
            Vec::new()
        });

        Ok(AgentDefinition {
            id,
            name: metadata.name,
            description: metadata.description,
            version: metadata.version,
            agent_type: metadata.agent_type,
            templates,
            last_updated: Utc::now(),
            definition_path: Some(path.to_path_buf()),
        })
    }

    /// `templates/<id>-*.tmpl` file names; no templates directory means none
    fn find_templates(&self, id: &str) -> Result<Vec<String>> {
        let templates_dir = self.rules_dir.join(TEMPLATES_DIR);
        if !templates_dir.is_dir() {
            return Ok(Vec::new());
        }

        let pattern = templates_dir.join(format!("{}-*.tmpl", glob::Pattern::escape(id)));
        let mut names: Vec<String> = glob::glob(&pattern.to_string_lossy())?
            .filter_map(|entry| entry.ok())
            .filter_map(|path| path.file_name()?.to_str().map(String::from))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Look up an agent by exact ID
    ///
    /// The ID is validated first, so a malformed ID never matches anything.
    pub fn get_agent(&self, id: &str) -> Result<&AgentDefinition> {
        validate_agent_id(id)?;
        self.agents.get(id).ok_or_else(|| VibeError::AgentNotFound {
            id: id.to_string(),
            suggestion: self.suggest(id),
        })
    }

    pub fn agent_exists(&self, id: &str) -> bool {
        validate_agent_id(id).is_ok() && self.agents.contains_key(id)
    }

    /// All agents, ordered by ID
    pub fn list_agents(&self) -> Vec<&AgentDefinition> {
        self.agents.values().collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Resolve user input: exact ID, then 1-based list index, then display name
    ///
    /// Names match case-insensitively with `-` and `_` treated as spaces.
    pub fn find_agent(&self, query: &str) -> Result<&AgentDefinition> {
        let query = query.trim();

        if validate_agent_id(query).is_ok() {
            if let Some(agent) = self.agents.get(query) {
                return Ok(agent);
            }
        }

        if let Ok(index) = query.parse::<usize>() {
            let count = self.agents.len();
            return match index.checked_sub(1).and_then(|i| self.agents.values().nth(i)) {
                Some(agent) => Ok(agent),
                None => Err(VibeError::validation(
                    "agent index",
                    format!("{index} is out of range, use a number between 1 and {count}"),
                )),
            };
        }

        let wanted = normalize_name(query);
        self.agents
            .values()
            .find(|agent| {
                normalize_name(&agent.name) == wanted || agent.id.eq_ignore_ascii_case(query)
            })
            .ok_or_else(|| VibeError::AgentNotFound {
                id: query.to_string(),
                suggestion: self.suggest(query),
            })
    }

    /// Closest known ID, if it is plausibly a typo
    fn suggest(&self, query: &str) -> Option<String> {
        if query.len() <= 2 {
            return None;
        }
        self.agents
            .keys()
            .map(|id| (strsim::levenshtein(query, id), id))
            .filter(|(distance, _)| *distance <= 3)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, id)| id.clone())
    }
}

fn normalize_name(name: &str) -> String {
    name.replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// First lines of a definition, enough for metadata
///
/// Invalid UTF-8 is replaced rather than rejected.
fn read_head(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(fs::File::open(path)?);
    let mut head = String::new();
    let mut line = Vec::new();
    for _ in 0..=METADATA_SCAN_LINES {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        head.push_str(String::from_utf8_lossy(&line).trim_end_matches(['\n', '\r']));
        head.push('\n');
    }
    Ok(head)
}

#[derive(Debug, PartialEq, Eq)]
struct DefinitionMetadata {
    name: String,
    description: String,
    version: String,
    agent_type: String,
}

/// Heading scan first, frontmatter fills what the headings left empty
fn extract_metadata(head: &str, id: &str) -> DefinitionMetadata {
    let frontmatter = match parse_document::<DefinitionFrontmatter>(head, Some(id)) {
        Ok(doc) => doc.frontmatter.unwrap_or_default(),
        Err(e) => {
            debug!(id, error = %e, "ignoring unreadable frontmatter");
            DefinitionFrontmatter::default()
        }
    };

    let lines: Vec<&str> = head.lines().collect();
    let mut name = None;
    let mut description = None;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if name.is_none() {
            if let Some(heading) = trimmed.strip_prefix("# ") {
                name = Some(heading.trim().to_string()).filter(|n| !n.is_empty());
                continue;
            }
        }
        if description.is_none() && is_role_marker(trimmed) {
            description = lines
                .get(i + 1)
                .map(|next| next.trim().to_string())
                .filter(|d| !d.is_empty());
        }
    }

    DefinitionMetadata {
        name: name
            .or(frontmatter.name)
            .unwrap_or_else(|| id.to_string()),
        description: description.or(frontmatter.description).unwrap_or_default(),
        version: frontmatter
            .version
            .unwrap_or_else(|| DEFAULT_AGENT_VERSION.to_string()),
        agent_type: frontmatter
            .agent_type
            .unwrap_or_else(|| DEFAULT_AGENT_TYPE.to_string()),
    }
}

/// `## 🎯 Role:`, or any `## ` heading whose text starts with `Role:` after an emoji
fn is_role_marker(line: &str) -> bool {
    if line.starts_with(ROLE_MARKER) {
        return true;
    }
    line.strip_prefix("## ").is_some_and(|rest| {
        rest.trim_start_matches(|c: char| !c.is_ascii())
            .trim_start()
            .starts_with("Role:")
    })
}

/// First directory that holds agent definitions
///
/// Checked in order: the project's agents subdirectory, the project's rules directory, the
/// canonical agents subdirectory, the canonical rules directory.
pub fn find_rules_dir(
    project: &Path,
    canonical_rules: &Path,
    rules_dir_name: &str,
    agents_dir_name: &str,
) -> Option<PathBuf> {
    let project_rules = project.join(rules_dir_name);
    [
        project_rules.join(agents_dir_name),
        project_rules,
        canonical_rules.join(agents_dir_name),
        canonical_rules.to_path_buf(),
    ]
    .into_iter()
    .find(|dir| has_definition_files(dir, DEFINITION_EXTENSION))
}
