//! Per-agent execution context
//!
//! The well-known fields are plain struct fields. Anything else goes in
//! [`AgentContext::extensions`], whose values carry their own type so a reader asking for
//! an integer never silently gets text.

use crate::agents::AgentRegistry;
use crate::cancel::Cancellation;
use crate::fs::{ensure_directory, write_atomic_with_mode};
use crate::models::AgentDefinition;
use crate::{Result, VibeError};
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Typed value for extension data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContextValue {
    Text(String),
    Integer(i64),
    Flag(bool),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentContext {
    pub agent_id: String,
    pub agent_type: String,
    pub agent_version: String,
    pub last_execution: Option<DateTime<Utc>>,
    pub execution_count: u64,
    pub error_count: u64,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub extensions: BTreeMap<String, ContextValue>,
}

impl AgentContext {
    /// Fresh context for a definition that has never run
    pub fn for_definition(definition: &AgentDefinition) -> Self {
        Self {
            agent_id: definition.id.clone(),
            agent_type: definition.agent_type.clone(),
            agent_version: definition.version.clone(),
            last_execution: None,
            execution_count: 0,
            error_count: 0,
            last_updated: Utc::now(),
            extensions: BTreeMap::new(),
        }
    }

    pub fn record_execution(&mut self) {
        let now = Utc::now();
        self.execution_count += 1;
        self.last_execution = Some(now);
        self.last_updated = now;
    }

    pub fn record_error(&mut self) {
        self.error_count += 1;
        self.last_updated = Utc::now();
    }

    pub fn set(&mut self, key: impl Into<String>, value: ContextValue) {
        self.extensions.insert(key.into(), value);
        self.last_updated = Utc::now();
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.extensions.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.extensions.get(key)? {
            ContextValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.extensions.get(key)? {
            ContextValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.extensions.get(key)? {
            ContextValue::Flag(value) => Some(*value),
            _ => None,
        }
    }

    pub fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.extensions.get(key)? {
            ContextValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }
}

/// One `<agent id>.json` file per agent
#[derive(Debug, Clone)]
pub struct ContextStore {
    dir: PathBuf,
    dir_mode: u32,
    file_mode: u32,
}

impl ContextStore {
    pub fn new(dir: impl Into<PathBuf>, dir_mode: u32, file_mode: u32) -> Self {
        Self {
            dir: dir.into(),
            dir_mode,
            file_mode,
        }
    }

    fn path_for(&self, agent_id: &str) -> PathBuf {
        self.dir.join(format!("{agent_id}.json"))
    }

    /// Stored context, or `None` when the agent has never been saved
    pub fn load(&self, agent_id: &str) -> Result<Option<AgentContext>> {
        crate::agents::validate_agent_id(agent_id)?;
        let path = self.path_for(agent_id);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(VibeError::operation("read context", &path, e)),
        };

        let context = serde_json::from_str(&contents).map_err(|e| {
            VibeError::parse(path.display().to_string(), Some(e.line()), e)
        })?;
        Ok(Some(context))
    }

    pub fn save(&self, context: &AgentContext) -> Result<()> {
        crate::agents::validate_agent_id(&context.agent_id)?;
        ensure_directory(&self.dir, self.dir_mode)?;

        let path = self.path_for(&context.agent_id);
        let json = serde_json::to_string_pretty(context)?;
        write_atomic_with_mode(&path, json, self.file_mode)
            .map_err(|e| VibeError::operation("save context", &path, e))?;

        debug!(agent = context.agent_id, path = %path.display(), "saved agent context");
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// A definition paired with its runtime context
#[derive(Debug, Clone)]
pub struct Agent {
    pub definition: AgentDefinition,
    pub context: AgentContext,
}

/// Look up `id` and attach a fresh context
///
/// Cancellation is checked before and after the lookup.
pub fn load_agent(registry: &AgentRegistry, id: &str, cancel: &Cancellation) -> Result<Agent> {
    cancel.check("load agent")?;
    let definition = registry.get_agent(id)?.clone();
    cancel.check("load agent")?;

    let context = AgentContext::for_definition(&definition);
    Ok(Agent {
        definition,
        context,
    })
}

/// Like [`load_agent`], but resume from the stored context when there is one
pub fn load_agent_with_store(
    registry: &AgentRegistry,
    store: &ContextStore,
    id: &str,
    cancel: &Cancellation,
) -> Result<Agent> {
    let mut agent = load_agent(registry, id, cancel)?;
    if let Some(stored) = store.load(id)? {
        agent.context = stored;
    }
    Ok(agent)
}
