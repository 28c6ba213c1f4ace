//! Error types for vibe operations.
//!
//! Every failure falls into one of a handful of semantic kinds (see [`ErrorKind`]) so the
//! CLI can pick an exit code without matching on individual variants.

use owo_colors::OwoColorize;
use strum_macros::Display;
use thiserror::Error;

/// The main error type for vibe operations
#[derive(Error, Debug)]
pub enum VibeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An action against a specific path or resource failed
    #[error("{}", format_operation(op, path, source))]
    Operation {
        op: String,
        path: String,
        #[source]
        source: Box<VibeError>,
    },

    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Custom Display for "did you mean" hints
    #[error("{}", format_agent_not_found(id, suggestion.as_deref()))]
    AgentNotFound {
        id: String,
        suggestion: Option<String>,
    },

    /// Custom Display for formatted parse errors
    #[error("{}", format_parse_error(source_name, line.as_ref(), message))]
    Parse {
        source_name: String,
        line: Option<usize>,
        message: String,
    },

    #[error(
        "Configuration error for {key}: {message}\n\n{hint}{colon} Check {config} for valid JSON syntax and field names",
        key = key.cyan(),
        message = message.red(),
        hint = "hint".cyan().bold(),
        colon = ":".bold(),
        config = "`config.json`".cyan()
    )]
    Config { key: String, message: String },

    #[error(
        "Invalid agent ID: {id} ({reason})\n\n{hint}{colon} Agent IDs come from file names and may not contain path separators, dots or spaces",
        id = id.red().bold(),
        hint = "hint".cyan().bold(),
        colon = ":".bold()
    )]
    InvalidAgentId { id: String, reason: String },

    /// Both the file parser and the web parser rejected the same location
    #[error("{}", format_parsers_exhausted(path, file, web))]
    ParsersExhausted {
        path: String,
        file: Box<VibeError>,
        web: Box<VibeError>,
    },

    #[error(
        "Path traversal detected: '{target}' escapes base directory '{base}'\n\nPaths must stay within the base directory."
    )]
    PathTraversal { base: String, target: String },

    #[error("{op} cancelled")]
    Cancelled { op: String },

    #[error("{0}")]
    Other(String),
}

/// Semantic category of a [`VibeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Operational,
    Validation,
    NotFound,
    Parse,
    Config,
    Cancelled,
}

impl VibeError {
    /// Wrap `err` as the failure of `op` against `path`
    pub fn operation(
        op: impl Into<String>,
        path: impl AsRef<std::path::Path>,
        err: impl Into<Self>,
    ) -> Self {
        Self::Operation {
            op: op.into(),
            path: path.as_ref().display().to_string(),
            source: Box::new(err.into()),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn parse(source_name: impl Into<String>, line: Option<usize>, message: impl ToString) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            line,
            message: message.to_string(),
        }
    }

    /// Classify this error for reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Operation { source, .. } => match source.kind() {
                ErrorKind::Cancelled => ErrorKind::Cancelled,
                _ => ErrorKind::Operational,
            },
            Self::Io(_) | Self::Http(_) | Self::ParsersExhausted { .. } | Self::Other(_) => {
                ErrorKind::Operational
            }
            Self::Validation { .. } | Self::InvalidAgentId { .. } | Self::PathTraversal { .. } => {
                ErrorKind::Validation
            }
            Self::NotFound { .. } | Self::AgentNotFound { .. } => ErrorKind::NotFound,
            Self::JsonParse(_) | Self::GlobPattern(_) | Self::Parse { .. } => ErrorKind::Parse,
            Self::Config { .. } => ErrorKind::Config,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// True when this error itself reports a missing resource
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

// Formatting functions for complex error messages

fn format_operation(op: &str, path: &str, source: &VibeError) -> String {
    if path.is_empty() {
        format!("{op} failed: {source}")
    } else {
        format!("{op} failed for {}: {source}", path.cyan())
    }
}

fn format_agent_not_found(id: &str, suggestion: Option<&str>) -> String {
    let mut msg = format!("Agent not found: {}", id.red().bold());

    #[allow(clippy::format_push_string)]
    {
        if let Some(suggested) = suggestion {
            msg.push_str(&format!(
                "\n\n{}{} Did you mean {}?",
                "hint".cyan().bold(),
                ":".bold(),
                suggested.green()
            ));
        }

        msg.push_str(&format!(
            "\n{}{} Run {} to see the available agents",
            "hint".cyan().bold(),
            ":".bold(),
            "`vibe agent list`".green()
        ));
    }

    msg
}

fn format_parse_error(source_name: &str, line: Option<&usize>, message: &str) -> String {
    let mut msg = format!("parse error in {}", source_name.cyan());

    #[allow(clippy::format_push_string)]
    {
        if let Some(line_num) = line {
            msg.push_str(&format!(" at {}", format!("line {line_num}").yellow()));
        }

        msg.push_str(&format!(
            "\n\n{}\n  {}",
            "[parse error]".red().bold(),
            message.replace('\n', "\n  ")
        ));
    }

    msg
}

fn format_parsers_exhausted(path: &str, file: &VibeError, web: &VibeError) -> String {
    let mut msg = format!("all parsers failed for {}", path.cyan());

    #[allow(clippy::format_push_string)]
    {
        msg.push_str(&format!(
            "\n\n{}\n  {}",
            "[file]".red().bold(),
            file.to_string().replace('\n', "\n  ")
        ));
        msg.push_str(&format!(
            "\n{}\n  {}",
            "[web]".red().bold(),
            web.to_string().replace('\n', "\n  ")
        ));
    }

    msg
}

pub type Result<T> = std::result::Result<T, VibeError>;
