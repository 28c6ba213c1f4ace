//! Data models for canonical rules and agent definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use strum_macros::{Display, EnumString};

/// Version stamped on every rule produced by the normalizer
pub const DEFAULT_RULE_VERSION: &str = "1.0.0";

/// Author recorded for rules that did not come from the web
pub const LOCAL_AUTHOR: &str = "local";

/// Key of the template every normalized rule carries
pub const DEFAULT_TEMPLATE: &str = "default";

/// Content format reported by the format detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RuleFormat {
    Json,
    Html,
    Markdown,
    Mdx,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Named content block within a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub content: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub is_required: bool,
}

/// Canonical, storage-level rule (`<sanitized-name>.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorRule {
    pub metadata: RuleMetadata,
    /// Reserved for future matching; always empty at creation
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub templates: BTreeMap<String, Template>,
}

impl CursorRule {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn default_template(&self) -> Option<&Template> {
        self.templates.get(DEFAULT_TEMPLATE)
    }
}

/// Loosely typed rule produced by a source parser, consumed only by the normalizer
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRule {
    pub name: String,
    pub description: String,
    pub content: String,
    pub format: RuleFormat,
    /// File path or URL the rule came from
    pub source: String,
}

impl ParsedRule {
    /// Normalize into the canonical record
    pub fn to_cursor_rule(&self) -> CursorRule {
        let now = Utc::now();
        let mut templates = BTreeMap::new();
        templates.insert(
            DEFAULT_TEMPLATE.to_string(),
            Template {
                content: self.content.clone(),
                variables: BTreeMap::new(),
                is_required: true,
            },
        );

        CursorRule {
            metadata: RuleMetadata {
                name: self.name.clone(),
                description: self.description.clone(),
                version: DEFAULT_RULE_VERSION.to_string(),
                author: author_for_source(&self.source),
                created_at: now,
                updated_at: now,
            },
            patterns: Vec::new(),
            templates,
        }
    }
}

/// Host of a web source, `"local"` for anything else
fn author_for_source(source: &str) -> String {
    let Some((scheme, rest)) = source.split_once("://") else {
        return LOCAL_AUTHOR.to_string();
    };
    if scheme != "http" && scheme != "https" {
        return LOCAL_AUTHOR.to_string();
    }
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    if host.is_empty() {
        LOCAL_AUTHOR.to_string()
    } else {
        host.to_string()
    }
}

/// One agent persona discovered on disk (`<id>.mdc`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    /// Template file names found under `templates/<id>-*.tmpl`
    pub templates: Vec<String>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(source: &str) -> ParsedRule {
        ParsedRule {
            name: "Rust Style".to_string(),
            description: "How we write Rust".to_string(),
            content: "Prefer iterators.".to_string(),
            format: RuleFormat::Markdown,
            source: source.to_string(),
        }
    }

    #[test]
    fn test_to_cursor_rule_fields() {
        let rule = parsed("/tmp/rust.md").to_cursor_rule();
        assert_eq!(rule.metadata.name, "Rust Style");
        assert_eq!(rule.metadata.description, "How we write Rust");
        assert_eq!(rule.metadata.version, "1.0.0");
        assert_eq!(rule.metadata.author, "local");
        assert_eq!(rule.metadata.created_at, rule.metadata.updated_at);
        assert!(rule.patterns.is_empty());

        let template = rule.default_template().expect("default template");
        assert_eq!(template.content, "Prefer iterators.");
        assert!(template.variables.is_empty());
        assert!(template.is_required);
    }

    #[test]
    fn test_author_from_web_source() {
        let rule = parsed("https://cursor.directory/rust-style").to_cursor_rule();
        assert_eq!(rule.metadata.author, "cursor.directory");

        let rule = parsed("http://user@example.com:8080/x").to_cursor_rule();
        assert_eq!(rule.metadata.author, "example.com");

        let rule = parsed("ftp://example.com/x").to_cursor_rule();
        assert_eq!(rule.metadata.author, "local");
    }

    #[test]
    fn test_rule_format_strings() {
        assert_eq!(RuleFormat::Mdx.to_string(), "mdx");
        assert_eq!("markdown".parse::<RuleFormat>().unwrap(), RuleFormat::Markdown);
        assert!("yaml".parse::<RuleFormat>().is_err());
    }

    #[test]
    fn test_cursor_rule_json_field_names() {
        let rule = parsed("local").to_cursor_rule();
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"created_at\""));
        assert!(json.contains("\"is_required\":true"));
        assert!(json.contains("\"patterns\":[]"));
    }
}
