//! Rules from local files

use super::{html, name_from_source, ParserConfig, RuleSource, INLINE_SOURCE};
use crate::format::detect_format;
use crate::models::{CursorRule, ParsedRule, RuleFormat};
use crate::parser::{parse_document, DefinitionFrontmatter};
use crate::security::validate_local_rule_path;
use crate::{Result, VibeError};
use fs_err as fs;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

const FILE_RULE_DESCRIPTION: &str = "File-based rule";

/// Reads a rule file, detects its format and extracts rules from it
#[derive(Debug, Clone, Default)]
pub struct FileRuleParser {
    config: ParserConfig,
}

/// Loose JSON shape accepted besides a full [`CursorRule`]
#[derive(Debug, Deserialize)]
struct LooseRule {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

impl FileRuleParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Read `path` after validating it and checking its size
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let file = Path::new(path);
        validate_local_rule_path(file)?;

        let metadata = match fs::metadata(file) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VibeError::not_found("rule file", path));
            }
            Err(e) => return Err(VibeError::operation("stat rule file", file, e)),
        };

        if !metadata.is_file() {
            return Err(VibeError::validation(
                "path",
                format!("'{path}' is not a regular file"),
            ));
        }

        if metadata.len() > self.config.max_file_size {
            return Err(VibeError::validation(
                "size",
                format!(
                    "file too large: {} bytes (max {})",
                    metadata.len(),
                    self.config.max_file_size
                ),
            ));
        }

        let content = fs::read(file).map_err(|e| VibeError::operation("read rule file", file, e))?;
        debug!(path, size = content.len(), "read rule file");
        Ok(content)
    }
}

impl RuleSource for FileRuleParser {
    fn parse_all(&self, location: &str) -> Result<Vec<CursorRule>> {
        let content = self.read(location)?;
        extract_rules(&content, location)
    }

    /// A JSON [`CursorRule`] is taken verbatim; anything else is freeform text
    fn parse_content(&self, content: &[u8]) -> Result<CursorRule> {
        if let Some(rule) = full_rule(content)? {
            return Ok(rule);
        }

        let text = String::from_utf8_lossy(content);
        Ok(text_rule(&text, INLINE_SOURCE)?.to_cursor_rule())
    }
}

/// Dispatch on the detected format and normalize what comes out
fn extract_rules(content: &[u8], source: &str) -> Result<Vec<CursorRule>> {
    let format = detect_format(content);
    debug!(source, %format, "detected rule format");

    if format == RuleFormat::Json {
        if let Some(rule) = full_rule(content)? {
            return Ok(vec![rule]);
        }
    }

    let text = String::from_utf8_lossy(content);
    let parsed = match format {
        RuleFormat::Json => match loose_rules(content, source) {
            Some(rules) => rules,
            None => vec![text_rule(&text, source)?],
        },
        RuleFormat::Html => html::extract_rules(&text, source)?,
        RuleFormat::Markdown | RuleFormat::Mdx => vec![markdown_rule(&text, source, format)?],
        RuleFormat::Text => vec![text_rule(&text, source)?],
    };

    if parsed.is_empty() {
        return Err(VibeError::not_found("rules", source));
    }
    Ok(parsed.iter().map(ParsedRule::to_cursor_rule).collect())
}

/// A serialized [`CursorRule`], if `content` is one
///
/// A rule record with an empty name is rejected rather than treated as text.
fn full_rule(content: &[u8]) -> Result<Option<CursorRule>> {
    let Ok(rule) = serde_json::from_slice::<CursorRule>(content) else {
        return Ok(None);
    };
    if rule.metadata.name.trim().is_empty() {
        return Err(VibeError::validation("metadata.name", "name is required"));
    }
    Ok(Some(rule))
}

/// `{name, description?, content?}` objects, alone or in an array
fn loose_rules(content: &[u8], source: &str) -> Option<Vec<ParsedRule>> {
    let value: serde_json::Value = serde_json::from_slice(content).ok()?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    let rules: Vec<ParsedRule> = items
        .into_iter()
        .filter_map(|item| {
            let raw = serde_json::to_string_pretty(&item).ok()?;
            let loose: LooseRule = serde_json::from_value(item).ok()?;
            if loose.name.trim().is_empty() {
                return None;
            }
            Some(ParsedRule {
                name: loose.name,
                description: loose
                    .description
                    .unwrap_or_else(|| format!("Imported from {source}")),
                content: loose.content.unwrap_or(raw),
                format: RuleFormat::Json,
                source: source.to_string(),
            })
        })
        .collect();

    (!rules.is_empty()).then_some(rules)
}

/// Frontmatter name, else first `# ` heading, else the file name
///
/// Description comes from frontmatter or the first paragraph line.
fn markdown_rule(text: &str, source: &str, format: RuleFormat) -> Result<ParsedRule> {
    let doc = parse_document::<DefinitionFrontmatter>(text, Some(source))?;
    let frontmatter = doc.frontmatter.unwrap_or_default();

    let heading = doc
        .body
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty());

    let paragraph = doc
        .body
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("```"))
        .map(ToString::to_string);

    let content = doc.body.trim().to_string();
    if content.is_empty() {
        return Err(VibeError::validation("content", "rule content cannot be empty"));
    }

    Ok(ParsedRule {
        name: frontmatter
            .name
            .or(heading)
            .unwrap_or_else(|| name_from_source(source)),
        description: frontmatter
            .description
            .or(paragraph)
            .unwrap_or_else(|| format!("Imported from {source}")),
        content,
        format,
        source: source.to_string(),
    })
}

/// First line is the name, second line the description
fn text_rule(text: &str, source: &str) -> Result<ParsedRule> {
    let text = text.trim();
    if text.is_empty() {
        return Err(VibeError::validation("content", "rule content cannot be empty"));
    }

    let mut lines = text.lines();
    let name = lines.next().unwrap_or_default().trim().to_string();
    let description = lines
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(FILE_RULE_DESCRIPTION)
        .to_string();

    Ok(ParsedRule {
        name,
        description,
        content: text.to_string(),
        format: RuleFormat::Text,
        source: source.to_string(),
    })
}
