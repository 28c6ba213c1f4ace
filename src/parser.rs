//! Optional YAML frontmatter on markdown-like documents
//!
//! Agent definitions and imported markdown may open with a YAML block between `---`
//! delimiters. The block is optional; documents without one parse to `frontmatter: None`.
//!
//! Example:
//! ```text
//! ---
//! description: "Reviews pull requests"
//! version: "2.1"
//! ---
//!
//! # Code Reviewer
//! ```

use crate::{Result, VibeError};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Document split into optional frontmatter and markdown body
#[derive(Debug, Clone, PartialEq)]
pub struct Document<T> {
    pub frontmatter: Option<T>,
    pub body: String,
    /// 1-based line number where `body` starts in the original text
    pub body_line: usize,
}

/// Fields vibe reads from definition or markdown frontmatter
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DefinitionFrontmatter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "type")]
    pub agent_type: Option<String>,
}

/// Parse a document whose frontmatter, if present, must deserialize into `T`
///
/// # Arguments
/// * `content` - The file content to parse
/// * `filename` - Optional filename for better error messages
pub fn parse_document<T: DeserializeOwned>(
    content: &str,
    filename: Option<&str>,
) -> Result<Document<T>> {
    let Some((yaml, body, body_line)) = split_frontmatter(content, filename)? else {
        return Ok(Document {
            frontmatter: None,
            body: content.to_string(),
            body_line: 1,
        });
    };

    // An empty block (`---\n---`) carries no fields
    if yaml.trim().is_empty() {
        return Ok(Document {
            frontmatter: None,
            body,
            body_line,
        });
    }

    let frontmatter: T = serde_yaml::from_str(&yaml).map_err(|e| {
        // frontmatter starts on line 2, after the opening delimiter
        let line = e.location().map(|loc| 1 + loc.line());
        VibeError::parse(filename.unwrap_or("unknown"), line, e)
    })?;

    Ok(Document {
        frontmatter: Some(frontmatter),
        body,
        body_line,
    })
}

/// Split frontmatter from markdown content
///
/// Returns `None` when the content does not open with `---`, otherwise
/// `(frontmatter_yaml, markdown_body, body_line)`.
fn split_frontmatter(
    content: &str,
    filename: Option<&str>,
) -> Result<Option<(String, String, usize)>> {
    let leading = content.len() - content.trim_start().len();
    let skipped_lines = content[..leading].matches('\n').count();
    let content = content.trim_start();

    let Some(after_first) = content.strip_prefix("---") else {
        return Ok(None);
    };
    // `----` or `--- title` is a horizontal rule, not a delimiter
    if !(after_first.starts_with('\n') || after_first.starts_with("\r\n")) {
        return Ok(None);
    }

    let Some(end_pos) = after_first.find("\n---") else {
        return Err(VibeError::parse(
            filename.unwrap_or("unknown"),
            Some(skipped_lines + 1),
            "frontmatter opened with `---` but never closed",
        ));
    };

    let frontmatter = after_first[..end_pos].trim().to_string();
    let rest = &after_first[end_pos + 4..];
    // drop the remainder of the closing delimiter line
    let rest = rest.split_once('\n').map_or("", |(_, tail)| tail);

    let consumed = &content[..content.len() - rest.len()];
    let body_line = skipped_lines + consumed.matches('\n').count() + 1;

    Ok(Some((frontmatter, rest.to_string(), body_line)))
}
