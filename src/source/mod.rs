//! Rule sources: local files, web pages, and the composite that falls back between them
//!
//! Every source turns one location into canonical [`CursorRule`]s. Sources that find nothing
//! fail with a not-found error instead of returning an empty list.
//!
//! # Adding a source
//!
//! ```rust,ignore
//! pub struct GistSource;
//!
//! impl RuleSource for GistSource {
//!     fn parse_all(&self, location: &str) -> Result<Vec<CursorRule>> {
//!         // fetch, extract, normalize
//!         todo!()
//!     }
//!
//!     fn parse_content(&self, content: &[u8]) -> Result<CursorRule> {
//!         todo!()
//!     }
//! }
//! ```

use crate::models::CursorRule;
use crate::{Result, VibeError};
use std::path::Path;
use std::time::Duration;

mod composite;
mod file;
pub mod html;
mod web;

pub use composite::CompositeRuleParser;
pub use file::FileRuleParser;
pub use web::WebRuleParser;

/// Identifier used as the source of content passed in memory
pub const INLINE_SOURCE: &str = "inline-content";

/// Limits shared by all rule sources
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub http_timeout: Duration,
    /// Largest accepted HTTP response body, in bytes
    pub max_response_size: u64,
    /// Largest accepted local file, in bytes
    pub max_file_size: u64,
    pub user_agent: String,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment
    pub use_env_proxy: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            max_response_size: 10 * 1024 * 1024,
            max_file_size: 10 * 1024 * 1024,
            user_agent: concat!("vibe/", env!("CARGO_PKG_VERSION")).to_string(),
            use_env_proxy: true,
        }
    }
}

/// A place rules can be read from
pub trait RuleSource {
    /// Every rule found at `location`, normalized
    ///
    /// # Errors
    ///
    /// Returns a not-found error when the location holds no recognizable rule.
    fn parse_all(&self, location: &str) -> Result<Vec<CursorRule>>;

    /// Interpret raw bytes that did not come from a location
    fn parse_content(&self, content: &[u8]) -> Result<CursorRule>;

    /// The first rule found at `location`
    fn parse(&self, location: &str) -> Result<CursorRule> {
        self.parse_all(location)?
            .into_iter()
            .next()
            .ok_or_else(|| VibeError::not_found("rules", location))
    }
}

/// `http://` or `https://` location
pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Display name derived from the last path segment of a file path or URL
///
/// `https://cursor.directory/rust-best_practices` becomes `Rust Best Practices`.
pub fn name_from_source(source: &str) -> String {
    let last = source
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let last = last.split(['?', '#']).next().unwrap_or_default();
    let stem = Path::new(last)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(last);

    let name = to_title(&stem.replace(['-', '_'], " "));
    if name.is_empty() {
        "Imported Rule".to_string()
    } else {
        name
    }
}

/// Capitalize each whitespace-separated word, lower-casing the rest
pub fn to_title(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
