//! File-first parsing with a web fallback

use super::{is_url, FileRuleParser, ParserConfig, RuleSource, WebRuleParser, INLINE_SOURCE};
use crate::cancel::Cancellation;
use crate::models::CursorRule;
use crate::{Result, VibeError};
use tracing::debug;

/// Routes a location to the file or web parser
///
/// `http(s)://` goes straight to the web. Everything else is tried as a file first; only
/// when that fails and the location still looks like a URL (`://`) is the web tried, so a
/// plain relative path never reaches the network.
#[derive(Debug, Clone)]
pub struct CompositeRuleParser {
    file: FileRuleParser,
    web: WebRuleParser,
}

impl CompositeRuleParser {
    pub fn new(config: ParserConfig) -> Result<Self> {
        Ok(Self {
            file: FileRuleParser::new(config.clone()),
            web: WebRuleParser::new(config)?,
        })
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.web = self.web.with_cancellation(cancel);
        self
    }
}

impl RuleSource for CompositeRuleParser {
    fn parse_all(&self, location: &str) -> Result<Vec<CursorRule>> {
        debug!(location, "parsing rules");

        if is_url(location) {
            return self.web.parse_all(location);
        }

        let file_err = match self.file.parse_all(location) {
            Ok(rules) => return Ok(rules),
            Err(e) => e,
        };

        if !location.contains("://") {
            return Err(file_err);
        }

        debug!(location, error = %file_err, "file parser failed, trying web");
        self.web
            .parse_all(location)
            .map_err(|web_err| VibeError::ParsersExhausted {
                path: location.to_string(),
                file: Box::new(file_err),
                web: Box::new(web_err),
            })
    }

    fn parse_content(&self, content: &[u8]) -> Result<CursorRule> {
        debug!(size = content.len(), "parsing content");

        let file_err = match self.file.parse_content(content) {
            Ok(rule) => return Ok(rule),
            Err(e) => e,
        };

        self.web
            .parse_content(content)
            .map_err(|web_err| VibeError::ParsersExhausted {
                path: INLINE_SOURCE.to_string(),
                file: Box::new(file_err),
                web: Box::new(web_err),
            })
    }
}
