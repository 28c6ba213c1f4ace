//! Rules from web pages
//!
//! One GET per location. The body is always treated as HTML since remote rule catalogs are
//! web pages, whatever the format detector would say.

use super::{html, is_url, ParserConfig, RuleSource, INLINE_SOURCE};
use crate::cancel::Cancellation;
use crate::models::{CursorRule, ParsedRule};
use crate::{Result, VibeError};
use reqwest::blocking::Client;
use std::io::Read;
use tracing::{debug, info};

/// Fetches a URL and extracts rules from the returned HTML
#[derive(Debug, Clone)]
pub struct WebRuleParser {
    client: Client,
    config: ParserConfig,
    cancel: Cancellation,
}

impl WebRuleParser {
    pub fn new(config: ParserConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout);
        if !config.use_env_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            config,
            cancel: Cancellation::new(),
        })
    }

    /// Abort before or after the request once `cancel` fires
    #[must_use]
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Download `url` and extract every rule on the page
    pub fn fetch_rules(&self, url: &str) -> Result<Vec<ParsedRule>> {
        let body = self.fetch(url)?;
        html::extract_rules(&String::from_utf8_lossy(&body), url)
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if !is_url(url) {
            return Err(VibeError::validation("url", "invalid URL format"));
        }
        self.cancel.check("fetch")?;

        info!(url, "fetching rules");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| VibeError::operation("fetch", url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VibeError::operation(
                "fetch",
                url,
                VibeError::Other(format!("HTTP {status}")),
            ));
        }

        let max = self.config.max_response_size;
        if let Some(length) = response.content_length() {
            if length > max {
                return Err(too_large(max));
            }
        }

        // one byte past the limit tells an exact fit apart from an overflow
        let mut body = Vec::new();
        response
            .take(max.saturating_add(1))
            .read_to_end(&mut body)
            .map_err(|e| VibeError::operation("read response body", url, e))?;
        if body.len() as u64 > max {
            return Err(too_large(max));
        }

        self.cancel.check("fetch")?;
        debug!(url, size = body.len(), "fetched response");
        Ok(body)
    }
}

fn too_large(max: u64) -> VibeError {
    VibeError::validation("size", format!("response too large (max {max} bytes)"))
}

impl RuleSource for WebRuleParser {
    fn parse_all(&self, location: &str) -> Result<Vec<CursorRule>> {
        Ok(self
            .fetch_rules(location)?
            .iter()
            .map(ParsedRule::to_cursor_rule)
            .collect())
    }

    /// Treat `content` as an already-downloaded page
    fn parse_content(&self, content: &[u8]) -> Result<CursorRule> {
        let rules = html::extract_rules(&String::from_utf8_lossy(content), INLINE_SOURCE)
            .map_err(|e| VibeError::operation("parse content", INLINE_SOURCE, e))?;
        rules
            .first()
            .map(ParsedRule::to_cursor_rule)
            .ok_or_else(|| VibeError::not_found("rules", INLINE_SOURCE))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    /// Serve a single HTTP response on a random local port
    fn serve_once(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0_u8; 4096];
                let _ = stream.read(&mut request);
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/rust-style")
    }

    fn parser(config: ParserConfig) -> WebRuleParser {
        WebRuleParser::new(ParserConfig {
            use_env_proxy: false,
            ..config
        })
        .expect("client should build")
    }

    #[test]
    fn test_fetch_and_extract() {
        let url = serve_once(
            "200 OK",
            r#"<html><body><code class="text-sm block">Prefer iterators</code></body></html>"#
                .to_string(),
        );

        let rule = parser(ParserConfig::default()).parse(&url).expect("should parse");
        assert_eq!(rule.metadata.name, "Rust Style");
        assert_eq!(rule.metadata.author, "127.0.0.1");
        assert_eq!(rule.default_template().unwrap().content, "Prefer iterators");
    }

    #[test]
    fn test_non_success_status_is_operational() {
        let url = serve_once("404 Not Found", "missing".to_string());

        let err = parser(ParserConfig::default()).parse(&url).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Operational);
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_response_size_cap() {
        let url = serve_once("200 OK", format!("<main>{}</main>", "x".repeat(200)));
        let parser = parser(ParserConfig {
            max_response_size: 64,
            ..ParserConfig::default()
        });

        match parser.parse(&url) {
            Err(VibeError::Validation { field, .. }) => assert_eq!(field, "size"),
            other => unreachable!("Expected size validation error, got: {other:?}"),
        }
    }

    #[test]
    fn test_page_without_rules_is_not_found() {
        let url = serve_once("200 OK", "<html><body><div>empty</div></body></html>".to_string());

        let err = parser(ParserConfig::default()).parse(&url).expect_err("should fail");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let err = parser(ParserConfig::default())
            .parse("ftp://example.com/rule")
            .expect_err("should fail");
        assert!(matches!(err, VibeError::Validation { .. }));
    }

    #[test]
    fn test_cancelled_before_request() {
        let cancel = Cancellation::new();
        cancel.cancel();
        let parser = parser(ParserConfig::default()).with_cancellation(cancel);

        let err = parser
            .parse("http://127.0.0.1:9/never-contacted")
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_parse_content_treats_bytes_as_html() {
        let rule = parser(ParserConfig::default())
            .parse_content(b"<html><body><code>Inline Rule\nsecond</code></body></html>")
            .expect("should parse");
        assert_eq!(rule.metadata.name, "Inline Rule");
        assert_eq!(rule.metadata.description, "second");
    }
}
