//! Heuristic content classification.
//!
//! Rules are checked in order and the first match wins:
//! 1. valid JSON object/array
//! 2. HTML document markers
//! 3. markdown headings or fenced code (`mdx` when a fence is tagged `jsx`/`tsx`)
//! 4. plain text

use crate::models::RuleFormat;

/// Matched against lowercased content
const HTML_MARKERS: &[&str] = &["<!doctype html>", "<html", "<body"];

/// Classify raw bytes. Callers must tolerate misclassification.
pub fn detect_format(content: &[u8]) -> RuleFormat {
    let text = String::from_utf8_lossy(content);
    let trimmed = text.trim();

    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
    {
        return RuleFormat::Json;
    }

    let lower = text.to_ascii_lowercase();
    if HTML_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return RuleFormat::Html;
    }

    if has_heading(&text) || text.contains("```") {
        if has_jsx_fence(&text) {
            return RuleFormat::Mdx;
        }
        return RuleFormat::Markdown;
    }

    RuleFormat::Text
}

fn has_heading(text: &str) -> bool {
    text.starts_with("# ")
        || text.starts_with("## ")
        || text.contains("\n# ")
        || text.contains("\n## ")
}

fn has_jsx_fence(text: &str) -> bool {
    text.lines().any(|line| {
        let line = line.trim_start();
        line.strip_prefix("```")
            .map(str::trim)
            .is_some_and(|tag| tag == "jsx" || tag == "tsx")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_object() {
        assert_eq!(detect_format(br#"{"name":"X"}"#), RuleFormat::Json);
    }

    #[test]
    fn test_json_array_with_whitespace() {
        assert_eq!(detect_format(b"\n  [1, 2, 3]\n"), RuleFormat::Json);
    }

    #[test]
    fn test_json_containing_heading_is_still_json() {
        assert_eq!(
            detect_format(br##"{"content":"# Title\n\nbody"}"##),
            RuleFormat::Json
        );
    }

    #[test]
    fn test_broken_json_falls_through() {
        assert_eq!(detect_format(b"{ not json"), RuleFormat::Text);
        assert_eq!(detect_format(b"{ not json\n# Heading"), RuleFormat::Markdown);
    }

    #[test]
    fn test_html() {
        assert_eq!(
            detect_format(b"<!DOCTYPE html><html><body>hi</body></html>"),
            RuleFormat::Html
        );
        assert_eq!(detect_format(b"<body><p>x</p></body>"), RuleFormat::Html);
        assert_eq!(detect_format(b"<!doctype html>\n<p>hi</p>"), RuleFormat::Html);
        assert_eq!(detect_format(b"<HTML><BODY>hi</BODY></HTML>"), RuleFormat::Html);
    }

    #[test]
    fn test_markdown() {
        assert_eq!(detect_format(b"# Title\n\nSome body"), RuleFormat::Markdown);
        assert_eq!(detect_format(b"intro\n## Section\ntext"), RuleFormat::Markdown);
        assert_eq!(detect_format(b"text\n```rust\nfn x() {}\n```"), RuleFormat::Markdown);
    }

    #[test]
    fn test_mdx() {
        assert_eq!(
            detect_format(b"# Component\n\n```tsx\n<Button />\n```"),
            RuleFormat::Mdx
        );
        assert_eq!(detect_format(b"```jsx\n<App />\n```"), RuleFormat::Mdx);
    }

    #[test]
    fn test_text() {
        assert_eq!(detect_format(b"just a line\nand another"), RuleFormat::Text);
        assert_eq!(detect_format(b""), RuleFormat::Text);
        assert_eq!(detect_format(b"#hashtag not heading"), RuleFormat::Text);
    }
}
