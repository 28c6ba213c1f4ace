//! Rule extraction from HTML pages
//!
//! Tuned for rule catalog pages such as cursor.directory. Strategies run in order and the
//! first one producing a rule wins:
//!
//! 1. catalog code blocks (`code.text-sm.block`), one rule per block named from the URL
//! 2. any `<code>` element, one rule per element, first line as name
//! 3. the first non-empty content container (`.prose`, `article`, `main`, ...) as one rule
//!
//! Anything beyond "at least one non-empty rule" is best effort.

use super::name_from_source;
use crate::models::{ParsedRule, RuleFormat};
use crate::{Result, VibeError};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

const CATALOG_CODE_SELECTOR: &str = "code.text-sm.block";
const CODE_SELECTOR: &str = "code";
const CONTAINER_SELECTORS: &[&str] = &[
    ".prose",
    ".markdown-body",
    ".content",
    "article",
    ".article",
    "main",
    ".rule-content",
    ".text-content",
];

/// Extract every rule the page offers
///
/// # Errors
///
/// Returns `NotFound` when no strategy yields a rule.
pub fn extract_rules(html: &str, source: &str) -> Result<Vec<ParsedRule>> {
    let document = Html::parse_document(html);

    let catalog = selector(CATALOG_CODE_SELECTOR)?;
    let mut rules = if document.select(&catalog).next().is_some() {
        catalog_rules(&document, &catalog, source)
    } else {
        code_rules(&document, &selector(CODE_SELECTOR)?, source)
    };

    if rules.is_empty() {
        if let Some(rule) = container_rule(&document, source)? {
            rules.push(rule);
        }
    }

    if rules.is_empty() {
        return Err(VibeError::not_found("rules", source));
    }

    debug!(source, count = rules.len(), "extracted rules from html");
    Ok(rules)
}

fn catalog_rules(document: &Html, catalog: &Selector, source: &str) -> Vec<ParsedRule> {
    let name = name_from_source(source);
    document
        .select(catalog)
        .filter_map(|element| {
            let code = element_text(element);
            (!code.is_empty()).then(|| ParsedRule {
                name: name.clone(),
                description: format!("Cursor rule imported from {source}"),
                content: code,
                format: RuleFormat::Text,
                source: source.to_string(),
            })
        })
        .collect()
}

fn code_rules(document: &Html, code: &Selector, source: &str) -> Vec<ParsedRule> {
    let base_name = name_from_source(source);
    document
        .select(code)
        .enumerate()
        .filter_map(|(index, element)| {
            let code = element_text(element);
            if code.is_empty() {
                return None;
            }

            let mut name = if index == 0 {
                base_name.clone()
            } else {
                format!("{base_name}-{}", index_suffix(index))
            };
            let mut description = format!("Imported from {source}");

            let mut lines = code.lines();
            if let Some(first) = lines.next().map(str::trim).filter(|l| !l.is_empty()) {
                name = first.to_string();
                if let Some(second) = lines.next().map(str::trim).filter(|l| !l.is_empty()) {
                    description = second.to_string();
                }
            }

            Some(ParsedRule {
                name,
                description,
                content: code,
                format: RuleFormat::Text,
                source: source.to_string(),
            })
        })
        .collect()
}

fn container_rule(document: &Html, source: &str) -> Result<Option<ParsedRule>> {
    for raw in CONTAINER_SELECTORS {
        let container = selector(raw)?;
        let text = document
            .select(&container)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        if text.is_empty() {
            continue;
        }

        debug!(selector = raw, "using content container");
        return Ok(Some(ParsedRule {
            name: page_title(document)?.unwrap_or_else(|| name_from_source(source)),
            description: format!("Imported from {source}"),
            content: text,
            format: RuleFormat::Text,
            source: source.to_string(),
        }));
    }
    Ok(None)
}

/// `<title>`, else the first `<h1>`
fn page_title(document: &Html) -> Result<Option<String>> {
    for raw in ["title", "h1"] {
        let found = document
            .select(&selector(raw)?)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty());
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// `b` for the second element, `c` for the third, ...
fn index_suffix(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => char::from(b'a' + i).to_string(),
        _ => index.to_string(),
    }
}

fn selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| VibeError::parse("css selector", None, format!("{raw}: {e:?}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use indoc::indoc;

    const SOURCE: &str = "https://cursor.directory/rust-style";

    #[test]
    fn test_catalog_code_blocks() {
        let html = indoc! {r#"
            <html><body>
              <code class="text-sm block">Always use clippy.
            Prefer iterators.</code>
              <code class="text-sm block">   </code>
              <code>ignored generic block</code>
            </body></html>
        "#};

        let rules = extract_rules(html, SOURCE).expect("should extract");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "Rust Style");
        assert_eq!(
            rules[0].description,
            "Cursor rule imported from https://cursor.directory/rust-style"
        );
        assert!(rules[0].content.starts_with("Always use clippy."));
        assert_eq!(rules[0].format, RuleFormat::Text);
    }

    #[test]
    fn test_generic_code_first_line_is_name() {
        let html = indoc! {"
            <html><body>
              <code>Error Handling
            Use thiserror for library errors
            More details</code>
              <code>Logging</code>
            </body></html>
        "};

        let rules = extract_rules(html, SOURCE).expect("should extract");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name, "Error Handling");
        assert_eq!(rules[0].description, "Use thiserror for library errors");
        assert_eq!(rules[1].name, "Logging");
        assert_eq!(rules[1].description, format!("Imported from {SOURCE}"));
    }

    #[test]
    fn test_container_fallback_uses_title() {
        let html = indoc! {"
            <html>
              <head><title>Rust Guide</title></head>
              <body><article><h1>Heading</h1><p>Write tests.</p></article></body>
            </html>
        "};

        let rules = extract_rules(html, SOURCE).expect("should extract");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "Rust Guide");
        assert!(rules[0].content.contains("Write tests."));
    }

    #[test]
    fn test_container_fallback_uses_h1_without_title() {
        let html = "<html><body><main><h1>Main Heading</h1><p>Body</p></main></body></html>";

        let rules = extract_rules(html, SOURCE).expect("should extract");
        assert_eq!(rules[0].name, "Main Heading");
    }

    #[test]
    fn test_container_fallback_uses_url_without_headings() {
        let html = r#"<html><body><div class="prose">Just prose</div></body></html>"#;

        let rules = extract_rules(html, SOURCE).expect("should extract");
        assert_eq!(rules[0].name, "Rust Style");
        assert_eq!(rules[0].content, "Just prose");
    }

    #[test]
    fn test_unstructured_page_is_not_found() {
        let html = "<html><body><div>nothing to see</div></body></html>";

        let err = extract_rules(html, SOURCE).expect_err("should fail");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_index_suffix() {
        assert_eq!(index_suffix(1), "b");
        assert_eq!(index_suffix(25), "z");
        assert_eq!(index_suffix(26), "26");
    }
}
