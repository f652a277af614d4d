//! Markup to text conversion helpers

use scraper::ElementRef;
use regex::Regex;
use std::sync::LazyLock;

static EXTRA_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("valid blank-line regex"));

static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("valid whitespace regex"));

/// Elements that start a new line in visible text
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Converts an HTML fragment to Markdown
///
/// A converter failure yields an empty string so callers fall back to
/// visible text.
pub fn html_to_markdown(html: &str) -> String {
    match htmd::convert(html) {
        Ok(markdown) => collapse_blank_lines(&markdown).trim().to_string(),
        Err(e) => {
            tracing::debug!("Markdown conversion failed: {}", e);
            String::new()
        }
    }
}

/// Replaces runs of two or more blank lines with a single blank line
pub fn collapse_blank_lines(text: &str) -> String {
    EXTRA_BLANK_LINES.replace_all(text, "\n\n").into_owned()
}

/// Plain visible text of an element, one line per block element
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);

    let lines: Vec<String> = raw
        .lines()
        .map(|line| INLINE_SPACE.replace_all(line, " ").trim().to_string())
        .collect();

    collapse_blank_lines(&lines.join("\n")).trim().to_string()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let is_block = BLOCK_ELEMENTS.contains(&element.value().name());
    if is_block {
        out.push('\n');
    }

    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(&text.replace('\n', " "));
        } else if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out);
        }
    }

    if is_block {
        out.push('\n');
    }
}

/// Title of a Markdown document: the first `# ` heading outside fenced code
pub fn markdown_title(markdown: &str) -> Option<String> {
    let mut in_fence = false;
    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(title) = trimmed.strip_prefix("# ") {
            let title = title.trim();
            if !title.is_empty() {
                return Some(title.to_string());
            }
        }
    }
    None
}
