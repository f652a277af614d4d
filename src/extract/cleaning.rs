//! Cleanup pass for framework-flavoured Markdown (MDX, Docusaurus, Nextra)
//!
//! Markdown tables and fenced code blocks are preserved verbatim: the text is
//! split into preserved and prose segments and the stripping rules only see
//! prose.

use super::markdown::collapse_blank_lines;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static FRONT_MATTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A\s*---\r?\n(?s:.*?)\r?\n---[ \t]*(?:\r?\n|\z)").expect("valid front matter regex"));

static JSX_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{/\*.*?\*/\}").expect("valid jsx comment regex"));

static HTML_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid html comment regex"));

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break regex"));

static FAQ_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<FAQItem\s+question\s*=\s*(?:"([^"]*)"|'([^']*)')\s*>(.*?)</FAQItem>"#)
        .expect("valid faq regex")
});

static IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+(?:[^;\n]*?\s+from\s+)?['"][^'"\n]+['"];?[ \t]*$"#)
        .expect("valid import regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[A-Za-z][A-Za-z0-9.\-]*(?:\s[^<>]*)?/?>").expect("valid tag regex")
});

static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid image regex"));

/// Cleans extracted or source Markdown
///
/// # Example
///
/// ```
/// use llms_harvest::extract::clean_content;
///
/// let mdx = "import Tabs from '@theme/Tabs';\n\n# Intro\n\n<Tabs>Hello</Tabs>";
/// assert_eq!(clean_content(mdx, false), "# Intro\n\nHello");
/// ```
pub fn clean_content(text: &str, strip_images: bool) -> String {
    let text = FRONT_MATTER.replace(text, "");

    let cleaned: Vec<String> = segments(&text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Preserved(lines) => lines,
            Segment::Prose(lines) => clean_prose(&lines, strip_images),
        })
        .collect();

    collapse_blank_lines(&cleaned.join("\n")).trim().to_string()
}

fn clean_prose(text: &str, strip_images: bool) -> String {
    let text = JSX_COMMENT.replace_all(text, "");
    let text = HTML_COMMENT.replace_all(&text, "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = FAQ_ITEM.replace_all(&text, |caps: &Captures| {
        let question = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        let answer = caps.get(3).map_or("", |m| m.as_str());
        format!("Question: {}\nAnswer: {}", question.trim(), answer.trim())
    });
    let text = IMPORT_LINE.replace_all(&text, "");
    let text = TAG.replace_all(&text, "");

    if strip_images {
        IMAGE.replace_all(&text, "").into_owned()
    } else {
        text.into_owned()
    }
}

#[derive(Debug, PartialEq)]
enum Segment {
    /// Table rows or a fenced code block, kept as-is
    Preserved(String),
    Prose(String),
}

fn segments(text: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_preserved = false;
    let mut fence: Option<&str> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();

        let preserved = if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            true
        } else if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            fence = Some(&trimmed[..3]);
            true
        } else {
            trimmed.starts_with('|')
        };

        if preserved != current_preserved && !current.is_empty() {
            out.push(make_segment(current_preserved, &current));
            current.clear();
        }
        current_preserved = preserved;
        current.push(line);
    }

    if !current.is_empty() {
        out.push(make_segment(current_preserved, &current));
    }
    out
}

fn make_segment(preserved: bool, lines: &[&str]) -> Segment {
    let joined = lines.join("\n");
    if preserved {
        Segment::Preserved(joined)
    } else {
        Segment::Prose(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_matter_removed() {
        let text = "---\ntitle: Setup\nsidebar_position: 2\n---\n\n# Setup\n\nBody";
        assert_eq!(clean_content(text, false), "# Setup\n\nBody");
    }

    #[test]
    fn test_horizontal_rule_is_not_front_matter() {
        let text = "# Title\n\n---\n\nMore";
        assert_eq!(clean_content(text, false), "# Title\n\n---\n\nMore");
    }

    #[test]
    fn test_comments_and_line_breaks() {
        let text = "One{/* hidden */}<br/>Two<!-- note -->\nThree<BR>Four";
        assert_eq!(clean_content(text, false), "One\nTwo\nThree\nFour");
    }

    #[test]
    fn test_faq_items() {
        let text = r#"<FAQItem question="Is it free?">
Yes, forever.
</FAQItem>"#;
        assert_eq!(
            clean_content(text, false),
            "Question: Is it free?\nAnswer: Yes, forever."
        );
    }

    #[test]
    fn test_import_statements_removed() {
        let text = "import Tabs from '@theme/Tabs';\nimport \"./styles.css\";\nText stays";
        assert_eq!(clean_content(text, false), "Text stays");
    }

    #[test]
    fn test_tables_preserved() {
        let text = "<Note>Intro</Note>\n\n| a | <b>b</b> |\n|---|---|\n| 1 | 2 |\n\n<Note>Outro</Note>";
        assert_eq!(
            clean_content(text, false),
            "Intro\n\n| a | <b>b</b> |\n|---|---|\n| 1 | 2 |\n\nOutro"
        );
    }

    #[test]
    fn test_code_fences_preserved() {
        let text = "```tsx\nimport React from 'react';\n<App />\n```\n<Callout>Done</Callout>";
        assert_eq!(
            clean_content(text, false),
            "```tsx\nimport React from 'react';\n<App />\n```\nDone"
        );
    }

    #[test]
    fn test_images_optional() {
        let text = "See ![diagram](/img/a.png) here";
        assert_eq!(clean_content(text, false), text);
        assert_eq!(clean_content(text, true), "See  here");
    }

    #[test]
    fn test_autolinks_survive() {
        let text = "Visit <https://example.com> today";
        assert_eq!(clean_content(text, false), text);
    }
}
