//! Readability-style main content detection
//!
//! Paragraph-like elements award points to their parent and grandparent
//! containers based on text length and comma count. Containers start from a
//! tag and class/id bias, and their final score is scaled down by link
//! density. The best container wins if it carries enough text.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Minimum characters for a paragraph to count
const MIN_PARAGRAPH_CHARS: usize = 25;

/// Minimum characters for the winning container
const MIN_CONTENT_CHARS: usize = 140;

static POSITIVE_HINTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)article|body|content|entry|main|page|post|text|blog|story|docs|markdown|prose")
        .expect("valid positive hint regex")
});

static NEGATIVE_HINTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)comment|footer|footnote|masthead|meta|nav|sidebar|sponsor|share|promo|related|menu|banner|breadcrumb|cookie|toc",
    )
    .expect("valid negative hint regex")
});

static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("p, pre, td, blockquote").expect("valid paragraph selector")
});

static LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").expect("valid selector"));

/// Finds the element most likely to hold the main content
pub fn find_main_content(document: &Html) -> Option<ElementRef<'_>> {
    let mut candidates = HashMap::new();

    for paragraph in document.root_element().select(&PARAGRAPHS) {
        let text = paragraph.text().collect::<String>();
        let length = text.trim().chars().count();
        if length < MIN_PARAGRAPH_CHARS {
            continue;
        }

        let commas = text.matches(',').count();
        let score = 1.0 + commas as f64 + (length / 100).min(3) as f64;

        let Some(parent) = paragraph.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        candidates
            .entry(parent.id())
            .or_insert_with(|| (parent, initial_score(parent)))
            .1 += score;

        if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
            candidates
                .entry(grandparent.id())
                .or_insert_with(|| (grandparent, initial_score(grandparent)))
                .1 += score / 2.0;
        }
    }

    let best = candidates
        .into_values()
        .map(|(element, score)| (element, score * (1.0 - link_density(element))))
        .filter(|(element, _)| !matches!(element.value().name(), "html" | "body"))
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    let text_chars: usize = best.0.text().map(|t| t.trim().chars().count()).sum();
    if text_chars < MIN_CONTENT_CHARS {
        tracing::trace!("Readability candidate too short ({} chars)", text_chars);
        return None;
    }

    Some(best.0)
}

fn initial_score(element: ElementRef<'_>) -> f64 {
    let tag_bias = match element.value().name() {
        "article" | "main" => 10.0,
        "div" | "section" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };
    tag_bias + class_weight(element)
}

fn class_weight(element: ElementRef<'_>) -> f64 {
    let mut weight = 0.0;
    for value in [element.value().attr("class"), element.value().attr("id")]
        .into_iter()
        .flatten()
    {
        if NEGATIVE_HINTS.is_match(value) {
            weight -= 25.0;
        }
        if POSITIVE_HINTS.is_match(value) {
            weight += 25.0;
        }
    }
    weight
}

/// Share of an element's text that sits inside links
fn link_density(element: ElementRef<'_>) -> f64 {
    let total: usize = element.text().map(|t| t.chars().count()).sum();
    if total == 0 {
        return 0.0;
    }
    let linked: usize = element
        .select(&LINKS)
        .flat_map(|a| a.text())
        .map(|t| t.chars().count())
        .sum();
    (linked as f64 / total as f64).min(1.0)
}
