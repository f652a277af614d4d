//! Document rendering
//!
//! The layout is consumed verbatim by language models and downstream
//! tooling, so delimiters, heading levels and skip markers are fixed:
//!
//! ```text
//! <SYSTEM>...</SYSTEM>
//!
//! # example.com
//!
//! > Format: llms-full-txt/1.0
//! > Site: https://example.com
//! > Generated: 2024-01-01T00:00:00Z
//! > Generator: llms-harvest/0.1.0
//! > Pages: 2
//!
//! ## Table of Contents
//!
//! 1. [Intro](https://example.com/intro)
//! 2. (Skipped) [Gone](https://example.com/gone)
//!
//! ## Pages
//!
//! # Intro
//!
//! URL: https://example.com/intro
//!
//! ...
//!
//! ---
//!
//! # (Skipped) Gone
//!
//! URL: https://example.com/gone
//!
//! > This page was skipped: http-404
//! ```

use super::{FORMAT_VERSION, GENERATOR_NAME, GENERATOR_VERSION};
use crate::crawler::PageResult;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

pub const PAGE_SEPARATOR: &str = "\n\n---\n\n";

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s{0,3})(#{1,6})(\s|$)").expect("valid heading regex"));

/// Renders the final document
pub fn render_document(site_url: &str, pages: &[PageResult], generated_at: DateTime<Utc>) -> String {
    let host = Url::parse(site_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| site_url.to_string());

    let mut blocks = vec![
        format!(
            "<SYSTEM>This document contains the full content of {}, prepared for language model ingestion.</SYSTEM>",
            site_url
        ),
        format!("# {}", host),
        [
            format!("> Format: {}", FORMAT_VERSION),
            format!("> Site: {}", site_url),
            format!(
                "> Generated: {}",
                generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            format!("> Generator: {}/{}", GENERATOR_NAME, GENERATOR_VERSION),
            format!("> Pages: {}", pages.len()),
        ]
        .join("\n"),
        "## Table of Contents".to_string(),
    ];

    if !pages.is_empty() {
        blocks.push(table_of_contents(pages));
    }

    blocks.push("## Pages".to_string());

    if !pages.is_empty() {
        blocks.push(
            pages
                .iter()
                .map(render_page)
                .collect::<Vec<_>>()
                .join(PAGE_SEPARATOR),
        );
    }

    let mut document = blocks.join("\n\n");
    document.push('\n');
    document
}

fn table_of_contents(pages: &[PageResult]) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let prefix = if page.success { "" } else { "(Skipped) " };
            format!(
                "{}. {}[{}]({})",
                i + 1,
                prefix,
                escape_link_text(&page.title),
                page.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_page(page: &PageResult) -> String {
    let title = single_line(&page.title);

    if page.success {
        let body = demote_headings(page.content.trim());
        if body.is_empty() {
            format!("# {}\n\nURL: {}", title, page.url)
        } else {
            format!("# {}\n\nURL: {}\n\n{}", title, page.url, body)
        }
    } else {
        let reason = page
            .skip_reason
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let detail = match &page.error {
            Some(error) if !error.is_empty() => format!(" ({})", single_line(error)),
            _ => String::new(),
        };
        format!(
            "# (Skipped) {}\n\nURL: {}\n\n> This page was skipped: {}{}",
            title, page.url, reason, detail
        )
    }
}

/// Pushes every Markdown heading down one level, leaving fenced code alone
pub fn demote_headings(markdown: &str) -> String {
    let mut fence: Option<String> = None;
    let mut out = Vec::new();

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        let marker = if trimmed.starts_with("```") {
            Some("```")
        } else if trimmed.starts_with("~~~") {
            Some("~~~")
        } else {
            None
        };

        match (&fence, marker) {
            (Some(open), Some(m)) if open == m => {
                fence = None;
                out.push(line.to_string());
            }
            (Some(_), _) => out.push(line.to_string()),
            (None, Some(m)) => {
                fence = Some(m.to_string());
                out.push(line.to_string());
            }
            (None, None) => out.push(demote_line(line)),
        }
    }

    out.join("\n")
}

fn demote_line(line: &str) -> String {
    match HEADING.captures(line) {
        Some(caps) if caps[2].len() < 6 => {
            HEADING.replace(line, "${1}#${2}${3}").into_owned()
        }
        _ => line.to_string(),
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn escape_link_text(text: &str) -> String {
    single_line(text).replace('[', "\\[").replace(']', "\\]")
}
