//! Per-page crawl results

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Why a page was not included successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Non-2xx HTTP response
    HttpStatus(u16),
    /// Response was not HTML
    ContentType,
    /// Body exceeded the raw size ceiling
    TooLarge,
    /// Fetching or extraction failed
    ParseError,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpStatus(status) => write!(f, "http-{}", status),
            Self::ContentType => f.write_str("content-type"),
            Self::TooLarge => f.write_str("too-large"),
            Self::ParseError => f.write_str("parse-error"),
        }
    }
}

impl Serialize for SkipReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One attempted page
///
/// `content_length` always equals the character count of `content`; use
/// [`PageResult::set_content`] or [`PageResult::truncate_to`] to change it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub url: String,
    pub title: String,
    pub content: String,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub content_length: usize,
    pub last_modified: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub status_code: Option<u16>,
    pub skip_reason: Option<SkipReason>,
    pub truncated: bool,
    pub original_length: Option<usize>,
}

impl PageResult {
    /// A successfully extracted page
    pub fn extracted(url: impl Into<String>, title: impl Into<String>, content: String) -> Self {
        let content_length = content.chars().count();
        Self {
            url: url.into(),
            title: title.into(),
            content,
            success: true,
            error: None,
            timestamp: Utc::now(),
            content_length,
            last_modified: None,
            language: None,
            status_code: None,
            skip_reason: None,
            truncated: false,
            original_length: None,
        }
    }

    /// A page that was attempted but not included; content stays empty
    pub fn skipped(url: impl Into<String>, reason: SkipReason, error: Option<String>) -> Self {
        let url = url.into();
        Self {
            title: url.clone(),
            url,
            content: String::new(),
            success: false,
            error,
            timestamp: Utc::now(),
            content_length: 0,
            last_modified: None,
            language: None,
            status_code: None,
            skip_reason: Some(reason),
            truncated: false,
            original_length: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_last_modified(mut self, last_modified: Option<DateTime<Utc>>) -> Self {
        self.last_modified = last_modified;
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    /// Replaces the content and keeps `content_length` in sync
    pub fn set_content(&mut self, content: String) {
        self.content_length = content.chars().count();
        self.content = content;
    }

    /// Clamps the content to `limit` characters, marker included
    ///
    /// Returns true when the page was truncated. After truncation the
    /// content is always strictly shorter than `original_length`.
    pub fn truncate_to(&mut self, limit: usize) -> bool {
        let original = self.content_length;
        if original <= limit {
            return false;
        }

        let marker = format!(
            "\n\n[Content truncated: page exceeded {} characters (original length: {})]",
            limit, original
        );
        let marker_len = marker.chars().count();

        let content = if marker_len < limit {
            let mut kept: String = self.content.chars().take(limit - marker_len).collect();
            kept.push_str(&marker);
            kept
        } else {
            self.content.chars().take(limit).collect()
        };

        self.set_content(content);
        self.truncated = true;
        self.original_length = Some(original);
        true
    }
}
