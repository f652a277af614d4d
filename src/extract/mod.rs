//! Content extraction
//!
//! Turns a fetched HTML page into Markdown-like text. Script, style,
//! noscript and template elements are always removed first, followed by the
//! configured strip selectors.
//!
//! In multi-method mode the extractor walks a fixed chain of strategies and
//! keeps the first result longer than [`MIN_CONTENT_CHARS`]:
//!
//! 1. Readability-style main content detection (if enabled)
//! 2. Semantic containers (`main`, `article`, ...)
//! 3. Documentation content classes (`.markdown-body`, `.prose`, ...)
//! 4. Page metadata (meta description, Open Graph, JSON-LD)
//! 5. Visible text with navigation chrome removed
//!
//! Extraction never fails: when every strategy comes up short the page gets
//! [`NO_CONTENT_PLACEHOLDER`].

mod cleaning;
mod markdown;
mod readability;

pub use cleaning::clean_content;
pub use markdown::{collapse_blank_lines, html_to_markdown, markdown_title, visible_text};
pub use readability::find_main_content;

use crate::config::GenerateOptions;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Strategy output must be longer than this (trimmed characters)
pub const MIN_CONTENT_CHARS: usize = 50;

pub const NO_CONTENT_PLACEHOLDER: &str = "No content could be extracted from this page.";

/// Always removed before extraction
const ALWAYS_STRIPPED: &str = "script, style, noscript, template";

const SEMANTIC_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    ".main-content",
    "#main-content",
    ".content",
    "#content",
];

const DOCUMENTATION_SELECTORS: &[&str] = &[
    ".markdown",
    ".markdown-body",
    ".docs-content",
    ".documentation",
    ".prose",
    ".post-content",
    ".entry-content",
    ".page-content",
    ".theme-doc-markdown",
];

const CHROME_SELECTORS: &str =
    "nav, header, footer, aside, .sidebar, .navigation, .menu, .breadcrumb";

/// Which strategy produced the content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Readability,
    Body,
    Semantic,
    Documentation,
    Metadata,
    VisibleText,
    Placeholder,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Readability => "readability",
            Self::Body => "body",
            Self::Semantic => "semantic",
            Self::Documentation => "documentation",
            Self::Metadata => "metadata",
            Self::VisibleText => "visible-text",
            Self::Placeholder => "placeholder",
        };
        f.write_str(name)
    }
}

/// Result of extracting one page
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub title: String,
    pub content: String,
    pub language: Option<String>,
    pub method: ExtractionMethod,
}

/// Extraction switches taken from [`GenerateOptions`]
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub strip_selectors: Vec<String>,
    pub use_readability: bool,
    pub multi_method: bool,
    pub clean: bool,
    pub strip_images: bool,
}

impl ExtractOptions {
    pub fn from_options(options: &GenerateOptions) -> Self {
        Self {
            strip_selectors: options.strip_selectors.clone(),
            use_readability: options.use_readability,
            multi_method: options.multi_method_extraction,
            clean: options.clean_content,
            strip_images: options.strip_images,
        }
    }
}

/// Why a strategy produced nothing
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("strategy disabled")]
    Disabled,

    #[error("no matching element")]
    NoMatch,

    #[error("content too short ({0} chars)")]
    TooShort(usize),
}

/// Everything a strategy may look at
pub struct ExtractionInput<'a> {
    pub document: &'a Html,
    pub metadata: &'a PageMetadata,
    pub use_readability: bool,
}

/// A single extraction strategy
pub type Strategy = fn(&ExtractionInput<'_>) -> Result<String, StrategyError>;

/// The fallback chain, in priority order
pub const STRATEGIES: &[(ExtractionMethod, Strategy)] = &[
    (ExtractionMethod::Readability, readability_strategy),
    (ExtractionMethod::Semantic, semantic_strategy),
    (ExtractionMethod::Documentation, documentation_strategy),
    (ExtractionMethod::Metadata, metadata_strategy),
    (ExtractionMethod::VisibleText, visible_text_strategy),
];

/// Descriptive metadata gathered before scripts are stripped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub description: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    /// `description`, `text` and `articleBody` values from JSON-LD blocks
    pub json_ld: Vec<String>,
}

impl PageMetadata {
    pub fn collect(document: &Html) -> Self {
        let mut json_ld = Vec::new();
        if let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) {
            for script in document.root_element().select(&selector) {
                let raw = script.text().collect::<String>();
                match serde_json::from_str::<Value>(&raw) {
                    Ok(value) => collect_json_ld_text(&value, &mut json_ld),
                    Err(e) => tracing::trace!("Ignoring malformed JSON-LD: {}", e),
                }
            }
        }

        Self {
            description: meta_content(document, r#"meta[name="description"]"#),
            og_title: meta_content(document, r#"meta[property="og:title"]"#),
            og_description: meta_content(document, r#"meta[property="og:description"]"#),
            json_ld,
        }
    }

    /// Descriptive text fields, de-duplicated, one paragraph each
    fn as_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for part in self
            .description
            .iter()
            .chain(self.og_title.iter())
            .chain(self.og_description.iter())
            .chain(self.json_ld.iter())
        {
            let part = part.trim();
            if !part.is_empty() && !parts.contains(&part) {
                parts.push(part);
            }
        }
        parts.join("\n\n")
    }
}

fn collect_json_ld_text(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|v| collect_json_ld_text(v, out)),
        Value::Object(map) => {
            for (key, v) in map {
                match (key.as_str(), v) {
                    ("description" | "text" | "articleBody", Value::String(s)) => {
                        out.push(s.clone())
                    }
                    (_, Value::Array(_) | Value::Object(_)) => collect_json_ld_text(v, out),
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|m| m.value().attr("content"))
        .map(|c| c.trim().to_string())
        .find(|c| !c.is_empty())
}

/// HTML to Markdown extractor
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    options: ExtractOptions,
    strip: Vec<Selector>,
}

impl ContentExtractor {
    /// Builds an extractor, parsing the strip selectors once
    pub fn new(options: ExtractOptions) -> Result<Self, ConfigError> {
        let mut strip = vec![Selector::parse(ALWAYS_STRIPPED)
            .map_err(|e| ConfigError::InvalidSelector(format!("{:?}", e)))?];
        for raw in &options.strip_selectors {
            strip.push(
                Selector::parse(raw)
                    .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", raw, e)))?,
            );
        }
        Ok(Self { options, strip })
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extracts title, language and content from an HTML page
    pub fn extract(&self, html: &str, url: &str) -> ExtractedContent {
        let mut document = Html::parse_document(html);

        let metadata = PageMetadata::collect(&document);
        let title = page_title(&document, &metadata).unwrap_or_else(|| url.to_string());
        let language = document
            .root_element()
            .value()
            .attr("lang")
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        for selector in &self.strip {
            remove_matching(&mut document, selector);
        }

        let (content, method) = if self.options.multi_method {
            self.extract_chain(&document, &metadata)
        } else {
            self.extract_single(&document)
        };

        let content = if self.options.clean && method != ExtractionMethod::Placeholder {
            clean_content(&content, self.options.strip_images)
        } else {
            content
        };

        tracing::debug!("Extracted {} via {}", url, method);

        ExtractedContent {
            title,
            content,
            language,
            method,
        }
    }

    fn extract_single(&self, document: &Html) -> (String, ExtractionMethod) {
        let (root, method) = match self
            .options
            .use_readability
            .then(|| find_main_content(document))
            .flatten()
        {
            Some(main) => (main, ExtractionMethod::Readability),
            None => (body_or_root(document), ExtractionMethod::Body),
        };

        let markdown = html_to_markdown(&root.html());
        if !markdown.trim().is_empty() {
            return (markdown, method);
        }

        let text = visible_text(root);
        if text.is_empty() {
            (NO_CONTENT_PLACEHOLDER.to_string(), ExtractionMethod::Placeholder)
        } else {
            (text, ExtractionMethod::VisibleText)
        }
    }

    fn extract_chain(&self, document: &Html, metadata: &PageMetadata) -> (String, ExtractionMethod) {
        let input = ExtractionInput {
            document,
            metadata,
            use_readability: self.options.use_readability,
        };

        for (method, strategy) in STRATEGIES {
            match strategy(&input) {
                Ok(content) => return (content, *method),
                Err(e) => tracing::trace!("Strategy {} skipped: {}", method, e),
            }
        }

        (NO_CONTENT_PLACEHOLDER.to_string(), ExtractionMethod::Placeholder)
    }
}

fn page_title(document: &Html, metadata: &PageMetadata) -> Option<String> {
    ["title", "h1"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .next()
                .map(|el| el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|t| !t.is_empty())
        })
        .or_else(|| metadata.og_title.clone())
}

fn body_or_root(document: &Html) -> ElementRef<'_> {
    Selector::parse("body")
        .ok()
        .and_then(|s| document.root_element().select(&s).next())
        .unwrap_or_else(|| document.root_element())
}

fn remove_matching(document: &mut Html, selector: &Selector) {
    let ids: Vec<_> = document.root_element().select(selector).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn accept(content: String) -> Result<String, StrategyError> {
    let length = content.trim().chars().count();
    if length > MIN_CONTENT_CHARS {
        Ok(content)
    } else {
        Err(StrategyError::TooShort(length))
    }
}

fn first_matching(document: &Html, selectors: &[&str]) -> Result<String, StrategyError> {
    let mut last_error = StrategyError::NoMatch;
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(element) = document.root_element().select(&selector).next() {
            match accept(html_to_markdown(&element.html())) {
                Ok(content) => return Ok(content),
                Err(e) => last_error = e,
            }
        }
    }
    Err(last_error)
}

fn readability_strategy(input: &ExtractionInput<'_>) -> Result<String, StrategyError> {
    if !input.use_readability {
        return Err(StrategyError::Disabled);
    }
    let main = find_main_content(input.document).ok_or(StrategyError::NoMatch)?;
    accept(html_to_markdown(&main.html()))
}

fn semantic_strategy(input: &ExtractionInput<'_>) -> Result<String, StrategyError> {
    first_matching(input.document, SEMANTIC_SELECTORS)
}

fn documentation_strategy(input: &ExtractionInput<'_>) -> Result<String, StrategyError> {
    first_matching(input.document, DOCUMENTATION_SELECTORS)
}

fn metadata_strategy(input: &ExtractionInput<'_>) -> Result<String, StrategyError> {
    accept(input.metadata.as_text())
}

fn visible_text_strategy(input: &ExtractionInput<'_>) -> Result<String, StrategyError> {
    let mut document = input.document.clone();
    if let Ok(chrome) = Selector::parse(CHROME_SELECTORS) {
        remove_matching(&mut document, &chrome);
    }
    accept(visible_text(body_or_root(&document)))
}
