//! Sitemap resolution
//!
//! Parsing is deliberately lenient: `<url>` blocks are scraped with regular
//! expressions rather than validated as XML, because many real-world
//! sitemaps are close to, but not quite, well-formed. When no `<url>` block
//! matches, bare `<loc>` elements are used instead.
//!
//! A document in which any location ends in `.xml` is treated as a sitemap
//! index. [`resolve_sitemap`] follows indexes breadth-first and merges every
//! leaf sitemap into one list keyed by normalized location.

use crate::crawler::Fetcher;
use crate::url::{is_internal, normalize_key};
use crate::HarvestError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::LazyLock;

/// Maximum nesting of sitemap indexes below the root
const MAX_INDEX_DEPTH: usize = 3;

static URL_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<url\b[^>]*>(.*?)</url>").expect("valid regex"));
static LOC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<loc\b[^>]*>(.*?)</loc>").expect("valid regex"));
static LASTMOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<lastmod\b[^>]*>(.*?)</lastmod>").expect("valid regex"));

/// One page listed in a sitemap
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapEntry {
    pub location: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq)]
pub enum SitemapContent {
    /// Child sitemap locations
    Index(Vec<String>),
    /// Same-site page entries
    Urls(Vec<SitemapEntry>),
}

/// Parses one sitemap document
///
/// # Arguments
///
/// * `xml` - Raw sitemap text
/// * `site_url` - Base site; page entries on other hosts are dropped
///
/// # Example
///
/// ```
/// use llms_harvest::discovery::{parse_sitemap, SitemapContent};
///
/// let xml = "<urlset><url><loc>https://example.com/a</loc></url></urlset>";
/// match parse_sitemap(xml, "https://example.com") {
///     SitemapContent::Urls(entries) => assert_eq!(entries.len(), 1),
///     SitemapContent::Index(_) => unreachable!(),
/// }
/// ```
pub fn parse_sitemap(xml: &str, site_url: &str) -> SitemapContent {
    let mut entries: Vec<SitemapEntry> = URL_BLOCK
        .captures_iter(xml)
        .filter_map(|block| {
            let body = block.get(1)?.as_str();
            let location = first_text(&LOC, body)?;
            let last_modified = first_text(&LASTMOD, body).and_then(|s| parse_lastmod(&s));
            Some(SitemapEntry {
                location,
                last_modified,
            })
        })
        .collect();

    if entries.is_empty() {
        entries = LOC
            .captures_iter(xml)
            .filter_map(|c| c.get(1).map(|m| decode_text(m.as_str())))
            .filter(|loc| !loc.is_empty())
            .map(|location| SitemapEntry {
                location,
                last_modified: None,
            })
            .collect();
    }

    if entries.iter().any(|e| is_xml_location(&e.location)) {
        let children = entries
            .into_iter()
            .map(|e| e.location)
            .filter(|loc| is_xml_location(loc))
            .collect();
        return SitemapContent::Index(children);
    }

    SitemapContent::Urls(
        entries
            .into_iter()
            .filter(|e| is_internal(&e.location, site_url))
            .collect(),
    )
}

/// Fetches a sitemap and every sitemap it indexes
///
/// Failure to fetch the root sitemap, or a non-2xx root response, is
/// returned as [`HarvestError::Network`]. Failed child sitemaps are logged
/// and skipped. Entries are merged by normalized location; a later entry
/// replaces an earlier one in place.
pub async fn resolve_sitemap(
    fetcher: &Fetcher,
    sitemap_url: &str,
    site_url: &str,
) -> Result<Vec<SitemapEntry>, HarvestError> {
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut merged: Vec<SitemapEntry> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    queue.push_back((sitemap_url.to_string(), 0));
    visited.insert(sitemap_url.to_string());

    while let Some((url, depth)) = queue.pop_front() {
        let is_root = depth == 0;

        let body = match fetcher.fetch(&url).await {
            Ok(response) if response.is_success() => response.body,
            Ok(response) => {
                let message = format!("sitemap returned HTTP {}", response.status);
                if is_root {
                    return Err(HarvestError::Network { url, message });
                }
                tracing::warn!("Skipping child sitemap {}: {}", url, message);
                continue;
            }
            Err(e) => {
                if is_root {
                    return Err(HarvestError::Network {
                        url,
                        message: e.to_string(),
                    });
                }
                tracing::warn!("Skipping child sitemap {}: {}", url, e);
                continue;
            }
        };

        match parse_sitemap(&body, site_url) {
            SitemapContent::Index(children) => {
                tracing::debug!("Sitemap index {} lists {} children", url, children.len());
                if depth >= MAX_INDEX_DEPTH {
                    tracing::warn!("Sitemap index {} nested too deeply, ignoring", url);
                    continue;
                }
                for child in children {
                    if visited.insert(child.clone()) {
                        queue.push_back((child, depth + 1));
                    }
                }
            }
            SitemapContent::Urls(entries) => {
                tracing::debug!("Sitemap {} lists {} pages", url, entries.len());
                for entry in entries {
                    let key =
                        normalize_key(&entry.location).unwrap_or_else(|_| entry.location.clone());
                    match positions.get(&key) {
                        Some(&idx) => merged[idx] = entry,
                        None => {
                            positions.insert(key, merged.len());
                            merged.push(entry);
                        }
                    }
                }
            }
        }
    }

    tracing::info!("Resolved {} URLs from sitemap {}", merged.len(), sitemap_url);
    Ok(merged)
}

fn first_text(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| decode_text(m.as_str()))
        .filter(|s| !s.is_empty())
}

/// Unwraps CDATA and decodes the predefined XML entities
fn decode_text(raw: &str) -> String {
    let text = raw.trim();
    let text = text
        .strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
        .unwrap_or(text);

    text.trim()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn is_xml_location(location: &str) -> bool {
    location.to_ascii_lowercase().ends_with(".xml")
}

/// Parses `2024-01-15`, RFC 3339, or a naive ISO datetime taken as UTC
pub(crate) fn parse_lastmod(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }

    tracing::debug!("Could not parse lastmod '{}'", s);
    None
}
