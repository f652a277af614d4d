//! Page discovery
//!
//! Three independent sources feed the crawl:
//! - [`sitemap`]: sitemap XML, including sitemap indexes
//! - [`links`]: breadth-first same-site link following from a seed set
//! - [`files`]: local directory trees of Markdown/HTML sources

pub mod files;
pub mod links;
pub mod sitemap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

pub use files::{discover_files, file_page_url, FileDiscovery, FileDiscoveryStats};
pub use links::{discover_links, extract_links, LinkDiscoveryOptions};
pub use sitemap::{parse_sitemap, resolve_sitemap, SitemapContent, SitemapEntry};

/// How a URL entered the discovery set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryMethod {
    /// Explicitly configured, or the site root
    Seed,
    Sitemap,
    InternalLink,
    ExternalLink,
}

/// A URL found by discovery
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredUrl {
    /// Normalized URL
    pub url: String,

    /// 0 for seeds, +1 per followed link
    pub depth: u32,

    pub parent_url: Option<String>,
    pub method: DiscoveryMethod,
    pub last_modified: Option<DateTime<Utc>>,
}

impl DiscoveredUrl {
    /// A depth-0 entry
    pub fn root(url: String, method: DiscoveryMethod, last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            url,
            depth: 0,
            parent_url: None,
            method,
            last_modified,
        }
    }
}

/// A local source file found by the file-system walk
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredFile {
    pub path: PathBuf,

    /// Path below the base directory, `/`-separated
    pub relative_path: String,

    /// Lowercase extension without the dot
    pub extension: String,

    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,

    /// 0 for files directly in the base directory
    pub depth: usize,

    pub is_symlink: bool,
}
