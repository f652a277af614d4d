//! Recursive same-site link discovery
//!
//! Discovery proceeds in depth rounds. Round `d` fetches every URL recorded
//! at depth `d`, extracts its links and records each new same-site URL at
//! depth `d + 1`. The discovery set is keyed by normalized URL and the first
//! discovery wins, so cycles in the link graph terminate.
//!
//! Pages share the crawler's raw size ceiling and are parsed on the blocking
//! pool.

use super::{DiscoveredUrl, DiscoveryMethod};
use crate::crawler::{FetchResponse, Fetcher, MAX_RAW_BYTES};
use crate::url::{is_internal, normalize_key, UrlFilter};
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Bounds for one link-discovery run
#[derive(Debug, Clone, Copy)]
pub struct LinkDiscoveryOptions {
    pub max_depth: u32,
    pub max_links_per_page: usize,
    pub concurrency: usize,
    pub request_delay: Duration,
}

/// Extracts absolute http(s) link targets from an HTML page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` targets
/// - Fragment-only links
/// - Anything that does not resolve to http or https
///
/// # Example
///
/// ```
/// use llms_harvest::discovery::extract_links;
///
/// let html = r#"<a href="/docs">Docs</a><a href="mailto:x@example.com">Mail</a>"#;
/// let links = extract_links(html, "https://example.com/");
/// assert_eq!(links, vec!["https://example.com/docs".to_string()]);
/// ```
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(anchors) = Selector::parse("a[href]") {
        for element in document.select(&anchors) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(link) = element.value().attr("href").and_then(|h| resolve_link(h, &base)) {
                links.push(link);
            }
        }
    }

    if let Ok(canonical) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical) {
            if let Some(link) = element.value().attr("href").and_then(|h| resolve_link(h, &base)) {
                links.push(link);
            }
        }
    }

    links
}

fn resolve_link(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base.join(href).ok()?;
    matches!(absolute.scheme(), "http" | "https").then(|| absolute.to_string())
}

/// Expands a seed set by following same-site links
///
/// Returns every discovered URL, seeds first, in discovery order. A page
/// that fails to fetch, is not HTML or exceeds [`MAX_RAW_BYTES`] contributes
/// no links.
pub async fn discover_links(
    fetcher: &Fetcher,
    seeds: Vec<DiscoveredUrl>,
    site_url: &str,
    filter: &UrlFilter,
    options: LinkDiscoveryOptions,
) -> Vec<DiscoveredUrl> {
    let mut order: Vec<String> = Vec::new();
    let mut discovered: HashMap<String, DiscoveredUrl> = HashMap::new();

    for seed in seeds {
        if !discovered.contains_key(&seed.url) {
            order.push(seed.url.clone());
            discovered.insert(seed.url.clone(), seed);
        }
    }

    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));

    for round in 0..options.max_depth {
        let frontier: Vec<String> = order
            .iter()
            .filter(|url| discovered.get(*url).is_some_and(|d| d.depth == round))
            .cloned()
            .collect();

        if frontier.is_empty() {
            break;
        }

        tracing::info!(
            "Link discovery round {}: expanding {} pages",
            round,
            frontier.len()
        );

        let mut page_links = fetch_frontier(fetcher, &frontier, &semaphore, options).await;
        page_links.sort_by_key(|(idx, _)| *idx);

        let mut new_urls = 0;
        for (idx, links) in page_links {
            let parent = &frontier[idx];
            for link in select_links(links, site_url, filter, options.max_links_per_page) {
                if discovered.contains_key(&link) {
                    continue;
                }
                order.push(link.clone());
                discovered.insert(
                    link.clone(),
                    DiscoveredUrl {
                        url: link,
                        depth: round + 1,
                        parent_url: Some(parent.clone()),
                        method: DiscoveryMethod::InternalLink,
                        last_modified: None,
                    },
                );
                new_urls += 1;
            }
        }

        tracing::debug!("Round {} discovered {} new URLs", round, new_urls);
        if new_urls == 0 {
            break;
        }

        tokio::time::sleep(options.request_delay).await;
    }

    order
        .into_iter()
        .filter_map(|url| discovered.remove(&url))
        .collect()
}

/// Fetches one round's pages concurrently, returning `(frontier index, links)`
async fn fetch_frontier(
    fetcher: &Fetcher,
    frontier: &[String],
    semaphore: &Arc<Semaphore>,
    options: LinkDiscoveryOptions,
) -> Vec<(usize, Vec<String>)> {
    let fetcher = fetcher.clone().with_body_limit(MAX_RAW_BYTES);
    let mut tasks = JoinSet::new();

    for (idx, url) in frontier.iter().enumerate() {
        let fetcher = fetcher.clone();
        let semaphore = Arc::clone(semaphore);
        let url = url.clone();
        let delay = options.request_delay;

        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (idx, Vec::new());
            };
            tokio::time::sleep(delay).await;

            match fetcher.fetch(&url).await {
                Ok(response) if response.is_success() && response.is_html() => {
                    let FetchResponse { url: page_url, body, .. } = response;
                    match tokio::task::spawn_blocking(move || extract_links(&body, &page_url)).await
                    {
                        Ok(links) => (idx, links),
                        Err(e) => {
                            tracing::warn!("Link extraction failed for {}: {}", url, e);
                            (idx, Vec::new())
                        }
                    }
                }
                Ok(response) => {
                    tracing::debug!(
                        "No links taken from {} (status {})",
                        url,
                        response.status
                    );
                    (idx, Vec::new())
                }
                Err(e) => {
                    tracing::warn!("Link extraction failed for {}: {}", url, e);
                    (idx, Vec::new())
                }
            }
        });
    }

    let mut results = Vec::with_capacity(frontier.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => tracing::error!("Link discovery task failed: {}", e),
        }
    }
    results
}

/// Normalizes, keeps same-site accepted links, dedupes and caps
fn select_links(
    links: Vec<String>,
    site_url: &str,
    filter: &UrlFilter,
    cap: usize,
) -> Vec<String> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter_map(|link| normalize_key(&link).ok())
        .filter(|link| is_internal(link, site_url) && filter.accepts(link))
        .filter(|link| seen.insert(link.clone()))
        .take(cap)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/docs/intro";

    #[test]
    fn test_relative_links_resolved() {
        let html = r#"<a href="setup">Setup</a><a href="/api">API</a><a href="../blog/">Blog</a>"#;
        assert_eq!(
            extract_links(html, BASE),
            vec![
                "https://example.com/docs/setup",
                "https://example.com/api",
                "https://example.com/blog/",
            ]
        );
    }

    #[test]
    fn test_special_links_skipped() {
        let html = r##"
            <a href="#top">Top</a>
            <a href="javascript:void(0)">JS</a>
            <a href="MAILTO:a@example.com">Mail</a>
            <a href="tel:123">Call</a>
            <a href="data:text/plain,hi">Data</a>
            <a href="/file.zip" download>Download</a>
            <a href="ftp://example.com/x">FTP</a>
            <a href="">Empty</a>
        "##;
        assert!(extract_links(html, BASE).is_empty());
    }

    #[test]
    fn test_canonical_included() {
        let html = r#"<html><head><link rel="canonical" href="https://example.com/docs/intro/"></head></html>"#;
        assert_eq!(
            extract_links(html, BASE),
            vec!["https://example.com/docs/intro/"]
        );
    }

    #[test]
    fn test_select_links_filters_and_caps() {
        let filter = UrlFilter::new(&[], &["/private".to_string()]).unwrap();
        let links = vec![
            "https://example.com/a/".to_string(),
            "https://example.com/a".to_string(),
            "https://other.com/b".to_string(),
            "https://example.com/private/x".to_string(),
            "https://example.com/c#section".to_string(),
            "https://example.com/d".to_string(),
        ];

        let selected = select_links(links, "https://example.com", &filter, 2);
        assert_eq!(
            selected,
            vec!["https://example.com/a", "https://example.com/c"]
        );
    }

    #[test]
    fn test_bad_base_url_yields_nothing() {
        assert!(extract_links(r#"<a href="/x">x</a>"#, "not a url").is_empty());
    }
}
