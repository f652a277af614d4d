//! Generation pipeline
//!
//! Ties discovery, crawling, filtering and assembly together for one run.
//! Every run builds its own fetcher and worker pool; nothing is shared
//! between two [`Generator::run`] calls.

use crate::config::{validate, validate_site_url, GenerateOptions, Limits};
use crate::crawler::{CrawlTarget, Crawler, Fetcher};
use crate::discovery::{
    discover_files, discover_links, file_page_url, resolve_sitemap, DiscoveredFile, DiscoveredUrl,
    DiscoveryMethod, LinkDiscoveryOptions, SitemapEntry,
};
use crate::extract::{ContentExtractor, ExtractOptions};
use crate::filter::ContentFilter;
use crate::output::{apply_budgets, render_document, GenerationStats};
use crate::url::{is_internal, normalize_key, UrlFilter};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// A validated, ready-to-run generation job
#[derive(Debug)]
pub struct Generator {
    options: GenerateOptions,
    url_filter: UrlFilter,
    content_filter: Option<ContentFilter>,
    limits: Limits,
}

impl Generator {
    /// Validates the options and compiles patterns
    ///
    /// A missing or unparseable site URL is reported as
    /// [`HarvestError::InvalidUrl`]; every other problem, including a bad
    /// sitemap or seed URL, as [`HarvestError::Config`].
    pub fn new(options: GenerateOptions) -> Result<Self, HarvestError> {
        validate_site_url(&options).map_err(|e| HarvestError::InvalidUrl(e.to_string()))?;
        validate(&options)?;

        let url_filter = UrlFilter::new(&options.include_patterns, &options.exclude_patterns)?;
        let content_filter = if options.content_filter.enabled {
            Some(ContentFilter::new(options.content_filter.clone())?)
        } else {
            None
        };
        let limits = options.effective_limits();

        Ok(Self {
            options,
            url_filter,
            content_filter,
            limits,
        })
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Runs the whole pipeline
    ///
    /// 1. Resolves the sitemap and walks the local file tree concurrently
    /// 2. Expands the seed set by following links (when recursive)
    /// 3. Filters, de-duplicates, sorts and caps the targets
    /// 4. Crawls and extracts every target
    /// 5. Categorizes and filters pages (when enabled)
    /// 6. Applies the size budgets and renders the document
    pub async fn run(&self) -> Result<(String, GenerationStats), HarvestError> {
        let timer = Instant::now();
        let mut stats = GenerationStats::new(Utc::now());
        let site = self.options.site_root().to_string();

        tracing::info!("Starting generation for {}", site);

        let fetcher = Fetcher::new(&self.options)?;

        let (sitemap, files) = tokio::join!(
            self.sitemap_entries(&fetcher, &site),
            self.local_files()
        );
        let sitemap = sitemap?;
        let files = files?;

        let seeds = self.seeds(&site, sitemap);
        let discovered = if self.options.recursive {
            tracing::info!(
                "Following links from {} seeds up to depth {}",
                seeds.len(),
                self.options.max_depth
            );
            discover_links(
                &fetcher,
                self.expansion_roots(&site, seeds),
                &site,
                &self.url_filter,
                LinkDiscoveryOptions {
                    max_depth: self.options.max_depth,
                    max_links_per_page: self.options.max_links_per_page,
                    concurrency: self.options.concurrency,
                    request_delay: Duration::from_millis(self.options.request_delay_ms),
                },
            )
            .await
        } else {
            seeds
        };

        stats.discovered_urls = discovered.len();
        stats.discovered_files = files.len();

        let targets = self.targets(&site, discovered, files);
        tracing::info!("Crawling {} pages", targets.len());

        let extractor = ContentExtractor::new(ExtractOptions::from_options(&self.options))?;
        let crawler = Crawler::new(
            fetcher,
            extractor,
            self.options.content_transform.clone(),
            self.options.concurrency,
        );
        let mut pages = crawler.crawl(targets).await;

        if let Some(filter) = &self.content_filter {
            let outcome = filter.apply(pages);
            stats.filtered_out = outcome.filtered_out;
            pages = outcome.pages;
        }

        let budgeted = apply_budgets(pages, &self.limits);
        let document = render_document(&site, &budgeted.pages, Utc::now());

        stats.total_pages = budgeted.pages.len();
        stats.successful_pages = budgeted.pages.iter().filter(|p| p.success).count();
        stats.failed_pages = stats.total_pages - stats.successful_pages;
        stats.truncated_pages = budgeted.truncated_pages;
        stats.total_content_length = budgeted.total_content_length;
        stats.global_limit_reached = budgeted.global_limit_reached;
        stats.duration = timer.elapsed();

        tracing::info!(
            "Generation completed: {} pages ({} skipped) in {:?}",
            stats.total_pages,
            stats.failed_pages,
            stats.duration
        );

        Ok((document, stats))
    }

    async fn sitemap_entries(
        &self,
        fetcher: &Fetcher,
        site: &str,
    ) -> Result<Vec<SitemapEntry>, HarvestError> {
        if !self.options.use_sitemap {
            return Ok(Vec::new());
        }

        let sitemap_url = self.options.resolved_sitemap_url();
        tracing::info!("Resolving sitemap {}", sitemap_url);

        let entries = resolve_sitemap(fetcher, &sitemap_url, site).await?;
        tracing::info!("Sitemap listed {} URLs", entries.len());
        Ok(entries)
    }

    async fn local_files(&self) -> Result<Vec<DiscoveredFile>, HarvestError> {
        if !self.options.filesystem.enabled {
            return Ok(Vec::new());
        }

        let options = self.options.filesystem.clone();
        let discovery = tokio::task::spawn_blocking(move || discover_files(&options))
            .await
            .map_err(|e| HarvestError::Io(std::io::Error::other(e)))??;

        tracing::info!(
            "Found {} local files ({} scanned, {} excluded) in {:?}",
            discovery.stats.included,
            discovery.stats.scanned,
            discovery.stats.excluded,
            discovery.stats.duration
        );
        Ok(discovery.files)
    }

    /// Depth-0 URLs: sitemap entries, explicit seeds, and the site root
    /// when nothing else is available or links are followed
    fn seeds(&self, site: &str, sitemap: Vec<SitemapEntry>) -> Vec<DiscoveredUrl> {
        let mut seen = HashSet::new();
        let mut seeds = Vec::new();

        for entry in sitemap {
            push_seed(
                &mut seeds,
                &mut seen,
                &entry.location,
                DiscoveryMethod::Sitemap,
                entry.last_modified,
            );
        }
        for url in &self.options.seed_urls {
            push_seed(&mut seeds, &mut seen, url, DiscoveryMethod::Seed, None);
        }

        if seeds.is_empty() || self.options.recursive {
            push_seed(&mut seeds, &mut seen, site, DiscoveryMethod::Seed, None);
        }

        seeds
    }

    /// Seeds that link discovery may fetch
    ///
    /// Off-site and excluded seeds are dropped. Seeds outside the include
    /// patterns stay, so a site root can lead to included pages without being
    /// a page itself; [`Generator::targets`] removes them afterwards.
    fn expansion_roots(&self, site: &str, seeds: Vec<DiscoveredUrl>) -> Vec<DiscoveredUrl> {
        seeds
            .into_iter()
            .filter(|seed| {
                let keep = is_internal(&seed.url, site) && !self.url_filter.excludes(&seed.url);
                if !keep {
                    tracing::debug!("Not following links from {}", seed.url);
                }
                keep
            })
            .collect()
    }

    /// Filters, de-duplicates (remote before local), sorts and caps targets
    fn targets(
        &self,
        site: &str,
        discovered: Vec<DiscoveredUrl>,
        files: Vec<DiscoveredFile>,
    ) -> Vec<CrawlTarget> {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();

        for entry in discovered {
            if !is_internal(&entry.url, site) || !self.url_filter.accepts(&entry.url) {
                tracing::debug!("Filtered out {}", entry.url);
                continue;
            }
            if seen.insert(entry.url.clone()) {
                targets.push(CrawlTarget::Remote(entry));
            }
        }

        for file in files {
            let url = match normalize_key(&file_page_url(site, &file.relative_path)) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("No page URL for {}: {}", file.relative_path, e);
                    continue;
                }
            };
            if !self.url_filter.accepts(&url) {
                tracing::debug!("Filtered out {}", url);
                continue;
            }
            if seen.insert(url.clone()) {
                targets.push(CrawlTarget::Local { file, url });
            } else {
                tracing::debug!("{} already covered by a remote page", url);
            }
        }

        sort_targets(&mut targets);

        if targets.len() > self.limits.max_pages {
            tracing::info!(
                "Capping {} candidates at {} pages",
                targets.len(),
                self.limits.max_pages
            );
            targets.truncate(self.limits.max_pages);
        }

        targets
    }
}

fn push_seed(
    seeds: &mut Vec<DiscoveredUrl>,
    seen: &mut HashSet<String>,
    url: &str,
    method: DiscoveryMethod,
    last_modified: Option<DateTime<Utc>>,
) {
    match normalize_key(url) {
        Ok(key) => {
            if seen.insert(key.clone()) {
                seeds.push(DiscoveredUrl::root(key, method, last_modified));
            }
        }
        Err(e) => tracing::warn!("Ignoring URL {}: {}", url, e),
    }
}

/// Newest first; undated after dated; ties by URL
fn sort_targets(targets: &mut [CrawlTarget]) {
    targets.sort_by(|a, b| {
        match (a.last_modified(), b.last_modified()) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| a.url().cmp(b.url()))
    });
}

/// Generates the document for a site
///
/// # Example
///
/// ```no_run
/// use llms_harvest::{generate, GenerateOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (document, stats) = generate(GenerateOptions::for_site("https://example.com")).await?;
/// println!("{} pages, {} chars", stats.total_pages, document.len());
/// # Ok(())
/// # }
/// ```
pub async fn generate(
    options: GenerateOptions,
) -> Result<(String, GenerationStats), HarvestError> {
    Generator::new(options)?.run().await
}
