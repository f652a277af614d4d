//! Crawl worker pool
//!
//! N workers share an atomic cursor over the target list. Each worker claims
//! the next unclaimed index, processes it, and sends the result back tagged
//! with that index, so the returned pages are always in input order no matter
//! which fetch finishes first.
//!
//! Extraction and the caller's content transform run together on the
//! blocking pool. A panic there fails that one page as a parse error; the
//! worker keeps claiming targets.

use super::page::{PageResult, SkipReason};
use super::Fetcher;
use crate::config::ContentTransform;
use crate::discovery::{DiscoveredFile, DiscoveredUrl};
use crate::extract::{clean_content, markdown_title, ContentExtractor};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

/// Raw size ceiling; larger bodies are never buffered or handed to the extractor
pub const MAX_RAW_BYTES: usize = 5 * 1024 * 1024;

/// One page to produce
#[derive(Debug, Clone)]
pub enum CrawlTarget {
    /// Fetched over HTTP
    Remote(DiscoveredUrl),
    /// Read from disk and published under `url`
    Local { file: DiscoveredFile, url: String },
}

impl CrawlTarget {
    pub fn url(&self) -> &str {
        match self {
            Self::Remote(discovered) => &discovered.url,
            Self::Local { url, .. } => url,
        }
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Remote(discovered) => discovered.last_modified,
            Self::Local { file, .. } => file.modified_at,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

/// Fetches and extracts pages with bounded concurrency
#[derive(Debug, Clone)]
pub struct Crawler {
    fetcher: Fetcher,
    extractor: Arc<ContentExtractor>,
    transform: Option<ContentTransform>,
    concurrency: usize,
}

impl Crawler {
    pub fn new(
        fetcher: Fetcher,
        extractor: ContentExtractor,
        transform: Option<ContentTransform>,
        concurrency: usize,
    ) -> Self {
        Self {
            fetcher: fetcher.with_body_limit(MAX_RAW_BYTES),
            extractor: Arc::new(extractor),
            transform,
            concurrency: concurrency.max(1),
        }
    }

    /// Processes every target exactly once, returning results in input order
    pub async fn crawl(&self, targets: Vec<CrawlTarget>) -> Vec<PageResult> {
        let total = targets.len();
        if total == 0 {
            return Vec::new();
        }

        let targets = Arc::new(targets);
        let cursor = Arc::new(AtomicUsize::new(0));
        let workers = self.concurrency.min(total);

        tracing::info!("Crawling {} pages with {} workers", total, workers);

        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();
        for worker_id in 0..workers {
            let crawler = self.clone();
            let targets = Arc::clone(&targets);
            let cursor = Arc::clone(&cursor);
            let results_tx = results_tx.clone();

            tasks.spawn(async move {
                loop {
                    let idx = cursor.fetch_add(1, Ordering::SeqCst);
                    let Some(target) = targets.get(idx) else {
                        break;
                    };
                    tracing::trace!("Worker {} claimed #{} {}", worker_id, idx, target.url());
                    let page = crawler.process(target).await;
                    if results_tx.send((idx, page)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(results_tx);

        let mut slots: Vec<Option<PageResult>> = vec![None; total];
        while let Some((idx, page)) = results_rx.recv().await {
            slots[idx] = Some(page);
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Crawl worker failed: {}", e);
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.unwrap_or_else(|| {
                    PageResult::skipped(
                        targets[idx].url(),
                        SkipReason::ParseError,
                        Some("page was not processed".to_string()),
                    )
                })
            })
            .collect()
    }

    async fn process(&self, target: &CrawlTarget) -> PageResult {
        let page = match target {
            CrawlTarget::Remote(discovered) => self.process_remote(discovered).await,
            CrawlTarget::Local { file, url } => self.process_local(file, url).await,
        };

        match (&page.skip_reason, &page.error) {
            (Some(reason), Some(error)) => {
                tracing::warn!("Skipped {} ({}): {}", page.url, reason, error)
            }
            (Some(reason), None) => tracing::warn!("Skipped {} ({})", page.url, reason),
            _ => tracing::debug!("Crawled {} ({} chars)", page.url, page.content_length),
        }
        page
    }

    async fn process_remote(&self, discovered: &DiscoveredUrl) -> PageResult {
        let url = discovered.url.as_str();

        let response = match self.fetcher.fetch(url).await {
            Ok(response) => response,
            Err(e @ HarvestError::ContentTooLarge { .. }) => {
                return PageResult::skipped(url, SkipReason::TooLarge, Some(e.to_string()))
            }
            Err(e) => return PageResult::skipped(url, SkipReason::ParseError, Some(e.to_string())),
        };
        let status = response.status;

        if !response.is_success() {
            return PageResult::skipped(url, SkipReason::HttpStatus(status), None)
                .with_status(status);
        }

        if !response.is_html() {
            return PageResult::skipped(url, SkipReason::ContentType, response.content_type.clone())
                .with_status(status);
        }

        let extractor = Arc::clone(&self.extractor);
        let transform = self.transform.clone();
        let page_url = url.to_string();
        let body = response.body;
        let processed = tokio::task::spawn_blocking(move || {
            let extracted = extractor.extract(&body, &page_url);
            let content = apply_transform(transform.as_ref(), &page_url, extracted.content);
            (extracted.title, content, extracted.language)
        })
        .await;

        match processed {
            Ok((title, content, language)) => PageResult::extracted(url, title, content)
                .with_status(status)
                .with_last_modified(response.last_modified.or(discovered.last_modified))
                .with_language(language),
            Err(e) => PageResult::skipped(url, SkipReason::ParseError, Some(join_failure(e)))
                .with_status(status),
        }
    }

    async fn process_local(&self, file: &DiscoveredFile, url: &str) -> PageResult {
        if file.size_bytes > MAX_RAW_BYTES as u64 {
            return too_large(url, file.size_bytes as usize);
        }

        let bytes = match tokio::fs::read(&file.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return PageResult::skipped(
                    url,
                    SkipReason::ParseError,
                    Some(HarvestError::Io(e).to_string()),
                )
            }
        };
        if bytes.len() > MAX_RAW_BYTES {
            return too_large(url, bytes.len());
        }

        let text = String::from_utf8_lossy(&bytes).into_owned();
        let extractor = Arc::clone(&self.extractor);
        let transform = self.transform.clone();
        let page_url = url.to_string();
        let path = file.path.clone();
        let is_html = matches!(file.extension.as_str(), "html" | "htm");

        let converted = tokio::task::spawn_blocking(move || {
            let (title, content, language) = if is_html {
                let extracted = extractor.extract(&text, &page_url);
                (extracted.title, extracted.content, extracted.language)
            } else {
                let title = markdown_title(&text).unwrap_or_else(|| file_stem(&path));
                let options = extractor.options();
                let content = if options.clean {
                    clean_content(&text, options.strip_images)
                } else {
                    text.trim().to_string()
                };
                (title, content, None)
            };
            let content = apply_transform(transform.as_ref(), &page_url, content);
            (title, content, language)
        })
        .await;

        match converted {
            Ok((title, content, language)) => PageResult::extracted(url, title, content)
                .with_last_modified(file.modified_at)
                .with_language(language),
            Err(e) => PageResult::skipped(url, SkipReason::ParseError, Some(join_failure(e))),
        }
    }
}

fn apply_transform(transform: Option<&ContentTransform>, url: &str, content: String) -> String {
    match transform {
        Some(transform) => transform.apply(url, &content),
        None => content,
    }
}

/// Describes a failed blocking task, keeping the panic message when there is one
fn join_failure(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("page processing panicked: {}", message)
}

fn too_large(url: &str, size: usize) -> PageResult {
    let error = HarvestError::ContentTooLarge {
        url: url.to_string(),
        size,
        limit: MAX_RAW_BYTES,
    };
    PageResult::skipped(url, SkipReason::TooLarge, Some(error.to_string()))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
