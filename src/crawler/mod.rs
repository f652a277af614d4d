//! Crawler module for page fetching and processing
//!
//! This module contains:
//! - HTTP fetching with timeout and retry ([`Fetcher`])
//! - The order-preserving worker pool ([`Crawler`])
//! - Per-page results and skip reasons ([`PageResult`], [`SkipReason`])

mod fetcher;
mod page;
mod pool;

pub use fetcher::{build_http_client, FetchResponse, Fetcher, RetryPolicy};
pub use page::{PageResult, SkipReason};
pub use pool::{CrawlTarget, Crawler, MAX_RAW_BYTES};
