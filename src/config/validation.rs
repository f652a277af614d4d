use crate::config::types::{FileSystemOptions, FilterConfig, GenerateOptions};
use crate::url::{Glob, UrlPattern};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire option set
pub fn validate(options: &GenerateOptions) -> Result<(), ConfigError> {
    validate_site_url(options)?;
    validate_discovery_urls(options)?;
    validate_limits(options)?;
    validate_url_patterns(&options.include_patterns)?;
    validate_url_patterns(&options.exclude_patterns)?;
    validate_selectors(&options.strip_selectors)?;
    validate_headers(options)?;
    validate_filesystem(&options.filesystem)?;
    validate_filter(&options.content_filter)?;
    Ok(())
}

/// Validates the site URL alone
pub(crate) fn validate_site_url(options: &GenerateOptions) -> Result<(), ConfigError> {
    let site = options.site_root();
    if site.is_empty() {
        return Err(ConfigError::InvalidUrl(
            "site_url is required".to_string(),
        ));
    }

    let url = Url::parse(site)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site_url '{}': {}", site, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "site_url '{}' must use http or https",
            site
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "site_url '{}' has no host",
            site
        )));
    }

    Ok(())
}

/// Validates the explicit sitemap and seed URLs
fn validate_discovery_urls(options: &GenerateOptions) -> Result<(), ConfigError> {
    if let Some(sitemap) = &options.sitemap_url {
        Url::parse(sitemap).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid sitemap_url '{}': {}", sitemap, e))
        })?;
    }

    for seed in &options.seed_urls {
        Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;
    }

    Ok(())
}

/// Validates concurrency, timing and depth limits
fn validate_limits(options: &GenerateOptions) -> Result<(), ConfigError> {
    if options.concurrency < 1 || options.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            options.concurrency
        )));
    }

    if options.timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "timeout_ms must be >= 1".to_string(),
        ));
    }

    if options.max_depth > 10 {
        return Err(ConfigError::Validation(format!(
            "max_depth must be <= 10, got {}",
            options.max_depth
        )));
    }

    if options.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_url_patterns(patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        UrlPattern::parse(pattern)?;
    }
    Ok(())
}

fn validate_selectors(selectors: &[String]) -> Result<(), ConfigError> {
    for selector in selectors {
        Selector::parse(selector)
            .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))?;
    }
    Ok(())
}

fn validate_headers(options: &GenerateOptions) -> Result<(), ConfigError> {
    for (name, value) in &options.headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}': {}", name, e)))?;
        HeaderValue::from_str(value)
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}': {}", name, e)))?;
    }

    HeaderValue::from_str(&options.user_agent)
        .map_err(|e| ConfigError::InvalidHeader(format!("user_agent: {}", e)))?;

    Ok(())
}

fn validate_filesystem(fs: &FileSystemOptions) -> Result<(), ConfigError> {
    if !fs.enabled {
        return Ok(());
    }

    if fs.base_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "filesystem.base_path cannot be empty".to_string(),
        ));
    }

    for pattern in fs.include_patterns.iter().chain(&fs.exclude_patterns) {
        Glob::new(pattern)?;
    }

    Ok(())
}

fn validate_filter(filter: &FilterConfig) -> Result<(), ConfigError> {
    let mut ids = HashSet::new();
    for category in &filter.categories {
        if category.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category id cannot be empty".to_string(),
            ));
        }
        if !ids.insert(category.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category id '{}'",
                category.id
            )));
        }
        for pattern in &category.content_patterns {
            regex::RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    ConfigError::InvalidPattern(format!(
                        "category '{}' pattern '{}': {}",
                        category.id, pattern, e
                    ))
                })?;
        }
    }

    if let Some(max) = filter.max_content_length {
        if filter.min_content_length > max {
            return Err(ConfigError::Validation(format!(
                "min_content_length ({}) exceeds max_content_length ({})",
                filter.min_content_length, max
            )));
        }
    }

    Ok(())
}
