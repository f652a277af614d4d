//! llms-harvest: turn a website into one document for language models
//!
//! This crate discovers the pages of a site (sitemap, recursive link
//! following, local file trees), extracts clean text from each page and
//! assembles a single size-bounded document with a table of contents.

pub mod config;
pub mod crawler;
pub mod discovery;
pub mod extract;
pub mod filter;
pub mod generator;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for llms-harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Invalid site URL: {0}")]
    InvalidUrl(String),

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Content too large for {url}: {size} bytes (limit {limit})")]
    ContentTooLarge { url: String, size: usize, limit: usize },

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true for transport-level failures that a retry may fix
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::Reqwest(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid request header: {0}")]
    InvalidHeader(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for llms-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{GenerateOptions, OutputFormat};
pub use crawler::{PageResult, SkipReason};
pub use generator::{generate, Generator};
pub use output::GenerationStats;
pub use url::{is_internal, normalize_url};
