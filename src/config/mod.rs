//! Configuration module for llms-harvest
//!
//! `GenerateOptions` is the single options struct consumed by
//! [`crate::generate`]. The same struct is the schema of the TOML options
//! file, so this module also handles loading, parsing and validating it.
//!
//! # Example
//!
//! ```no_run
//! use llms_harvest::config::load_options;
//! use std::path::Path;
//!
//! let options = load_options(Path::new("harvest.toml")).unwrap();
//! println!("Sitemap: {}", options.resolved_sitemap_url());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_categories, ContentCategory, ContentTransform, FileSystemOptions, FilterConfig,
    GenerateOptions, Limits, OutputFormat,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_options, load_options_with_hash, parse_options};
pub use validation::validate;
pub(crate) use validation::validate_site_url;
