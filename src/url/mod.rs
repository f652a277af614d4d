//! URL handling module for llms-harvest
//!
//! This module provides URL normalization, same-site checks, include/exclude
//! URL patterns and the glob compiler used by file-system discovery. Nothing
//! in here performs I/O.

mod domain;
mod glob;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{is_internal, site_host};
pub use glob::{compile_globs, Glob};
pub use matcher::{UrlFilter, UrlPattern};
pub use normalize::{normalize_key, normalize_url};
