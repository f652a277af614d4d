//! Output module for the generated document
//!
//! This module handles:
//! - Enforcing the page and character budgets
//! - Rendering the header, table of contents and page sections
//! - Recording run statistics

mod assembler;
mod document;
pub mod stats;

pub use assembler::{apply_budgets, BudgetedPages};
pub use document::{demote_headings, render_document, PAGE_SEPARATOR};
pub use stats::{print_statistics, GenerationStats};

/// Name written into the document header and the default user agent
pub const GENERATOR_NAME: &str = env!("CARGO_PKG_NAME");

pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Layout version tag in the document header
pub const FORMAT_VERSION: &str = "llms-full-txt/1.0";
