//! Content categorization and filtering
//!
//! # Scoring
//!
//! | Signal | Points |
//! |--------|--------|
//! | URL contains a category URL pattern (case-insensitive) | +10 each |
//! | Content pattern regex matches title + content | +2 per match |
//!
//! The highest-scoring enabled category wins, ties keep the first listed,
//! and a page scoring zero everywhere falls into the default category.
//!
//! Relevance is `0.5 + 0.05 * priority keywords found + 0.1 if longer than
//! 1000 chars + 0.01 * category priority`, clamped to `[0, 1]`.

use crate::config::{ContentCategory, FilterConfig};
use crate::crawler::PageResult;
use crate::ConfigError;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

const URL_PATTERN_POINTS: usize = 10;
const CONTENT_MATCH_POINTS: usize = 2;
const BASE_RELEVANCE: f64 = 0.5;
const KEYWORD_BONUS: f64 = 0.05;
const LONG_CONTENT_CHARS: usize = 1000;
const LONG_CONTENT_BONUS: f64 = 0.1;
const PRIORITY_WEIGHT: f64 = 0.01;

/// A page with its category assignment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedPageResult {
    #[serde(flatten)]
    pub page: PageResult,
    pub category: String,
    pub category_priority: i32,
    pub relevance_score: f64,
    pub matched_keywords: Vec<String>,
}

/// Pages after filtering
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Scored pages in output order, followed by unscored failed pages
    pub pages: Vec<PageResult>,

    /// Category details for the scored pages, same order
    pub categorized: Vec<CategorizedPageResult>,

    pub filtered_out: usize,
}

#[derive(Debug)]
struct CompiledCategory {
    category: ContentCategory,
    url_patterns: Vec<String>,
    content_patterns: Vec<Regex>,
}

/// Compiled categorizer
#[derive(Debug)]
pub struct ContentFilter {
    config: FilterConfig,
    categories: Vec<CompiledCategory>,
}

impl ContentFilter {
    /// Compiles the category taxonomy
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPattern` for a content pattern that is
    /// not a valid regular expression.
    pub fn new(config: FilterConfig) -> Result<Self, ConfigError> {
        let categories = config
            .categories
            .iter()
            .map(|category| {
                let content_patterns = category
                    .content_patterns
                    .iter()
                    .map(|p| {
                        RegexBuilder::new(p)
                            .case_insensitive(true)
                            .build()
                            .map_err(|e| {
                                ConfigError::InvalidPattern(format!(
                                    "category '{}' pattern '{}': {}",
                                    category.id, p, e
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(CompiledCategory {
                    category: category.clone(),
                    url_patterns: category
                        .url_patterns
                        .iter()
                        .map(|p| p.to_lowercase())
                        .collect(),
                    content_patterns,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { config, categories })
    }

    /// Assigns a category and relevance score to one page
    pub fn categorize(&self, page: PageResult) -> CategorizedPageResult {
        let url = page.url.to_lowercase();
        let haystack = format!("{}\n{}", page.title, page.content);

        let mut best: Option<(&CompiledCategory, usize)> = None;
        for compiled in self.categories.iter().filter(|c| c.category.enabled) {
            let score = category_score(compiled, &url, &haystack);
            if score > 0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((compiled, score));
            }
        }

        let (category, priority) = match best {
            Some((compiled, _)) => (compiled.category.id.clone(), compiled.category.priority),
            None => {
                let id = self.config.default_category.clone();
                let priority = self.find(&id).map_or(0, |c| c.category.priority);
                (id, priority)
            }
        };

        let lowered = haystack.to_lowercase();
        let matched_keywords: Vec<String> = self
            .config
            .priority_keywords
            .iter()
            .filter(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))
            .cloned()
            .collect();

        let mut relevance = BASE_RELEVANCE + KEYWORD_BONUS * matched_keywords.len() as f64;
        if page.content_length > LONG_CONTENT_CHARS {
            relevance += LONG_CONTENT_BONUS;
        }
        relevance += PRIORITY_WEIGHT * f64::from(priority);

        CategorizedPageResult {
            page,
            category,
            category_priority: priority,
            relevance_score: relevance.clamp(0.0, 1.0),
            matched_keywords,
        }
    }

    /// Scores, filters, sorts and caps the pages
    ///
    /// Only successful pages are scored; failed pages are appended after the
    /// scored ones in their original order.
    pub fn apply(&self, pages: Vec<PageResult>) -> FilterOutcome {
        let (successful, failed): (Vec<_>, Vec<_>) = pages.into_iter().partition(|p| p.success);
        let scored_total = successful.len();

        let mut kept: Vec<CategorizedPageResult> = successful
            .into_iter()
            .map(|page| self.categorize(page))
            .filter(|c| self.passes(c))
            .collect();

        kept.sort_by(|a, b| {
            b.category_priority
                .cmp(&a.category_priority)
                .then_with(|| {
                    b.relevance_score
                        .partial_cmp(&a.relevance_score)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| b.page.content_length.cmp(&a.page.content_length))
        });

        let mut per_category: HashMap<String, usize> = HashMap::new();
        kept.retain(|c| {
            let count = per_category.entry(c.category.clone()).or_insert(0);
            *count += 1;
            match self.find(&c.category).and_then(|cat| cat.category.max_pages) {
                Some(limit) => *count <= limit,
                None => true,
            }
        });

        let filtered_out = scored_total - kept.len();
        tracing::info!(
            "Content filter kept {} of {} pages ({} filtered out)",
            kept.len(),
            scored_total,
            filtered_out
        );

        let mut pages: Vec<PageResult> = kept.iter().map(|c| c.page.clone()).collect();
        pages.extend(failed);

        FilterOutcome {
            pages,
            categorized: kept,
            filtered_out,
        }
    }

    fn passes(&self, page: &CategorizedPageResult) -> bool {
        let length = page.page.content_length;
        if length < self.config.min_content_length {
            tracing::debug!("Filtered {}: too short ({} chars)", page.page.url, length);
            return false;
        }
        if self.config.max_content_length.is_some_and(|max| length > max) {
            tracing::debug!("Filtered {}: too long ({} chars)", page.page.url, length);
            return false;
        }

        let text = format!("{}\n{}", page.page.title, page.page.content).to_lowercase();
        if let Some(keyword) = self
            .config
            .exclude_keywords
            .iter()
            .find(|k| !k.is_empty() && text.contains(&k.to_lowercase()))
        {
            tracing::debug!("Filtered {}: contains '{}'", page.page.url, keyword);
            return false;
        }

        if self.find(&page.category).is_some_and(|c| !c.category.enabled) {
            tracing::debug!("Filtered {}: category '{}' disabled", page.page.url, page.category);
            return false;
        }

        true
    }

    fn find(&self, id: &str) -> Option<&CompiledCategory> {
        self.categories.iter().find(|c| c.category.id == id)
    }
}

fn category_score(compiled: &CompiledCategory, url: &str, haystack: &str) -> usize {
    let url_score = compiled
        .url_patterns
        .iter()
        .filter(|p| !p.is_empty() && url.contains(p.as_str()))
        .count()
        * URL_PATTERN_POINTS;

    let content_score: usize = compiled
        .content_patterns
        .iter()
        .map(|re| re.find_iter(haystack).count() * CONTENT_MATCH_POINTS)
        .sum();

    url_score + content_score
}
