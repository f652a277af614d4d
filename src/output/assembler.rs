//! Size budget enforcement
//!
//! Per-page truncation runs first. The global budget then walks the pages
//! in order and stops at the first page that would push the running total
//! past `max_total_chars`; pages already included stay whole.

use crate::config::Limits;
use crate::crawler::PageResult;

/// Pages that made it into the document
#[derive(Debug, Clone, Default)]
pub struct BudgetedPages {
    pub pages: Vec<PageResult>,
    pub truncated_pages: usize,
    pub total_content_length: usize,
    pub global_limit_reached: bool,
}

/// Applies page count, per-page and total character limits
pub fn apply_budgets(mut pages: Vec<PageResult>, limits: &Limits) -> BudgetedPages {
    pages.truncate(limits.max_pages);

    for page in &mut pages {
        if page.truncate_to(limits.max_chars_per_page) {
            tracing::debug!(
                "Truncated {} from {} to {} chars",
                page.url,
                page.original_length.unwrap_or_default(),
                page.content_length
            );
        }
    }

    let mut total = 0;
    let mut included = Vec::with_capacity(pages.len());
    let mut global_limit_reached = false;

    for page in pages {
        if total + page.content_length > limits.max_total_chars {
            global_limit_reached = true;
            break;
        }
        total += page.content_length;
        included.push(page);
    }

    if global_limit_reached {
        tracing::warn!(
            "Total character budget of {} reached after {} pages",
            limits.max_total_chars,
            included.len()
        );
    }

    BudgetedPages {
        truncated_pages: included.iter().filter(|p| p.truncated).count(),
        pages: included,
        total_content_length: total,
        global_limit_reached,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::SkipReason;

    fn limits(max_pages: usize, per_page: usize, total: usize) -> Limits {
        Limits {
            max_pages,
            max_chars_per_page: per_page,
            max_total_chars: total,
        }
    }

    fn page(n: usize, len: usize) -> PageResult {
        PageResult::extracted(format!("https://example.com/{}", n), "t", "a".repeat(len))
    }

    #[test]
    fn test_within_budget_untouched() {
        let result = apply_budgets(vec![page(1, 10), page(2, 20)], &limits(10, 100, 1_000));
        assert_eq!(result.pages.len(), 2);
        assert_eq!(result.total_content_length, 30);
        assert_eq!(result.truncated_pages, 0);
        assert!(!result.global_limit_reached);
    }

    #[test]
    fn test_global_budget_stops_inclusion() {
        let result = apply_budgets(
            vec![page(1, 40), page(2, 40), page(3, 10), page(4, 5)],
            &limits(10, 100, 90),
        );
        assert_eq!(result.pages.len(), 3);
        assert_eq!(result.total_content_length, 90);
        assert!(result.global_limit_reached);
        assert!(result.pages.iter().all(|p| !p.truncated));
    }

    #[test]
    fn test_per_page_truncation_happens_first() {
        let result = apply_budgets(vec![page(1, 500), page(2, 50)], &limits(10, 200, 300));
        assert_eq!(result.pages.len(), 2);
        assert!(result.pages[0].truncated);
        assert!(result.pages[0].content_length <= 200);
        assert_eq!(result.pages[0].original_length, Some(500));
        assert_eq!(result.truncated_pages, 1);
        assert!(result.total_content_length <= 300);
    }

    #[test]
    fn test_page_cap() {
        let pages = (0..5).map(|n| page(n, 1)).collect();
        let result = apply_budgets(pages, &limits(3, 100, 1_000));
        assert_eq!(result.pages.len(), 3);
    }

    #[test]
    fn test_skipped_pages_cost_nothing() {
        let skipped = PageResult::skipped("https://example.com/x", SkipReason::TooLarge, None);
        let result = apply_budgets(vec![page(1, 10), skipped], &limits(10, 100, 10));
        assert_eq!(result.pages.len(), 2);
        assert!(!result.global_limit_reached);
    }
}
