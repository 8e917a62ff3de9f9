// src/diversity.rs
//! Diversity filter: cap how many articles of one category survive into the final list.
//!
//! - Input is expected to be sorted by score (descending); order is preserved.
//! - An article is admitted while its category counter is below `max_per_category`.
//! - Articles without a category share the empty-label bucket.

use std::collections::HashMap;

use crate::model::ScoredArticle;

pub const DEFAULT_MAX_PER_CATEGORY: usize = 2;

/// Anything that belongs to a category can be diversified.
pub trait Categorized {
    fn category(&self) -> &str;
}

impl Categorized for ScoredArticle {
    fn category(&self) -> &str {
        &self.article.category
    }
}

/// Single stable pass; later items of a saturated category are dropped.
pub fn apply_diversity_filter<T: Categorized>(sorted: Vec<T>, max_per_category: usize) -> Vec<T> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    sorted
        .into_iter()
        .filter(|item| {
            let n = counts.entry(item.category().to_string()).or_insert(0);
            if *n < max_per_category {
                *n += 1;
                true
            } else {
                false
            }
        })
        .collect()
}
