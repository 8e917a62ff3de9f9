//! Multi-signal article scoring.
//!
//! Four additive sub-scores, each normalized to [0,1]:
//! - `content`       : affinity of the user to the article's category, tags and author
//! - `collaborative` : how often this user already touched the article
//! - `popularity`    : log-damped views / likes / comments
//! - `diversity`     : inverse of the user's interest in the category (exploration)
//!
//! `total = Σ w_i·s_i × (1 + freshness × freshness_weight) × context_multiplier`,
//! rounded to 3 decimals.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{AlgorithmWeights, ContextMultipliers, RecommenderConfig};
use crate::interest::InterestMapping;
use crate::model::{days_elapsed, parse_timestamp, round_to, Article, Event};

const CATEGORY_SHARE: f64 = 0.4;
const TAG_SHARE: f64 = 0.3;
const AUTHOR_SHARE: f64 = 0.3;
const INTERACTION_STEP: f64 = 0.1;

const REASON_CATEGORY_MIN: f64 = 50.0;
const REASON_TAG_MIN: f64 = 40.0;
const REASON_POPULAR_VIEWS: u64 = 1000;

/// Per-article breakdown; handy for debugging and for metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SubScores {
    pub content: f64,
    pub collaborative: f64,
    pub popularity: f64,
    pub diversity: f64,
    pub freshness: f64,
    pub context_multiplier: f64,
}

impl SubScores {
    /// Blend into the final (unrounded) score.
    pub fn blend(&self, w: &AlgorithmWeights, freshness_weight: f64) -> f64 {
        let base = self.content * w.content_based
            + self.collaborative * w.collaborative
            + self.popularity * w.popularity
            + self.diversity * w.diversity;
        base * (1.0 + self.freshness * freshness_weight) * self.context_multiplier
    }
}

#[derive(Debug, Clone)]
pub struct ArticleScorer {
    weights: AlgorithmWeights,
    freshness_weight: f64,
    contexts: ContextMultipliers,
}

impl Default for ArticleScorer {
    fn default() -> Self {
        Self::from_config(&RecommenderConfig::default())
    }
}

impl ArticleScorer {
    pub fn from_config(cfg: &RecommenderConfig) -> Self {
        Self {
            weights: cfg.weights,
            freshness_weight: cfg.ranking.freshness_weight,
            contexts: cfg.contexts.clone(),
        }
    }

    pub fn breakdown(
        &self,
        article: &Article,
        interests: &InterestMapping,
        events: &[Event],
        context: &str,
        now: DateTime<Utc>,
    ) -> SubScores {
        SubScores {
            content: content_based_score(article, interests),
            collaborative: collaborative_score(article, events),
            popularity: popularity_score(article),
            diversity: diversity_score(article, interests),
            freshness: freshness_score(article.published_at.as_deref(), now),
            context_multiplier: self.contexts.multiplier_for(context),
        }
    }

    /// Final ranking score, rounded to 3 decimals. Never fails; absent fields score zero.
    pub fn score_article(
        &self,
        article: &Article,
        interests: &InterestMapping,
        events: &[Event],
        context: &str,
        now: DateTime<Utc>,
    ) -> f64 {
        let parts = self.breakdown(article, interests, events, context, now);
        round_to(parts.blend(&self.weights, self.freshness_weight), 3)
    }
}

fn interest_of(interests: &InterestMapping, label: &str) -> f64 {
    if label.is_empty() {
        return 0.0;
    }
    interests.get(label).copied().unwrap_or(0.0)
}

/// Category ×0.4 + mean tag interest ×0.3 + author ×0.3, scaled by 1/100 and capped at 1.
///
/// The tag mean runs over all article tags; tags the user never touched count as 0.
pub fn content_based_score(article: &Article, interests: &InterestMapping) -> f64 {
    let mut score = interest_of(interests, &article.category) * CATEGORY_SHARE;

    if !article.tags.is_empty() {
        let sum: f64 = article.tags.iter().map(|t| interest_of(interests, t)).sum();
        score += sum / article.tags.len() as f64 * TAG_SHARE;
    }

    if let Some(author) = article.author.as_deref() {
        score += interest_of(interests, author) * AUTHOR_SHARE;
    }

    (score / 100.0).min(1.0)
}

/// Placeholder collaborative signal: counts this user's own events that reference
/// the article. There is no cross-user data in the request.
pub fn collaborative_score(article: &Article, events: &[Event]) -> f64 {
    let hits = events
        .iter()
        .filter(|e| e.article_ref() == Some(article.id.as_str()))
        .count();
    (hits as f64 * INTERACTION_STEP).min(1.0)
}

/// Log-damped engagement so viral counts don't dominate.
pub fn popularity_score(article: &Article) -> f64 {
    let ln1p = |n: u64| (n as f64).ln_1p();
    let raw = ln1p(article.view_count) * 0.5
        + ln1p(article.like_count) * 0.3
        + ln1p(article.comment_count) * 0.2;
    (raw / 10.0).min(1.0)
}

pub fn diversity_score(article: &Article, interests: &InterestMapping) -> f64 {
    1.0 - (interest_of(interests, &article.category) / 100.0).min(1.0)
}

/// Step function on article age in whole days. Missing or unparseable date → 0.0.
pub fn freshness_score(published_at: Option<&str>, now: DateTime<Utc>) -> f64 {
    let Some(published) = published_at.and_then(parse_timestamp) else {
        return 0.0;
    };
    match days_elapsed(now, published) {
        d if d < 1 => 1.0,
        d if d < 7 => 0.8,
        d if d < 30 => 0.5,
        _ => 0.2,
    }
}

/// First applicable reason wins: strong category interest, a followed tag,
/// raw popularity, then a generic fallback.
pub fn generate_reason(article: &Article, interests: &InterestMapping) -> String {
    if interest_of(interests, &article.category) > REASON_CATEGORY_MIN {
        return format!("Because you're interested in {}", article.category);
    }
    if let Some(tag) = article
        .tags
        .iter()
        .find(|t| interest_of(interests, t) > REASON_TAG_MIN)
    {
        return format!("Because you read about {tag}");
    }
    if article.view_count > REASON_POPULAR_VIEWS {
        return "Popular article".to_string();
    }
    "Might interest you".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventData, EventKind};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 9, 30, 0).unwrap()
    }

    fn interests(pairs: &[(&str, f64)]) -> InterestMapping {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn article_aged(days: i64) -> Article {
        let mut a = Article::new("a1", "tech");
        a.published_at = Some((now() - Duration::days(days)).to_rfc3339());
        a
    }

    #[test]
    fn freshness_is_a_decreasing_step_function() {
        let n = now();
        let at = |d: i64| freshness_score(Some(&(n - Duration::days(d)).to_rfc3339()), n);
        assert_eq!(at(0), 1.0);
        assert_eq!(at(3), 0.8);
        assert_eq!(at(10), 0.5);
        assert_eq!(at(60), 0.2);
        assert_eq!(freshness_score(None, n), 0.0);
        assert_eq!(freshness_score(Some("garbage"), n), 0.0);
        // Future publish dates count as fresh.
        assert_eq!(at(-2), 1.0);
    }

    #[test]
    fn content_score_blends_category_tags_and_author() {
        let mut a = Article::new("1", "tech");
        a.tags = vec!["ai".into(), "unknown".into()];
        a.author = Some("Lina".into());
        let m = interests(&[("tech", 100.0), ("ai", 80.0), ("Lina", 50.0)]);
        // 100×0.4 + mean(80, 0)×0.3 + 50×0.3 = 40 + 12 + 15 = 67 → 0.67
        assert!((content_based_score(&a, &m) - 0.67).abs() < 1e-9);
    }

    #[test]
    fn content_score_is_capped() {
        let mut a = Article::new("1", "tech");
        a.tags = vec!["ai".into()];
        a.author = Some("Lina".into());
        let m = interests(&[("tech", 100.0), ("ai", 100.0), ("Lina", 100.0)]);
        assert_eq!(content_based_score(&a, &m), 1.0);
        assert_eq!(content_based_score(&Article::new("2", ""), &m), 0.0);
    }

    #[test]
    fn collaborative_counts_own_interactions_and_caps() {
        let a = Article::new("42", "tech");
        let touch = |id: &str| {
            Event::new(
                EventKind::View,
                EventData {
                    article_id: Some(id.into()),
                    ..Default::default()
                },
            )
        };
        let events = vec![touch("42"), touch("42"), touch("7")];
        assert!((collaborative_score(&a, &events) - 0.2).abs() < 1e-9);

        let mut top_level = Event::new(EventKind::Like, EventData::default());
        top_level.article_id = Some("42".into());
        assert!((collaborative_score(&a, &[top_level]) - 0.1).abs() < 1e-9);

        let many: Vec<Event> = (0..15).map(|_| touch("42")).collect();
        assert_eq!(collaborative_score(&a, &many), 1.0);
    }

    #[test]
    fn popularity_is_log_damped_and_capped() {
        let mut a = Article::new("1", "x");
        assert_eq!(popularity_score(&a), 0.0);
        a.view_count = 1000;
        let expected = (1001f64).ln() * 0.5 / 10.0;
        assert!((popularity_score(&a) - expected).abs() < 1e-12);
        a.view_count = u64::MAX;
        a.like_count = u64::MAX;
        a.comment_count = u64::MAX;
        assert_eq!(popularity_score(&a), 1.0);
    }

    #[test]
    fn score_is_monotone_in_views_and_likes() {
        let s = ArticleScorer::default();
        let m = interests(&[("tech", 60.0)]);
        let mut prev = f64::MIN;
        for views in [0u64, 1, 10, 100, 1_000, 10_000, 1_000_000] {
            for likes in [0u64, 5, 500] {
                let mut a = article_aged(2);
                a.view_count = views;
                a.like_count = likes;
                let score = s.score_article(&a, &m, &[], "homepage", now());
                if likes == 0 {
                    assert!(score >= prev, "views={views} score={score} prev={prev}");
                    prev = score;
                }
                let mut more_likes = a.clone();
                more_likes.like_count += 10;
                assert!(s.score_article(&more_likes, &m, &[], "homepage", now()) >= score);
            }
        }
    }

    #[test]
    fn total_follows_formula() {
        let s = ArticleScorer::default();
        let m = interests(&[("tech", 50.0)]);
        let mut a = article_aged(0);
        a.view_count = 100;
        // content 0.2, collaborative 0, popularity ln(101)×0.05, diversity 0.5, freshness 1.0
        let pop = (101f64).ln() * 0.5 / 10.0;
        let base = 0.2 * 0.4 + pop * 0.2 + 0.5 * 0.1;
        let expected = round_to(base * 1.2 * 1.2, 3);
        assert_eq!(s.score_article(&a, &m, &[], "article_page", now()), expected);
    }

    #[test]
    fn context_multiplier_scales_score() {
        let s = ArticleScorer::default();
        let m = interests(&[("tech", 80.0)]);
        let a = article_aged(1);
        let home = s.breakdown(&a, &m, &[], "homepage", now());
        let profile = s.breakdown(&a, &m, &[], "profile_page", now());
        let unknown = s.breakdown(&a, &m, &[], "kiosk", now());
        assert_eq!(home.context_multiplier, 1.0);
        assert_eq!(profile.context_multiplier, 1.3);
        assert_eq!(unknown.context_multiplier, 1.0);
    }

    #[test]
    fn scoring_is_deterministic_for_fixed_now() {
        let s = ArticleScorer::default();
        let m = interests(&[("tech", 42.0), ("ai", 77.0)]);
        let mut a = article_aged(5);
        a.tags = vec!["ai".into()];
        a.view_count = 321;
        let first = s.score_article(&a, &m, &[], "category_page", now());
        let second = s.score_article(&a, &m, &[], "category_page", now());
        assert_eq!(first, second);
    }

    #[test]
    fn bare_article_still_scores_through_diversity() {
        let s = ArticleScorer::default();
        let a = Article::new("x", "");
        // Only diversity contributes: 1.0 × 0.1
        assert_eq!(
            s.score_article(&a, &InterestMapping::new(), &[], "homepage", now()),
            0.1
        );
    }

    #[test]
    fn reason_priority() {
        let mut a = Article::new("1", "tech");
        a.tags = vec!["ai".into(), "space".into()];
        a.view_count = 5000;

        let strong_cat = interests(&[("tech", 51.0), ("space", 90.0)]);
        assert_eq!(
            generate_reason(&a, &strong_cat),
            "Because you're interested in tech"
        );

        let tag_only = interests(&[("tech", 50.0), ("ai", 40.0), ("space", 41.0)]);
        assert_eq!(generate_reason(&a, &tag_only), "Because you read about space");

        assert_eq!(
            generate_reason(&a, &InterestMapping::new()),
            "Popular article"
        );

        a.view_count = 1000;
        assert_eq!(
            generate_reason(&a, &InterestMapping::new()),
            "Might interest you"
        );
    }
}
