//! # Recommendation orchestrator
//! events → interest mapping → per-article score → threshold → stable sort
//! → diversity cap → top-N → reasons → list metrics.
//!
//! `recommend_at` is pure; `recommend` adds the optional result cache.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{debug, info};

use crate::cache::{anon_hash, CacheKeyParts, CacheStatus, DynCache};
use crate::config::{RankingParams, RecommenderConfig};
use crate::diversity::apply_diversity_filter;
use crate::interest::InterestScorer;
use crate::metrics::{CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL};
use crate::model::{
    round_to, Article, Event, RecommendationMetrics, RecommendationResult, ScoredArticle,
};
use crate::scoring::{freshness_score, generate_reason, ArticleScorer};

pub struct Recommender {
    interest: InterestScorer,
    scorer: ArticleScorer,
    ranking: RankingParams,
    cache: Option<DynCache>,
}

impl Default for Recommender {
    fn default() -> Self {
        Self::from_config(&RecommenderConfig::default())
    }
}

impl Recommender {
    /// Uncached recommender built from configuration.
    pub fn from_config(cfg: &RecommenderConfig) -> Self {
        Self {
            interest: InterestScorer::new(cfg.interest.clone()),
            scorer: ArticleScorer::from_config(cfg),
            ranking: cfg.ranking,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: DynCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn interest(&self) -> &InterestScorer {
        &self.interest
    }

    pub fn ranking(&self) -> &RankingParams {
        &self.ranking
    }

    pub fn cache_backend(&self) -> Option<&'static str> {
        self.cache.as_ref().map(|c| c.name())
    }

    /// Rank `articles` for the user behind `events` at instant `now`.
    pub fn recommend_at(
        &self,
        events: &[Event],
        articles: &[Article],
        top_n: usize,
        context: &str,
        now: DateTime<Utc>,
    ) -> RecommendationResult {
        if articles.is_empty() {
            return RecommendationResult::default();
        }

        let interests = self.interest.compute_interest_score(events, now);

        let mut scored: Vec<(f64, &Article)> = articles
            .iter()
            .map(|a| {
                (
                    self.scorer.score_article(a, &interests, events, context, now),
                    a,
                )
            })
            .filter(|(score, _)| *score >= self.ranking.min_score_threshold)
            .collect();
        let passed = scored.len();

        // Stable: equal scores keep input order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut kept: Vec<ScoredArticle> = scored
            .into_iter()
            .map(|(score, a)| ScoredArticle {
                article: a.clone(),
                recommendation_score: score,
                recommendation_reason: String::new(),
            })
            .collect();
        kept = apply_diversity_filter(kept, self.ranking.max_per_category);
        kept.truncate(top_n);

        for s in kept.iter_mut() {
            s.recommendation_reason = generate_reason(&s.article, &interests);
        }

        debug!(
            candidates = articles.len(),
            passed_threshold = passed,
            returned = kept.len(),
            context,
            "ranked candidates"
        );

        let metrics = recommendation_metrics(&kept, now);
        RecommendationResult {
            recommendations: kept,
            metrics,
        }
    }

    /// Same as [`recommend_at`](Self::recommend_at) but consults the injected cache first.
    /// Requests without a `user_id` never touch the cache.
    pub async fn recommend(
        &self,
        user_id: Option<&str>,
        events: &[Event],
        articles: &[Article],
        top_n: usize,
        context: &str,
        now: DateTime<Utc>,
    ) -> (RecommendationResult, CacheStatus) {
        let user = user_id.map(anon_hash).unwrap_or_else(|| "-".to_string());

        let (Some(cache), Some(user_id)) = (self.cache.as_ref(), user_id) else {
            let result = self.recommend_at(events, articles, top_n, context, now);
            info!(user = %user, returned = result.recommendations.len(), cache = "BYPASS", "recommendations computed");
            return (result, CacheStatus::Bypass);
        };

        let key = CacheKeyParts {
            user_id,
            event_count: events.len(),
            context,
            top_n,
        }
        .key(articles.iter().map(|a| a.id.as_str()));

        if let Some(hit) = cache.get(&key).await {
            counter!(CACHE_HITS_TOTAL).increment(1);
            info!(user = %user, returned = hit.recommendations.len(), cache = "HIT", "recommendations served from cache");
            return (hit, CacheStatus::Hit);
        }

        counter!(CACHE_MISSES_TOTAL).increment(1);
        let result = self.recommend_at(events, articles, top_n, context, now);
        cache.put(key, result.clone()).await;
        info!(user = %user, returned = result.recommendations.len(), cache = "MISS", "recommendations computed");
        (result, CacheStatus::Miss)
    }
}

/// Unique-category ratio, coverage, mean freshness. Empty list → zeros.
///
/// `coverage` is computed with the same formula as `diversity`.
pub fn recommendation_metrics(list: &[ScoredArticle], now: DateTime<Utc>) -> RecommendationMetrics {
    if list.is_empty() {
        return RecommendationMetrics::default();
    }
    let n = list.len() as f64;
    let categories: HashSet<&str> = list.iter().map(|s| s.article.category.as_str()).collect();
    let ratio = round_to(categories.len() as f64 / n, 2);
    let freshness: f64 = list
        .iter()
        .map(|s| freshness_score(s.article.published_at.as_deref(), now))
        .sum();

    RecommendationMetrics {
        diversity: ratio,
        coverage: ratio,
        freshness: round_to(freshness / n, 2),
        total_recommendations: list.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::model::{EventData, EventKind};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn view(category: &str) -> Event {
        Event::new(
            EventKind::View,
            EventData {
                category: Some(category.into()),
                ..Default::default()
            },
        )
        .at(now())
    }

    fn popular(id: &str, category: &str, views: u64) -> Article {
        let mut a = Article::new(id, category);
        a.view_count = views;
        a
    }

    fn permissive() -> Recommender {
        let mut cfg = RecommenderConfig::default();
        cfg.ranking.min_score_threshold = 0.0;
        Recommender::from_config(&cfg)
    }

    #[test]
    fn single_matching_article_is_recommended() {
        let mut a = Article::new("1", "tech");
        a.published_at = Some(now().to_rfc3339());
        let r = Recommender::default().recommend_at(&[view("tech")], &[a], 5, "homepage", now());

        assert_eq!(r.recommendations.len(), 1);
        assert_eq!(r.recommendations[0].article.id, "1");
        assert!(r.recommendations[0].recommendation_score > 0.0);
        assert_eq!(r.metrics.total_recommendations, 1);
        assert_eq!(r.metrics.freshness, 1.0);
    }

    #[test]
    fn no_articles_means_empty_result() {
        let r = Recommender::default().recommend_at(&[view("tech")], &[], 5, "homepage", now());
        assert!(r.is_empty());
        assert_eq!(r.metrics, RecommendationMetrics::default());
    }

    #[test]
    fn third_article_of_a_category_is_dropped_before_lower_ranked_others() {
        let articles = vec![
            popular("t1", "tech", 1_000_000),
            popular("t2", "tech", 900_000),
            popular("t3", "tech", 800_000),
            popular("s1", "sports", 0),
        ];
        let r = permissive().recommend_at(&[], &articles, 5, "homepage", now());
        let ids: Vec<&str> = r
            .recommendations
            .iter()
            .map(|s| s.article.id.as_str())
            .collect();
        assert_eq!(ids, vec!["t1", "t2", "s1"]);
        // t3 outscored s1 but the category was already full.
        let scorer = ArticleScorer::default();
        let empty = Default::default();
        assert!(
            scorer.score_article(&articles[2], &empty, &[], "homepage", now())
                > scorer.score_article(&articles[3], &empty, &[], "homepage", now())
        );
    }

    #[test]
    fn threshold_and_top_n_cut() {
        let articles: Vec<Article> = (0..10)
            .map(|i| popular(&format!("a{i}"), &format!("c{i}"), 10u64.pow(i % 7)))
            .collect();
        let r = permissive().recommend_at(&[], &articles, 3, "homepage", now());
        assert_eq!(r.recommendations.len(), 3);
        let scores: Vec<f64> = r
            .recommendations
            .iter()
            .map(|s| s.recommendation_score)
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));

        let mut cfg = RecommenderConfig::default();
        cfg.ranking.min_score_threshold = 0.99;
        let strict = Recommender::from_config(&cfg).recommend_at(&[], &articles, 3, "homepage", now());
        assert!(strict.is_empty());
    }

    #[test]
    fn reasons_are_attached() {
        let events: Vec<Event> = vec![view("tech"), view("tech"), view("sports")];
        let articles = vec![popular("1", "tech", 0), popular("2", "sports", 5000)];
        let r = permissive().recommend_at(&events, &articles, 5, "homepage", now());
        let reason_of = |id: &str| {
            r.recommendations
                .iter()
                .find(|s| s.article.id == id)
                .map(|s| s.recommendation_reason.clone())
                .unwrap()
        };
        assert_eq!(reason_of("1"), "Because you're interested in tech");
        assert_eq!(reason_of("2"), "Popular article");
    }

    #[test]
    fn coverage_equals_diversity() {
        let list: Vec<ScoredArticle> = ["a", "a", "b"]
            .iter()
            .enumerate()
            .map(|(i, c)| ScoredArticle {
                article: Article::new(i.to_string(), *c),
                recommendation_score: 0.5,
                recommendation_reason: String::new(),
            })
            .collect();
        let m = recommendation_metrics(&list, now());
        assert_eq!(m.diversity, 0.67);
        assert_eq!(m.coverage, m.diversity);
        assert_eq!(m.freshness, 0.0);
        assert_eq!(m.total_recommendations, 3);
    }

    #[test]
    fn metrics_freshness_is_mean_of_sub_scores() {
        let mut fresh = Article::new("1", "a");
        fresh.published_at = Some(now().to_rfc3339());
        let mut week_old = Article::new("2", "b");
        week_old.published_at = Some((now() - Duration::days(10)).to_rfc3339());
        let list: Vec<ScoredArticle> = [fresh, week_old]
            .into_iter()
            .map(|article| ScoredArticle {
                article,
                recommendation_score: 0.3,
                recommendation_reason: String::new(),
            })
            .collect();
        let m = recommendation_metrics(&list, now());
        assert_eq!(m.freshness, 0.75);
        assert_eq!(m.diversity, 1.0);
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let events = vec![view("tech"), view("politics")];
        let articles = vec![popular("1", "tech", 10), popular("2", "politics", 20)];
        let r = Recommender::default();
        assert_eq!(
            r.recommend_at(&events, &articles, 5, "article_page", now()),
            r.recommend_at(&events, &articles, 5, "article_page", now())
        );
    }

    #[tokio::test]
    async fn cache_status_flows_through() {
        let articles = vec![popular("1", "tech", 5000)];
        let events = vec![view("tech")];

        let bare = permissive();
        let (_, status) = bare
            .recommend(Some("u"), &events, &articles, 5, "homepage", now())
            .await;
        assert_eq!(status, CacheStatus::Bypass);

        let cached = permissive().with_cache(Arc::new(InMemoryCache::new(
            std::time::Duration::from_secs(60),
            16,
        )));
        let (first, s1) = cached
            .recommend(Some("u"), &events, &articles, 5, "homepage", now())
            .await;
        let (second, s2) = cached
            .recommend(Some("u"), &events, &articles, 5, "homepage", now())
            .await;
        assert_eq!(s1, CacheStatus::Miss);
        assert_eq!(s2, CacheStatus::Hit);
        assert_eq!(first, second);
        assert_eq!(cached.cache_backend(), Some("in-memory"));
    }

    #[tokio::test]
    async fn anonymous_requests_skip_the_cache() {
        let articles = vec![popular("1", "tech", 5000), popular("2", "sports", 5000)];
        let cache = Arc::new(InMemoryCache::new(std::time::Duration::from_secs(60), 16));
        let cached = permissive().with_cache(cache.clone());

        let (_, s1) = cached
            .recommend(None, &[view("tech")], &articles, 5, "homepage", now())
            .await;
        let (_, s2) = cached
            .recommend(None, &[view("sports")], &articles, 5, "homepage", now())
            .await;
        assert_eq!(s1, CacheStatus::Bypass);
        assert_eq!(s2, CacheStatus::Bypass);
        assert!(cache.is_empty().await);
    }
}
