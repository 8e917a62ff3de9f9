// src/lib.rs
// Public library surface for the binary and the integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod diversity;
pub mod error;
pub mod interest;
pub mod metrics;
pub mod model;
pub mod predict;
pub mod recommend;
pub mod scoring;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::RecommenderConfig;
pub use crate::interest::{InterestScorer, UserProfile};
pub use crate::model::{Article, Event, EventKind, RecommendationResult};
pub use crate::predict::{ArticleDraft, PerformancePredictor};
pub use crate::recommend::Recommender;

use axum::Router;
use tracing::info;

/// Full in-process application: config from disk/env, API routes and `/metrics`.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = RecommenderConfig::load()?;
    let metrics = metrics::Metrics::init(cfg.cache.ttl_ms);

    info!(
        cache_enabled = cfg.cache.enabled,
        cache_ttl_ms = cfg.cache.ttl_ms,
        min_score = cfg.ranking.min_score_threshold,
        "recommender configured"
    );

    let state = AppState::from_config(cfg);
    Ok(api::router(state).merge(metrics.router()))
}
