//! # HTTP API
//! Axum router over the recommender, the interest model and the
//! performance predictor. Every handler reads `now` once and passes it down.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::cache::{anon_hash, InMemoryCache};
use crate::config::{normalize_context, RecommenderConfig};
use crate::error::ApiError;
use crate::interest::{InterestMapping, UserProfile};
use crate::metrics::{DURATION_MS, REQUESTS_TOTAL};
use crate::model::{Article, Event, RecommendationMetrics, ScoredArticle};
use crate::predict::{ArticleDraft, PerformancePrediction, PerformancePredictor};
use crate::recommend::Recommender;

pub const CACHE_HEADER: &str = "x-recommendation-cache";
const DEFAULT_CONTEXT: &str = "homepage";

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub predictor: Arc<PerformancePredictor>,
    pub config: Arc<RecommenderConfig>,
}

impl AppState {
    /// Wire components from config; the in-memory cache is attached when enabled.
    pub fn from_config(cfg: RecommenderConfig) -> Self {
        let mut recommender = Recommender::from_config(&cfg);
        if cfg.cache.enabled {
            let cache = InMemoryCache::new(Duration::from_millis(cfg.cache.ttl_ms), cfg.cache.capacity);
            recommender = recommender.with_cache(Arc::new(cache));
        }
        Self {
            recommender: Arc::new(recommender),
            predictor: Arc::new(PerformancePredictor::new()),
            config: Arc::new(cfg),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/recommendations", post(recommendations))
        .route("/interest-analysis", post(interest_analysis))
        .route("/user-profile", post(user_profile))
        .route("/predict-performance", post(predict_performance))
        .route("/system-stats", get(system_stats))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/* ----------------------------
Requests / responses
---------------------------- */

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_events: Vec<Event>,
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub top_n: Option<usize>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<ScoredArticle>,
    pub metrics: RecommendationMetrics,
    pub user_profile: UserProfile,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_events: Vec<Event>,
}

#[derive(Debug, Serialize)]
pub struct InterestAnalysisResponse {
    pub interest_scores: InterestMapping,
    pub user_profile: UserProfile,
    pub total_events: usize,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileStatistics {
    pub total_events: usize,
    pub unique_articles: usize,
    pub event_types: BTreeMap<String, usize>,
    pub analysis_date: String,
}

#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub statistics: ProfileStatistics,
}

/* ----------------------------
Handlers
---------------------------- */

async fn root() -> Json<Value> {
    Json(json!({
        "service": "newsroom-recommender",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "GET /health",
            "recommendations": "POST /recommendations",
            "interest_analysis": "POST /interest-analysis",
            "user_profile": "POST /user-profile",
            "predict_performance": "POST /predict-performance",
            "system_stats": "GET /system-stats",
            "metrics": "GET /metrics",
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "models": {
            "interest_scorer": true,
            "recommender": true,
            "performance_predictor": true,
            "cache": state.recommender.cache_backend().unwrap_or("disabled"),
        },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn recommendations(
    State(state): State<AppState>,
    Json(req): Json<RecommendationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    counter!(REQUESTS_TOTAL).increment(1);

    let ranking = state.recommender.ranking();
    let top_n = req.top_n.unwrap_or(ranking.default_top_n);
    if top_n == 0 || top_n > ranking.max_top_n {
        return Err(ApiError::validation(format!(
            "top_n must be between 1 and {}, got {}",
            ranking.max_top_n, top_n
        )));
    }
    let context = normalize_context(req.context.as_deref().unwrap_or(DEFAULT_CONTEXT));

    let now = Utc::now();
    let (result, cache) = state
        .recommender
        .recommend(
            req.user_id.as_deref(),
            &req.user_events,
            &req.articles,
            top_n,
            &context,
            now,
        )
        .await;
    let profile = state
        .recommender
        .interest()
        .user_profile(&req.user_events, now);

    let ms = started.elapsed().as_secs_f64() * 1000.0;
    histogram!(DURATION_MS).record(ms);
    info!(
        events = req.user_events.len(),
        candidates = req.articles.len(),
        returned = result.recommendations.len(),
        top_n,
        context = %context,
        cache = cache.as_str(),
        elapsed_ms = ms,
        "POST /recommendations"
    );

    let body = RecommendationResponse {
        recommendations: result.recommendations,
        metrics: result.metrics,
        user_profile: profile,
        timestamp: now.to_rfc3339(),
    };
    Ok(([(CACHE_HEADER, cache.as_str())], Json(body)))
}

async fn interest_analysis(
    State(state): State<AppState>,
    Json(req): Json<EventsRequest>,
) -> Json<InterestAnalysisResponse> {
    let now = Utc::now();
    let profile = state
        .recommender
        .interest()
        .user_profile(&req.user_events, now);
    info!(
        user = %req.user_id.as_deref().map(anon_hash).unwrap_or_default(),
        events = req.user_events.len(),
        labels = profile.interest_scores.len(),
        "POST /interest-analysis"
    );
    Json(InterestAnalysisResponse {
        interest_scores: profile.interest_scores.clone(),
        user_profile: profile,
        total_events: req.user_events.len(),
        timestamp: now.to_rfc3339(),
    })
}

async fn user_profile(
    State(state): State<AppState>,
    Json(req): Json<EventsRequest>,
) -> Json<UserProfileResponse> {
    let now = Utc::now();
    let profile = state
        .recommender
        .interest()
        .user_profile(&req.user_events, now);
    let statistics = profile_statistics(&req.user_events, now.to_rfc3339());
    info!(
        user = %req.user_id.as_deref().map(anon_hash).unwrap_or_default(),
        events = statistics.total_events,
        engagement = ?profile.engagement_level,
        "POST /user-profile"
    );
    Json(UserProfileResponse {
        profile,
        statistics,
    })
}

fn profile_statistics(events: &[Event], analysis_date: String) -> ProfileStatistics {
    let unique_articles = events
        .iter()
        .filter_map(Event::article_ref)
        .collect::<HashSet<_>>()
        .len();
    let mut event_types: BTreeMap<String, usize> = BTreeMap::new();
    for e in events {
        *event_types.entry(e.event_type.as_str().to_string()).or_insert(0) += 1;
    }
    ProfileStatistics {
        total_events: events.len(),
        unique_articles,
        event_types,
        analysis_date,
    }
}

async fn predict_performance(
    State(state): State<AppState>,
    Json(draft): Json<ArticleDraft>,
) -> Result<Json<PerformancePrediction>, ApiError> {
    if draft.title.trim().is_empty() && draft.content.trim().is_empty() {
        return Err(ApiError::validation("title or content is required"));
    }
    let prediction = state.predictor.predict_at(&draft, Utc::now());
    info!(
        category = %draft.category,
        predicted_views = prediction.predicted_views,
        advice = prediction.recommendations.len(),
        "POST /predict-performance"
    );
    Ok(Json(prediction))
}

async fn system_stats(State(state): State<AppState>) -> Json<Value> {
    let cfg = &state.config;
    Json(json!({
        "service": "newsroom-recommender",
        "version": env!("CARGO_PKG_VERSION"),
        "algorithm_weights": cfg.weights,
        "ranking": cfg.ranking,
        "interest": cfg.interest,
        "context_multipliers": cfg.contexts,
        "cache": {
            "enabled": cfg.cache.enabled,
            "ttl_ms": cfg.cache.ttl_ms,
            "capacity": cfg.cache.capacity,
            "backend": state.recommender.cache_backend(),
        },
        "capabilities": [
            "interest_analysis",
            "content_based_recommendations",
            "diversity_filter",
            "user_profiling",
            "performance_prediction",
        ],
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
