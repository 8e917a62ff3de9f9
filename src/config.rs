// src/config.rs
//! Runtime configuration for the recommender, loaded from TOML.
//!
//! Resolution order:
//! 1) `$RECOMMENDER_CONFIG_PATH`, else `config/recommender.toml`
//! 2) built-in defaults when the file does not exist
//! 3) env overrides: `RECOMMENDER_MIN_SCORE` (clamped to 0..=1), `RECOMMENDER_CACHE_TTL_MS`
//!
//! Every section and key is optional; absent keys keep their defaults.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::model::EventKind;

pub const DEFAULT_CONFIG_PATH: &str = "config/recommender.toml";
pub const ENV_CONFIG_PATH: &str = "RECOMMENDER_CONFIG_PATH";
pub const ENV_MIN_SCORE: &str = "RECOMMENDER_MIN_SCORE";
pub const ENV_CACHE_TTL_MS: &str = "RECOMMENDER_CACHE_TTL_MS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub interest: InterestParams,
    pub weights: AlgorithmWeights,
    pub ranking: RankingParams,
    pub contexts: ContextMultipliers,
    pub cache: CacheParams,
}

/// Parameters of the interest model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterestParams {
    /// Per-day decay factor applied to event scores.
    pub decay_rate: f64,
    /// Lower bound for both event weight and decay.
    pub min_factor: f64,
    pub min_interest_score: f64,
    pub max_interest_score: f64,
    /// Share of an event's score credited to each of its tags.
    pub tag_share: f64,
    pub event_weights: EventWeights,
}

impl Default for InterestParams {
    fn default() -> Self {
        Self {
            decay_rate: 0.95,
            min_factor: 0.1,
            min_interest_score: 0.1,
            max_interest_score: 100.0,
            tag_share: 0.5,
            event_weights: EventWeights::default(),
        }
    }
}

/// Base weight per event kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventWeights {
    pub article_view: f64,
    pub article_like: f64,
    pub article_share: f64,
    pub article_comment: f64,
    pub article_bookmark: f64,
    pub reading_time: f64,
    pub scroll_depth: f64,
    pub search_query: f64,
    pub click_element: f64,
    pub unknown: f64,
}

impl Default for EventWeights {
    fn default() -> Self {
        Self {
            article_view: 1.0,
            article_like: 3.0,
            article_share: 2.5,
            article_comment: 2.0,
            article_bookmark: 2.5,
            reading_time: 1.5,
            scroll_depth: 0.5,
            search_query: 1.0,
            click_element: 0.3,
            unknown: 0.1,
        }
    }
}

impl EventWeights {
    pub fn weight_for(&self, kind: EventKind) -> f64 {
        match kind {
            EventKind::View => self.article_view,
            EventKind::Like => self.article_like,
            EventKind::Share => self.article_share,
            EventKind::Comment => self.article_comment,
            EventKind::Bookmark => self.article_bookmark,
            EventKind::ReadingTime => self.reading_time,
            EventKind::ScrollDepth => self.scroll_depth,
            EventKind::SearchQuery => self.search_query,
            EventKind::Click => self.click_element,
            EventKind::Other => self.unknown,
        }
    }
}

/// Blend weights of the four additive sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmWeights {
    pub content_based: f64,
    pub collaborative: f64,
    pub popularity: f64,
    pub diversity: f64,
}

impl Default for AlgorithmWeights {
    fn default() -> Self {
        Self {
            content_based: 0.4,
            collaborative: 0.3,
            popularity: 0.2,
            diversity: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingParams {
    pub freshness_weight: f64,
    pub min_score_threshold: f64,
    pub max_per_category: usize,
    pub default_top_n: usize,
    pub max_top_n: usize,
}

impl Default for RankingParams {
    fn default() -> Self {
        Self {
            freshness_weight: 0.2,
            min_score_threshold: 0.1,
            max_per_category: 2,
            default_top_n: 5,
            max_top_n: 20,
        }
    }
}

/// Score multiplier per display context (homepage, article page, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextMultipliers {
    pub default_multiplier: f64,
    pub multipliers: BTreeMap<String, f64>,
}

impl Default for ContextMultipliers {
    fn default() -> Self {
        let multipliers = [
            ("homepage", 1.0),
            ("article_page", 1.2),
            ("category_page", 1.1),
            ("search_results", 0.9),
            ("profile_page", 1.3),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            default_multiplier: 1.0,
            multipliers,
        }
    }
}

impl ContextMultipliers {
    /// Case-insensitive lookup; unknown contexts get `default_multiplier`.
    pub fn multiplier_for(&self, context: &str) -> f64 {
        let key = normalize_context(context);
        self.multipliers
            .get(&key)
            .copied()
            .unwrap_or(self.default_multiplier)
    }
}

/// Lowercase, trim, and fold dashes/spaces into underscores ("Article-Page" → "article_page").
pub fn normalize_context(s: &str) -> String {
    s.trim()
        .to_ascii_lowercase()
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheParams {
    pub enabled: bool,
    pub ttl_ms: u64,
    pub capacity: usize,
}

impl Default for CacheParams {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: 300_000,
            capacity: 1024,
        }
    }
}

impl RecommenderConfig {
    /// Load using `RECOMMENDER_CONFIG_PATH` or `config/recommender.toml`, then apply env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Load from an explicit path. A missing file yields defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "recommender config not found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading recommender config from {}", path.display()))?;
        let cfg = Self::from_toml_str(&content)
            .with_context(|| format!("parsing recommender config {}", path.display()))?;
        info!(path = %path.display(), "recommender config loaded");
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let i = &self.interest;
        if !(i.min_interest_score < i.max_interest_score) {
            anyhow::bail!(
                "interest.min_interest_score ({}) must be below max_interest_score ({})",
                i.min_interest_score,
                i.max_interest_score
            );
        }
        if !(0.0..=1.0).contains(&i.decay_rate) {
            anyhow::bail!("interest.decay_rate must be within 0..=1, got {}", i.decay_rate);
        }
        let r = &self.ranking;
        if r.max_top_n == 0 || r.default_top_n == 0 || r.default_top_n > r.max_top_n {
            anyhow::bail!(
                "ranking.default_top_n ({}) must be within 1..=max_top_n ({})",
                r.default_top_n,
                r.max_top_n
            );
        }
        Ok(())
    }

    /// Env overrides win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Some(t) = parse_threshold_env(std::env::var(ENV_MIN_SCORE).ok()) {
            self.ranking.min_score_threshold = t;
        }
        if let Some(ttl) = std::env::var(ENV_CACHE_TTL_MS)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            self.cache.ttl_ms = ttl;
        }
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}
