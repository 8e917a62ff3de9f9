//! Heuristic engagement forecast for an article draft.
//!
//! Numbers come from content length, author reach and a per-category
//! multiplier; confidence is fixed at 0.3. The editorial advice and the
//! publishing window are rule based.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{parse_timestamp, round_to};

const BASE_VIEWS_CAP: f64 = 10_000.0;
const BASE_ENGAGEMENT_CAP: f64 = 1_000.0;
const HEURISTIC_CONFIDENCE: f64 = 0.3;
const PEAK_DELAY_HOURS: i64 = 6;
const DEFAULT_BEST_HOURS: &[u32] = &[9, 12, 15, 20];
const SENTENCE_ENDS: &[char] = &['.', '!', '?', '؟'];

/// Broad editorial section. The CMS sends English or Arabic labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Politics,
    Sports,
    Economy,
    Technology,
    Health,
    Entertainment,
    Other,
}

impl Section {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "politics" | "سياسة" => Section::Politics,
            "sports" | "sport" | "رياضة" => Section::Sports,
            "economy" | "business" | "اقتصاد" => Section::Economy,
            "technology" | "tech" | "تقنية" => Section::Technology,
            "health" | "صحة" => Section::Health,
            "entertainment" | "ترفيه" => Section::Entertainment,
            _ => Section::Other,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Section::Politics => 1.5,
            Section::Sports => 2.0,
            Section::Economy => 1.3,
            Section::Technology => 1.1,
            Section::Health => 1.2,
            Section::Entertainment => 1.8,
            Section::Other => 1.0,
        }
    }

    /// UTC hours with the best audience for this section.
    pub fn best_hours(&self) -> &'static [u32] {
        match self {
            Section::Politics => &[8, 12, 18],
            Section::Sports => &[16, 20, 22],
            Section::Economy => &[9, 13, 17],
            Section::Technology => &[10, 14, 19],
            Section::Entertainment => &[18, 20, 21],
            Section::Health | Section::Other => DEFAULT_BEST_HOURS,
        }
    }
}

/// Article as submitted for a forecast. Everything but the text is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub author_followers: u64,
    /// Planned publication time (ISO-8601); defaults to the request time.
    pub publish_time: Option<String>,
    /// Character count; derived from `content` when zero.
    pub content_length: u64,
    /// Minutes.
    pub reading_time: u32,
    pub image_count: u32,
    pub video_count: u32,
    pub internal_links: u32,
    pub external_links: u32,
    pub author_reputation: f64,
    pub topic_trending_score: f64,
    pub seasonal_factor: f64,
}

impl ArticleDraft {
    fn effective_length(&self) -> u64 {
        if self.content_length > 0 {
            self.content_length
        } else {
            self.content.chars().count() as u64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformancePrediction {
    pub predicted_views: u64,
    pub predicted_engagement: f64,
    pub predicted_reading_time: u32,
    pub predicted_shares: u64,
    pub predicted_comments: u64,
    pub confidence_score: f64,
    pub factors_analysis: BTreeMap<String, f64>,
    pub recommendations: Vec<String>,
    pub optimal_publish_time: DateTime<Utc>,
    pub expected_peak_time: DateTime<Utc>,
}

/// Surface statistics of a text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TextFeatures {
    pub word_count: usize,
    /// 0..=1, higher reads easier.
    pub readability: f64,
    /// Share of the most frequent long word, capped at 0.1.
    pub keyword_density: f64,
}

impl TextFeatures {
    pub fn of(text: &str) -> Self {
        let words: Vec<&str> = text.split_whitespace().collect();
        Self {
            word_count: words.len(),
            readability: readability(text, &words),
            keyword_density: keyword_density(&words),
        }
    }
}

fn readability(text: &str, words: &[&str]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    let sentences = text
        .split(SENTENCE_ENDS)
        .filter(|s| !s.trim().is_empty())
        .count();
    if sentences == 0 {
        return 0.0;
    }
    let words_per_sentence = words.len() as f64 / sentences as f64;
    let chars_per_word =
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len() as f64;
    let score = 100.0 - 1.015 * words_per_sentence - 84.6 * chars_per_word / 100.0;
    score.clamp(0.0, 100.0) / 100.0
}

fn keyword_density(words: &[&str]) -> f64 {
    if words.len() < 10 {
        return 0.0;
    }
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for w in words.iter().filter(|w| w.chars().count() > 3) {
        *freq.entry(*w).or_insert(0) += 1;
    }
    freq.values()
        .max()
        .map(|&m| (m as f64 / words.len() as f64).min(0.1))
        .unwrap_or(0.0)
}

/// Jaccard similarity of lowercase word sets.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let lower_a = a.to_lowercase();
    let lower_b = b.to_lowercase();
    let sa: HashSet<&str> = lower_a.split_whitespace().collect();
    let sb: HashSet<&str> = lower_b.split_whitespace().collect();
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }
    let inter = sa.intersection(&sb).count() as f64;
    let union = sa.union(&sb).count() as f64;
    inter / union
}

/// Earliest upcoming best hour for `section`, strictly after `now`.
pub fn optimal_publish_time(section: Section, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    section
        .best_hours()
        .iter()
        .filter_map(|&h| today.and_hms_opt(h, 0, 0))
        .map(|t| {
            let t = t.and_utc();
            if t <= now {
                t + Duration::days(1)
            } else {
                t
            }
        })
        .min()
        .unwrap_or(now + Duration::hours(2))
}

#[derive(Debug, Clone, Default)]
pub struct PerformancePredictor;

impl PerformancePredictor {
    pub fn new() -> Self {
        Self
    }

    pub fn predict_at(&self, draft: &ArticleDraft, now: DateTime<Utc>) -> PerformancePrediction {
        let section = Section::from_label(&draft.category);
        let mult = section.multiplier();
        let length = draft.effective_length();

        let base_views = (length as f64 * 2.0).min(BASE_VIEWS_CAP);
        let base_engagement = (draft.author_followers as f64 * 0.05).min(BASE_ENGAGEMENT_CAP);

        let publish_at = draft
            .publish_time
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now);

        let optimal = optimal_publish_time(section, now);

        debug!(
            category = %draft.category,
            length,
            multiplier = mult,
            "performance forecast"
        );

        PerformancePrediction {
            predicted_views: (base_views * mult) as u64,
            predicted_engagement: round_to(base_engagement * mult, 2),
            predicted_reading_time: draft.reading_time,
            predicted_shares: (base_views * 0.1) as u64,
            predicted_comments: (base_views * 0.05) as u64,
            confidence_score: HEURISTIC_CONFIDENCE,
            factors_analysis: factors_analysis(draft),
            recommendations: editorial_advice(draft, length, publish_at.hour()),
            optimal_publish_time: optimal,
            expected_peak_time: optimal + Duration::hours(PEAK_DELAY_HOURS),
        }
    }
}

fn factors_analysis(draft: &ArticleDraft) -> BTreeMap<String, f64> {
    let title = TextFeatures::of(&draft.title);
    let content = TextFeatures::of(&draft.content);

    let mut f = BTreeMap::new();
    f.insert("content_length".to_string(), 0.3);
    f.insert("category".to_string(), 0.4);
    f.insert("author_reputation".to_string(), 0.3);
    let draft_features = [
        ("reading_time", draft.reading_time as f64),
        ("image_count", draft.image_count as f64),
        ("video_count", draft.video_count as f64),
        ("internal_links", draft.internal_links as f64),
        ("external_links", draft.external_links as f64),
        ("author_followers", draft.author_followers as f64),
        ("reputation_score", draft.author_reputation),
        ("topic_trending", draft.topic_trending_score),
        ("seasonal_factor", draft.seasonal_factor),
        ("tags_count", draft.tags.len() as f64),
    ];
    for (name, value) in draft_features {
        f.insert(name.to_string(), round_to(squash(value), 3));
    }
    f.insert("title_words".to_string(), squash(title.word_count as f64));
    f.insert("title_readability".to_string(), round_to(title.readability, 3));
    f.insert("content_words".to_string(), squash(content.word_count as f64));
    f.insert("content_readability".to_string(), round_to(content.readability, 3));
    f.insert("keyword_density".to_string(), round_to(content.keyword_density, 3));
    f.insert(
        "title_similarity".to_string(),
        round_to(text_similarity(&draft.title, &draft.content), 3),
    );
    f
}

// counts above 10 are scaled by 1/100 into <0..=1>; small counts pass through
fn squash(v: f64) -> f64 {
    if v > 10.0 {
        (v / 100.0).clamp(0.0, 1.0)
    } else {
        v
    }
}

fn editorial_advice(draft: &ArticleDraft, length: u64, publish_hour: u32) -> Vec<String> {
    let mut out = Vec::new();

    if length < 300 {
        out.push("Expand the content; 500-1500 words performs best".to_string());
    } else if length > 2000 {
        out.push("Split long content into parts or a series".to_string());
    }

    if draft.image_count == 0 {
        out.push("Add illustrative images to lift engagement".to_string());
    } else if draft.image_count > 10 {
        out.push("Reduce the number of images to speed up loading".to_string());
    }

    if !(8..=22).contains(&publish_hour) {
        out.push("Publish during peak hours (08:00-22:00) for more views".to_string());
    }

    if draft.tags.len() < 3 {
        out.push("Add more relevant tags (3-7)".to_string());
    } else if draft.tags.len() > 10 {
        out.push("Trim the tag list to the most relevant ones".to_string());
    }

    if draft.external_links == 0 {
        out.push("Link to trusted external sources for credibility".to_string());
    }

    out
}
