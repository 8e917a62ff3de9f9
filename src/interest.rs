//! # Interest model
//! Turns a user's behavioral events into a normalized label → intensity mapping
//! and a compact behavior profile.
//!
//! Per event: `score = weight(kind, data) × decay(age)`, credited to the event's
//! category, topic, and (at `tag_share`) each of its tags. Categories and
//! topics/tags accumulate separately; on a shared label the topic total wins.
//! The merged raw totals are min/max-rescaled into
//! `[min_interest_score, max_interest_score]`.
//!
//! Everything here is pure; `now` is passed in by the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::config::InterestParams;
use crate::model::{days_elapsed, parse_timestamp, round_to, Event, EventData, EventKind};

/// Normalized interest per topic / category / tag label.
pub type InterestMapping = BTreeMap<String, f64>;

const TOP_INTERESTS: usize = 10;
const TOP_CATEGORIES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BehaviorPatterns {
    /// Mean `duration` (seconds) over `reading_time` events.
    pub reading_time_avg: f64,
    /// Mean `depth` (percent) over `scroll_depth` events.
    pub scroll_depth_avg: f64,
    /// Likes, shares and comments per event.
    pub interaction_frequency: f64,
    pub preferred_categories: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub interest_scores: InterestMapping,
    pub top_interests: Vec<(String, f64)>,
    pub behavior_patterns: BehaviorPatterns,
    pub engagement_level: EngagementLevel,
    pub last_updated: String,
}

#[derive(Debug, Clone, Default)]
pub struct InterestScorer {
    params: InterestParams,
}

impl InterestScorer {
    pub fn new(params: InterestParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &InterestParams {
        &self.params
    }

    /// Build the interest mapping for `events` as seen at `now`. Empty input → empty mapping.
    pub fn compute_interest_score(&self, events: &[Event], now: DateTime<Utc>) -> InterestMapping {
        let mut by_category: HashMap<&str, f64> = HashMap::new();
        let mut by_topic: HashMap<&str, f64> = HashMap::new();

        for event in events {
            let score = self.event_weight(event.event_type, &event.event_data)
                * self.time_decay(event.timestamp.as_deref(), now);

            let data = &event.event_data;
            if let Some(category) = non_empty(data.category.as_deref()) {
                *by_category.entry(category).or_insert(0.0) += score;
            }
            if let Some(topic) = non_empty(data.topic.as_deref()) {
                *by_topic.entry(topic).or_insert(0.0) += score;
            }
            for tag in data.tags.iter().filter(|t| !t.is_empty()) {
                *by_topic.entry(tag.as_str()).or_insert(0.0) += score * self.params.tag_share;
            }
        }

        // A label seen as both category and topic/tag keeps the topic total.
        let mut raw = by_category;
        raw.extend(by_topic);
        self.normalize(raw)
    }

    /// Base weight by kind, adjusted by the event's payload, floored at `min_factor`.
    pub fn event_weight(&self, kind: EventKind, data: &EventData) -> f64 {
        let mut weight = self.params.event_weights.weight_for(kind);
        match kind {
            EventKind::ReadingTime => {
                let minutes = data.duration / 60.0;
                weight *= (minutes / 2.0).min(3.0);
            }
            EventKind::ScrollDepth => {
                weight *= data.depth.clamp(0.0, 100.0) / 100.0;
            }
            EventKind::SearchQuery => {
                let len = data.query.chars().count() as f64;
                weight *= (len / 10.0).min(2.0);
            }
            _ => {}
        }
        weight.max(self.params.min_factor)
    }

    /// `decay_rate ^ whole_days`, floored at `min_factor`. Missing or unparseable → 1.0.
    pub fn time_decay(&self, timestamp: Option<&str>, now: DateTime<Utc>) -> f64 {
        let Some(ts) = timestamp.and_then(parse_timestamp) else {
            return 1.0;
        };
        let days = days_elapsed(now, ts).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        self.params
            .decay_rate
            .powi(days)
            .max(self.params.min_factor)
    }

    fn normalize(&self, raw: HashMap<&str, f64>) -> InterestMapping {
        let lo_bound = self.params.min_interest_score;
        let hi_bound = self.params.max_interest_score;

        let (min, max) = raw
            .values()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        raw.into_iter()
            .map(|(label, v)| {
                let scaled = if max == min {
                    lo_bound
                } else {
                    let unit = (v - min) / (max - min);
                    round_to(unit * (hi_bound - lo_bound) + lo_bound, 2)
                };
                (label.to_string(), scaled)
            })
            .collect()
    }

    /// Interest mapping plus behavior summary and engagement level.
    pub fn user_profile(&self, events: &[Event], now: DateTime<Utc>) -> UserProfile {
        let interest_scores = self.compute_interest_score(events, now);

        let mut top_interests: Vec<(String, f64)> = interest_scores
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        // Stable sort over an ordered map: ties stay alphabetical.
        top_interests.sort_by(|a, b| b.1.total_cmp(&a.1));
        top_interests.truncate(TOP_INTERESTS);

        UserProfile {
            interest_scores,
            top_interests,
            behavior_patterns: behavior_patterns(events),
            engagement_level: engagement_level(events),
            last_updated: now.to_rfc3339(),
        }
    }
}

/// Summarize reading/scroll habits, reaction frequency and favorite categories.
pub fn behavior_patterns(events: &[Event]) -> BehaviorPatterns {
    let mut reading = Vec::new();
    let mut scrolls = Vec::new();
    let mut reactions = 0usize;
    let mut categories: BTreeMap<&str, usize> = BTreeMap::new();

    for e in events {
        match e.event_type {
            EventKind::ReadingTime => reading.push(e.event_data.duration),
            EventKind::ScrollDepth => scrolls.push(e.event_data.depth),
            k if k.is_reaction() => reactions += 1,
            _ => {}
        }
        if let Some(c) = non_empty(e.event_data.category.as_deref()) {
            *categories.entry(c).or_insert(0) += 1;
        }
    }

    let mut preferred: Vec<(String, usize)> = categories
        .into_iter()
        .map(|(k, n)| (k.to_string(), n))
        .collect();
    preferred.sort_by(|a, b| b.1.cmp(&a.1));
    preferred.truncate(TOP_CATEGORIES);

    BehaviorPatterns {
        reading_time_avg: mean(&reading),
        scroll_depth_avg: mean(&scrolls),
        interaction_frequency: reactions as f64 / events.len().max(1) as f64,
        preferred_categories: preferred,
    }
}

/// `high` at ≥30% interactive events, `medium` at ≥10%, else `low`.
pub fn engagement_level(events: &[Event]) -> EngagementLevel {
    if events.is_empty() {
        return EngagementLevel::Low;
    }
    let interactive = events
        .iter()
        .filter(|e| e.event_type.is_interactive())
        .count();
    let ratio = interactive as f64 / events.len() as f64;
    if ratio >= 0.3 {
        EngagementLevel::High
    } else if ratio >= 0.1 {
        EngagementLevel::Medium
    } else {
        EngagementLevel::Low
    }
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}
