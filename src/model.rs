//! # Domain model
//! Wire types shared by the interest model, the article scorer and the HTTP layer.
//!
//! Loosely shaped JSON coming from the CMS is normalized here, once:
//! - event kinds accept both the long (`article_like`) and short (`like`) names,
//!   anything else becomes [`EventKind::Other`];
//! - `category` / `author` may be a plain string or an object with a `name`
//!   field; both collapse into a single string;
//! - missing optional fields fall back to empty/zero values.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Kind of behavioral event reported by the CMS front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "article_view", alias = "view")]
    View,
    #[serde(rename = "article_like", alias = "like")]
    Like,
    #[serde(rename = "article_share", alias = "share")]
    Share,
    #[serde(rename = "article_comment", alias = "comment")]
    Comment,
    #[serde(rename = "article_bookmark", alias = "bookmark")]
    Bookmark,
    #[serde(rename = "reading_time")]
    ReadingTime,
    #[serde(rename = "scroll_depth")]
    ScrollDepth,
    #[serde(rename = "search_query")]
    SearchQuery,
    #[serde(rename = "click_element", alias = "click")]
    Click,
    #[serde(rename = "other", other)]
    Other,
}

impl EventKind {
    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::View => "article_view",
            EventKind::Like => "article_like",
            EventKind::Share => "article_share",
            EventKind::Comment => "article_comment",
            EventKind::Bookmark => "article_bookmark",
            EventKind::ReadingTime => "reading_time",
            EventKind::ScrollDepth => "scroll_depth",
            EventKind::SearchQuery => "search_query",
            EventKind::Click => "click_element",
            EventKind::Other => "other",
        }
    }

    /// Explicit reactions to an article (counted as "interactions" in behavior patterns).
    pub fn is_reaction(&self) -> bool {
        matches!(self, EventKind::Like | EventKind::Share | EventKind::Comment)
    }

    /// Events that count toward the engagement level.
    pub fn is_interactive(&self) -> bool {
        self.is_reaction() || matches!(self, EventKind::Bookmark | EventKind::SearchQuery)
    }
}

/// Auxiliary fields of an event. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Reading duration in seconds (`reading_time` events).
    #[serde(default)]
    pub duration: f64,
    /// Scroll depth in percent (`scroll_depth` events).
    #[serde(default)]
    pub depth: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[serde(
        default,
        alias = "articleId",
        skip_serializing_if = "Option::is_none"
    )]
    pub article_id: Option<String>,
}

/// One observed user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventKind,
    #[serde(default)]
    pub event_data: EventData,
    /// ISO-8601; may be absent or malformed (decay then falls back to 1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_id: Option<String>,
}

impl Event {
    pub fn new(kind: EventKind, data: EventData) -> Self {
        Self {
            event_type: kind,
            event_data: data,
            timestamp: None,
            user_id: None,
            session_id: None,
            article_id: None,
        }
    }

    /// Builder-style timestamp setter.
    pub fn at(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = Some(ts.to_rfc3339());
        self
    }

    /// Article this event refers to: `event_data.article_id` first, then the top-level field.
    pub fn article_ref(&self) -> Option<&str> {
        self.event_data
            .article_id
            .as_deref()
            .or(self.article_id.as_deref())
    }
}

/// Candidate content item. Read-only input to scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Canonical category label; empty when the CMS sent none.
    #[serde(default, deserialize_with = "label")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(
        default,
        deserialize_with = "optional_label",
        skip_serializing_if = "Option::is_none"
    )]
    pub author: Option<String>,
}

impl Article {
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            category: category.into(),
            tags: Vec::new(),
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            published_at: None,
            author: None,
        }
    }
}

/// Article annotated by the scorer. Lives for a single request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredArticle {
    #[serde(flatten)]
    pub article: Article,
    pub recommendation_score: f64,
    pub recommendation_reason: String,
}

/// Aggregate quality indicators of a recommendation list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RecommendationMetrics {
    pub diversity: f64,
    pub coverage: f64,
    pub freshness: f64,
    pub total_recommendations: usize,
}

/// Terminal output of the recommendation pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecommendationResult {
    pub recommendations: Vec<ScoredArticle>,
    pub metrics: RecommendationMetrics,
}

impl RecommendationResult {
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
    }
}

/* ----------------------------
Label normalization
---------------------------- */

#[derive(Deserialize)]
#[serde(untagged)]
enum LabelRepr {
    Plain(String),
    Named {
        #[serde(default)]
        name: Option<String>,
    },
}

impl LabelRepr {
    fn into_label(self) -> String {
        match self {
            LabelRepr::Plain(s) => s.trim().to_string(),
            LabelRepr::Named { name } => name.map(|s| s.trim().to_string()).unwrap_or_default(),
        }
    }
}

fn label<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<LabelRepr>::deserialize(d)?;
    Ok(raw.map(LabelRepr::into_label).unwrap_or_default())
}

fn optional_label<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = label(d)?;
    Ok(if s.is_empty() { None } else { Some(s) })
}

/* ----------------------------
Time & numeric helpers
---------------------------- */

/// Parse an ISO-8601 timestamp. Accepts RFC 3339 (`Z` or offset) and naive
/// `YYYY-MM-DDTHH:MM:SS[.f]`, which is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Whole days elapsed from `then` to `now`, floored (future instants give negative values).
pub fn days_elapsed(now: DateTime<Utc>, then: DateTime<Utc>) -> i64 {
    (now - then).num_seconds().div_euclid(86_400)
}

/// Round half away from zero to `places` decimals.
pub fn round_to(x: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (x * f).round() / f
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    #[test]
    fn event_kind_accepts_long_short_and_unknown_names() {
        let kinds: Vec<EventKind> =
            serde_json::from_value(json!(["article_like", "like", "click", "page_ping"])).unwrap();
        assert_eq!(
            kinds,
            vec![
                EventKind::Like,
                EventKind::Like,
                EventKind::Click,
                EventKind::Other
            ]
        );
        assert_eq!(
            serde_json::to_value(EventKind::Like).unwrap(),
            json!("article_like")
        );
    }

    #[test]
    fn event_data_reads_camel_case_article_id_and_ignores_extras() {
        let e: Event = serde_json::from_value(json!({
            "event_type": "article_view",
            "event_data": { "articleId": "42", "category": "tech", "unused": true }
        }))
        .unwrap();
        assert_eq!(e.article_ref(), Some("42"));
        assert_eq!(e.event_data.category.as_deref(), Some("tech"));
        assert!(e.timestamp.is_none());
    }

    #[test]
    fn category_and_author_normalize_from_string_or_object() {
        let a: Article = serde_json::from_value(json!({
            "id": "1",
            "category": { "name": "sports", "slug": "sp" },
            "author": { "name": "Lina" }
        }))
        .unwrap();
        assert_eq!(a.category, "sports");
        assert_eq!(a.author.as_deref(), Some("Lina"));

        let b: Article = serde_json::from_value(json!({
            "id": "2",
            "category": "tech",
            "author": null
        }))
        .unwrap();
        assert_eq!(b.category, "tech");
        assert_eq!(b.author, None);

        let c: Article = serde_json::from_value(json!({ "id": "3" })).unwrap();
        assert_eq!(c.category, "");
        assert_eq!(c.view_count, 0);
    }

    #[test]
    fn scored_article_serializes_flat() {
        let s = ScoredArticle {
            article: Article::new("7", "tech"),
            recommendation_score: 0.25,
            recommendation_reason: "Popular article".into(),
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["id"], json!("7"));
        assert_eq!(v["category"], json!("tech"));
        assert_eq!(v["recommendation_score"], json!(0.25));
    }

    #[test]
    fn timestamps_parse_in_common_shapes() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-15T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn days_elapsed_floors() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(days_elapsed(now, now), 0);
        assert_eq!(days_elapsed(now, now - Duration::hours(23)), 0);
        assert_eq!(days_elapsed(now, now - Duration::hours(49)), 2);
        assert_eq!(days_elapsed(now, now + Duration::hours(1)), -1);
    }

    #[test]
    fn rounding_helper() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(1.2346, 3), 1.235);
        assert_eq!(round_to(99.999, 2), 100.0);
    }
}
