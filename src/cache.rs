//! Result cache for recommendation lists.
//!
//! The orchestrator only sees the [`RecommendationCache`] trait; which backend
//! (if any) is plugged in is decided at construction time. The built-in
//! [`InMemoryCache`] uses an absolute TTL (no sliding refresh) and evicts the
//! oldest entry once full.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::model::RecommendationResult;

/// Outcome of a cache consultation, surfaced as the `X-Recommendation-Cache` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    /// No cache configured, or no `user_id` to key on.
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

#[async_trait]
pub trait RecommendationCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<RecommendationResult>;
    async fn put(&self, key: String, value: RecommendationResult);
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynCache = Arc<dyn RecommendationCache>;

#[derive(Debug)]
struct Entry {
    value: RecommendationResult,
    inserted: Instant,
}

#[derive(Debug)]
pub struct InMemoryCache {
    ttl: Duration,
    capacity: usize,
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RecommendationCache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<RecommendationResult> {
        {
            let guard = self.entries.read().await;
            match guard.get(key) {
                Some(e) if e.inserted.elapsed() < self.ttl => return Some(e.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: drop it so the next put starts a fresh TTL window.
        self.entries.write().await.remove(key);
        None
    }

    async fn put(&self, key: String, value: RecommendationResult) {
        let mut guard = self.entries.write().await;
        if guard.len() >= self.capacity && !guard.contains_key(&key) {
            let ttl = self.ttl;
            guard.retain(|_, e| e.inserted.elapsed() < ttl);
            if guard.len() >= self.capacity {
                if let Some(oldest) = guard
                    .iter()
                    .min_by_key(|(_, e)| e.inserted)
                    .map(|(k, _)| k.clone())
                {
                    guard.remove(&oldest);
                }
            }
        }
        guard.insert(
            key,
            Entry {
                value,
                inserted: Instant::now(),
            },
        );
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

/// Fields that identify one recommendation request.
#[derive(Debug, Clone, Copy)]
pub struct CacheKeyParts<'a> {
    pub user_id: &'a str,
    pub event_count: usize,
    pub context: &'a str,
    pub top_n: usize,
}

impl CacheKeyParts<'_> {
    /// 16 hex chars of SHA-256 over the key fields and the candidate ids.
    pub fn key<'b>(&self, article_ids: impl IntoIterator<Item = &'b str>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.user_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.event_count.to_le_bytes());
        hasher.update(self.context.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.top_n.to_le_bytes());
        for id in article_ids {
            hasher.update(id.as_bytes());
            hasher.update([0u8]);
        }
        hex_prefix(&hasher.finalize(), 8)
    }
}

/// Short anonymized id for logs; raw identifiers never reach the log stream.
pub(crate) fn anon_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex_prefix(&digest, 6)
}

fn hex_prefix(bytes: &[u8], n: usize) -> String {
    let mut out = String::with_capacity(n * 2);
    for b in bytes.iter().take(n) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
