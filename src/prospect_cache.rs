//! Per-prospect data cache.
//!
//! The collector sees the cache as an opaque key-value store: reading a key
//! returns the latest written document (or nothing), writing a key replaces
//! the whole document. Concurrent writers are not coordinated; the last
//! write wins.

use crate::cache_validator::ValidatedCacheEntry;
use crate::errors::AppError;
use crate::models::{ProspectDataCache, ProspectInput, CACHE_TTL_DAYS};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use moka::future::Cache;
use moka::notification::RemovalCause;
use std::sync::Arc;

#[async_trait]
pub trait ProspectCacheStore: Send + Sync {
    async fn get(&self, cache_key: &str) -> Result<Option<ProspectDataCache>, AppError>;

    async fn set(&self, cache_key: &str, record: &ProspectDataCache) -> Result<(), AppError>;

    /// Most recently updated records first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<ProspectDataCache>, AppError>;
}

/// Derives the cache key for a prospect.
///
/// Each identity field is lowercased, stripped of punctuation and has its
/// whitespace collapsed; missing and blank fields both yield an empty segment.
/// Segments are joined as `name|address|city|state`.
pub fn create_prospect_cache_key(prospect: &ProspectInput) -> String {
    [
        Some(prospect.name.as_str()),
        prospect.address.as_deref(),
        prospect.city.as_deref(),
        prospect.state.as_deref(),
    ]
    .into_iter()
    .map(|part| part.map(normalize_key_part).unwrap_or_default())
    .collect::<Vec<_>>()
    .join("|")
}

fn normalize_key_part(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(c.to_lowercase());
        } else if c.is_whitespace() {
            pending_space = true;
        }
    }
    out
}

/// True iff the record has gone more than `max_age` without an update.
pub fn is_stale_after(record: &ProspectDataCache, now: DateTime<Utc>, max_age: Duration) -> bool {
    now - record.updated_at > max_age
}

pub fn is_cache_stale_at(record: &ProspectDataCache, now: DateTime<Utc>) -> bool {
    is_stale_after(record, now, Duration::days(CACHE_TTL_DAYS))
}

pub fn is_cache_stale(record: &ProspectDataCache) -> bool {
    is_cache_stale_at(record, Utc::now())
}

pub async fn get_cached_prospect_data(
    store: &dyn ProspectCacheStore,
    prospect: &ProspectInput,
) -> Result<Option<ProspectDataCache>, AppError> {
    let key = create_prospect_cache_key(prospect);
    store.get(&key).await
}

pub async fn set_cached_prospect_data(
    store: &dyn ProspectCacheStore,
    record: &ProspectDataCache,
) -> Result<(), AppError> {
    store.set(&record.cache_key, record).await
}

/// Default entry bound for [`MemoryProspectCache`].
pub const DEFAULT_MEMORY_CAPACITY: u64 = 50_000;

/// Process-local store backed by moka, with checksummed entries.
///
/// Entries have no time-based expiry; staleness is judged from `updatedAt`
/// by the reader. Only the capacity bound evicts, and every such eviction is
/// logged.
#[derive(Clone)]
pub struct MemoryProspectCache {
    entries: Cache<String, String>,
}

impl MemoryProspectCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_capacity)
                .eviction_listener(|key: Arc<String>, _, cause| {
                    if cause == RemovalCause::Size {
                        tracing::warn!(
                            "In-memory prospect cache full, evicted record '{}'",
                            key
                        );
                    }
                })
                .build(),
        }
    }
}

impl Default for MemoryProspectCache {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

#[async_trait]
impl ProspectCacheStore for MemoryProspectCache {
    async fn get(&self, cache_key: &str) -> Result<Option<ProspectDataCache>, AppError> {
        let Some(sealed) = self.entries.get(cache_key).await else {
            return Ok(None);
        };
        match ValidatedCacheEntry::open::<ProspectDataCache>(&sealed) {
            Some(record) => Ok(Some(record)),
            None => {
                tracing::warn!("Dropping invalid cache entry for key '{}'", cache_key);
                self.entries.invalidate(cache_key).await;
                Ok(None)
            }
        }
    }

    async fn set(&self, cache_key: &str, record: &ProspectDataCache) -> Result<(), AppError> {
        let sealed = ValidatedCacheEntry::seal(record)?;
        self.entries.insert(cache_key.to_string(), sealed).await;
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ProspectDataCache>, AppError> {
        let mut records: Vec<ProspectDataCache> = self
            .entries
            .iter()
            .filter_map(|(_, sealed)| ValidatedCacheEntry::open(&sealed))
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        records.truncate(limit);
        Ok(records)
    }
}
