//! Prospect data collection.
//!
//! The collector never calls research tools itself; an external agent loop
//! does that. This module prepares the per-prospect cache record, persists
//! individual tool outputs as they arrive, and offers a timeout wrapper so the
//! agent always gets a tagged result back instead of an error.
use crate::errors::AppError;
use crate::models::{CacheField, CachedSource, ProspectDataCache, ProspectInput, ToolResult};
use crate::prospect_cache::{
    create_prospect_cache_key, get_cached_prospect_data, is_stale_after,
    set_cached_prospect_data, ProspectCacheStore,
};
use crate::source_tracker::SourceTracker;
use chrono::{Duration, Utc};
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_TOOL_TIMEOUT_MS: u64 = 60_000;

/// Tool name → cache field. Several tools may feed the same field.
pub const TOOL_FIELD_MAP: &[(&str, CacheField)] = &[
    ("sec_insider_search", CacheField::SecInsider),
    ("sec_edgar_filings", CacheField::SecInsider),
    ("fec_contributions", CacheField::FecContributions),
    ("county_assessor", CacheField::CountyAssessor),
    ("propublica_nonprofit_search", CacheField::Propublica990),
    ("propublica_nonprofit_details", CacheField::Propublica990),
    ("property_valuation", CacheField::PropertyValuation),
    ("business_registry_scraper", CacheField::BusinessRegistry),
    ("voter_registration", CacheField::VoterRegistration),
    ("family_discovery", CacheField::FamilyDiscovery),
    ("wikidata_search", CacheField::Wikidata),
    ("wikidata_entity", CacheField::Wikidata),
    ("web_search", CacheField::WebSearch),
    ("estimate_business_revenue", CacheField::RevenueEstimate),
];

/// Exact-match lookup in [`TOOL_FIELD_MAP`].
pub fn field_for_tool(tool_name: &str) -> Option<CacheField> {
    TOOL_FIELD_MAP
        .iter()
        .find(|(tool, _)| *tool == tool_name)
        .map(|(_, field)| *field)
}

/// Result of [`DataCollector::collect_prospect_data`].
#[derive(Debug)]
pub struct CollectionOutcome {
    pub record: ProspectDataCache,
    /// True when an existing fresh record was returned without a write.
    pub from_cache: bool,
    pub sources: SourceTracker,
}

#[derive(Clone)]
pub struct DataCollector {
    store: Arc<dyn ProspectCacheStore>,
    cache_ttl: Duration,
    tool_timeout: std::time::Duration,
}

impl DataCollector {
    pub fn new(store: Arc<dyn ProspectCacheStore>) -> Self {
        Self {
            store,
            cache_ttl: Duration::days(crate::models::CACHE_TTL_DAYS),
            tool_timeout: std::time::Duration::from_millis(DEFAULT_TOOL_TIMEOUT_MS),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Returns the fresh cached record for `prospect`, or writes and returns an
    /// empty one. A hit performs no write.
    pub async fn collect_prospect_data(
        &self,
        prospect: &ProspectInput,
        force_refresh: bool,
    ) -> Result<CollectionOutcome, AppError> {
        validate_prospect(prospect)?;
        let cache_key = create_prospect_cache_key(prospect);
        let now = Utc::now();

        if !force_refresh {
            if let Some(existing) =
                get_cached_prospect_data(self.store.as_ref(), prospect).await?
            {
                if !is_stale_after(&existing, now, self.cache_ttl) {
                    tracing::debug!(
                        "Prospect cache HIT for '{}' (quality: {})",
                        cache_key,
                        existing.data_quality.as_str()
                    );
                    let mut sources = SourceTracker::new();
                    sources.record_cached(&existing);
                    return Ok(CollectionOutcome {
                        record: existing,
                        from_cache: true,
                        sources,
                    });
                }
                tracing::info!("Prospect cache for '{}' is stale, rebuilding", cache_key);
            }
        } else {
            tracing::info!("Forced refresh for '{}'", cache_key);
        }

        let record =
            ProspectDataCache::skeleton(cache_key.clone(), prospect.clone(), now, self.cache_ttl);
        set_cached_prospect_data(self.store.as_ref(), &record).await?;
        tracing::info!("Initialized prospect cache for '{}'", cache_key);

        Ok(CollectionOutcome {
            record,
            from_cache: false,
            sources: SourceTracker::new(),
        })
    }

    /// Persists one tool's output into the record's mapped field.
    ///
    /// Returns `Ok(false)` without touching the store when `tool_name` is not in
    /// [`TOOL_FIELD_MAP`]; the prospect is only validated for known tools. A
    /// missing or stale record is replaced by an empty one before the field is
    /// written, so old sources never carry over into a refreshed record.
    pub async fn update_prospect_tool_result(
        &self,
        prospect: &ProspectInput,
        tool_name: &str,
        result: Value,
        ttl: Option<Duration>,
    ) -> Result<bool, AppError> {
        Ok(self
            .apply_tool_result(prospect, tool_name, result, ttl)
            .await?
            .is_some())
    }

    /// Same as [`update_prospect_tool_result`](Self::update_prospect_tool_result)
    /// but hands back the written record.
    pub async fn apply_tool_result(
        &self,
        prospect: &ProspectInput,
        tool_name: &str,
        result: Value,
        ttl: Option<Duration>,
    ) -> Result<Option<ProspectDataCache>, AppError> {
        let Some(field) = field_for_tool(tool_name) else {
            tracing::warn!("Ignoring result from unknown tool '{}'", tool_name);
            return Ok(None);
        };
        validate_prospect(prospect)?;

        let cache_key = create_prospect_cache_key(prospect);
        let now = Utc::now();
        let mut record = match get_cached_prospect_data(self.store.as_ref(), prospect).await? {
            Some(existing) if !is_stale_after(&existing, now, self.cache_ttl) => existing,
            existing => {
                if existing.is_some() {
                    tracing::info!("Prospect cache for '{}' is stale, starting over", cache_key);
                } else {
                    tracing::debug!("No cache record for '{}', creating one", cache_key);
                }
                ProspectDataCache::skeleton(
                    cache_key.clone(),
                    prospect.clone(),
                    now,
                    self.cache_ttl,
                )
            }
        };

        let source = CachedSource::new(result, now, ttl.unwrap_or(self.cache_ttl));
        record.set_field(field, source, now);
        set_cached_prospect_data(self.store.as_ref(), &record).await?;

        tracing::info!(
            "Stored '{}' result in {} for '{}' (quality: {})",
            tool_name,
            field.as_str(),
            cache_key,
            record.data_quality.as_str()
        );

        Ok(Some(record))
    }

    /// [`run_tool_with_timeout`] with this collector's configured timeout.
    pub async fn run_tool<T, E, F>(&self, name: &str, tool: F) -> ToolResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        run_tool_with_timeout(name, tool, self.tool_timeout).await
    }
}

fn validate_prospect(prospect: &ProspectInput) -> Result<(), AppError> {
    if prospect.name.trim().is_empty() {
        return Err(AppError::BadRequest("Prospect name is required".to_string()));
    }
    Ok(())
}

/// Races `tool` against `timeout`.
///
/// Errors and timeouts come back as `success: false` results; a timeout's
/// error message always contains "timed out".
pub async fn run_tool_with_timeout<T, E, F>(
    name: &str,
    tool: F,
    timeout: std::time::Duration,
) -> ToolResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    let started = Instant::now();
    let outcome = tokio::time::timeout(timeout, tool).await;
    let elapsed = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(data)) => {
            tracing::debug!("Tool '{}' completed in {}ms", name, elapsed);
            ToolResult::succeeded(name, data, elapsed)
        }
        Ok(Err(e)) => {
            tracing::warn!("Tool '{}' failed after {}ms: {}", name, elapsed, e);
            ToolResult::failed(name, e.to_string(), elapsed)
        }
        Err(_) => {
            tracing::warn!("Tool '{}' timed out after {}ms", name, timeout.as_millis());
            ToolResult::failed(
                name,
                format!("{} timed out after {}ms", name, timeout.as_millis()),
                elapsed,
            )
        }
    }
}
