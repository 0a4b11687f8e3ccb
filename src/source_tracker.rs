use crate::models::ProspectDataCache;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// A research source that contributed to a prospect report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    pub retrieved_at: DateTime<Utc>,
}

/// Collects the sources used while assembling one report.
///
/// Lives for a single collection call and is never persisted.
#[derive(Debug, Default, Clone)]
pub struct SourceTracker {
    entries: Vec<SourceEntry>,
}

impl SourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source unless one with the same name and URL is already tracked.
    pub fn add(&mut self, entry: SourceEntry) -> bool {
        let duplicate = self
            .entries
            .iter()
            .any(|e| e.name == entry.name && e.url == entry.url);
        if duplicate {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Tracks every populated source field of a cache record.
    pub fn record_cached(&mut self, record: &ProspectDataCache) {
        for field in record.populated_fields() {
            if let Some(source) = record.field(field) {
                self.add(SourceEntry {
                    name: field.label().to_string(),
                    url: source_url(&source.data),
                    field: Some(field.as_str()),
                    retrieved_at: source.cached_at,
                });
            }
        }
    }

    pub fn sources(&self) -> &[SourceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Numbered citation lines, e.g. `[1] Wikidata (https://...) retrieved 2026-10-19`.
    pub fn citations(&self) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let date = entry.retrieved_at.format("%Y-%m-%d");
                match &entry.url {
                    Some(url) => format!("[{}] {} ({}) retrieved {}", i + 1, entry.name, url, date),
                    None => format!("[{}] {} retrieved {}", i + 1, entry.name, date),
                }
            })
            .collect()
    }
}

/// Tool payloads carry their provenance under one of a few keys.
fn source_url(data: &Value) -> Option<String> {
    ["url", "sourceUrl", "source_url"]
        .iter()
        .find_map(|key| data.get(*key).and_then(|v| v.as_str()))
        .filter(|url| !url.trim().is_empty())
        .map(str::to_string)
}
