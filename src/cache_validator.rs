use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Integrity envelope for documents held by the in-memory prospect cache.
///
/// Each document is stored as JSON next to its SHA-256 checksum. On read the
/// checksum is recomputed; a mismatch is treated as a cache miss so callers
/// rebuild the record instead of trusting a corrupted one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedCacheEntry {
    /// The cached document (JSON string)
    pub data: String,
    /// SHA-256 checksum of the data (hex encoded)
    pub checksum: String,
}

impl ValidatedCacheEntry {
    pub fn new(data: String) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.data) == self.checksum
    }

    /// Serializes `value` and wraps it into an envelope string ready for the cache.
    pub fn seal<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
        let entry = Self::new(serde_json::to_string(value)?);
        serde_json::to_string(&entry)
    }

    /// Opens an envelope produced by [`seal`](Self::seal).
    ///
    /// Returns `None` for malformed envelopes, checksum mismatches, and payloads
    /// that no longer deserialize into `T`.
    pub fn open<T: DeserializeOwned>(serialized: &str) -> Option<T> {
        let data = Self::deserialize_and_validate(serialized)?;
        match serde_json::from_str(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Cached document failed to deserialize: {}", e);
                None
            }
        }
    }

    pub fn deserialize_and_validate(serialized: &str) -> Option<String> {
        let entry: ValidatedCacheEntry = serde_json::from_str(serialized).ok()?;

        if entry.is_valid() {
            Some(entry.data)
        } else {
            tracing::warn!(
                "Cache validation failed: checksum mismatch. Expected: {}, Data length: {}",
                entry.checksum,
                entry.data.len()
            );
            None
        }
    }
}
