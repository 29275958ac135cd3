pub mod cache_keys;
pub mod file;
pub mod in_memory;

use crate::core::errors::AsinCacheError;
use crate::core::models::CacheEntry;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::debug;

/// Raw key/value storage underneath the TTL-aware [`BlobStore`].
///
/// Implementations report every failure as [`AsinCacheError::StoreUnavailable`].
#[async_trait]
pub trait BlobBackend: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, AsinCacheError>;
    async fn write(&self, key: &str, body: String) -> Result<(), AsinCacheError>;
    /// Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), AsinCacheError>;
}

/// JSON cache entries with lazy TTL expiry on top of a [`BlobBackend`].
pub struct BlobStore<B: BlobBackend> {
    backend: B,
}

impl<B: BlobBackend> BlobStore<B> {
    pub fn new(backend: B) -> Self {
        BlobStore { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Reads the raw entry without applying the TTL check.
    pub async fn get_entry<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>, AsinCacheError> {
        match self.backend.read(key).await? {
            Some(body) => {
                let entry = serde_json::from_str(&body)
                    .map_err(|e| AsinCacheError::StoreUnavailable(format!("Corrupt entry under {}: {}", key, e)))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Returns the stored value, or `None` when absent or expired.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AsinCacheError> {
        match self.get_entry::<T>(key).await? {
            Some(entry) if entry.is_expired() => {
                debug!(key, "cache entry expired");
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value)),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), AsinCacheError> {
        self.set_entry(key, &CacheEntry::new(value, ttl)).await
    }

    pub async fn set_entry<T: Serialize>(&self, key: &str, entry: &CacheEntry<T>) -> Result<(), AsinCacheError> {
        let body = serde_json::to_string(entry)?;
        self.backend.write(key, body).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), AsinCacheError> {
        self.backend.remove(key).await
    }

    pub async fn delete_many(&self, keys: &[String]) -> Vec<(String, Result<(), AsinCacheError>)> {
        let deletions = keys.iter().map(|key| async move { (key.clone(), self.delete(key).await) });
        futures::future::join_all(deletions).await
    }

    /// Marks an entry expired in place so the next `get` misses. Absent keys are left alone.
    pub async fn expire(&self, key: &str) -> Result<(), AsinCacheError> {
        if let Some(mut entry) = self.get_entry::<serde_json::Value>(key).await? {
            entry.expire();
            self.set_entry(key, &entry).await?;
        }
        Ok(())
    }
}
