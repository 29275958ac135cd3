use crate::core::errors::AsinCacheError;
use crate::core::models::{Asin, ProductRecord};
use crate::core::services::unique_keys;
use crate::infrastructure::fetcher::{ProductApi, ProductFetcher};
use crate::infrastructure::store::cache_keys::product_data_key;
use crate::infrastructure::store::{BlobBackend, BlobStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachePolicy {
    pub ttl: Duration,
    /// Whether records whose attribute lookup failed are written to the store.
    pub cache_degraded: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy {
            ttl: DEFAULT_TTL,
            cache_degraded: false,
        }
    }
}

/// Read-through, write-through cache of product records keyed by ASIN.
pub struct CacheService<B: BlobBackend, A: ProductApi> {
    store: Arc<BlobStore<B>>,
    fetcher: Arc<ProductFetcher<A>>,
    policy: CachePolicy,
}

impl<B: BlobBackend, A: ProductApi> CacheService<B, A> {
    pub fn new(store: Arc<BlobStore<B>>, fetcher: Arc<ProductFetcher<A>>, policy: CachePolicy) -> Self {
        CacheService { store, fetcher, policy }
    }

    pub fn store(&self) -> &Arc<BlobStore<B>> {
        &self.store
    }

    /// Returns a record for every requested key, fetching only the misses.
    ///
    /// A key whose store read fails is treated as a miss.
    pub async fn resolve(&self, keys: &[Asin]) -> HashMap<Asin, ProductRecord> {
        let keys = unique_keys(keys);
        let lookups = keys.iter().map(|asin| async move {
            let cached = self.store.get::<ProductRecord>(&product_data_key(asin)).await;
            (asin, cached)
        });

        let mut results = HashMap::with_capacity(keys.len());
        let mut misses = Vec::new();
        for (asin, cached) in futures::future::join_all(lookups).await {
            match cached {
                Ok(Some(record)) => {
                    results.insert(asin.clone(), record);
                }
                Ok(None) => misses.push(asin.clone()),
                Err(e) => {
                    warn!(%asin, error = %e, "cache read failed, refetching");
                    misses.push(asin.clone());
                }
            }
        }

        debug!(hits = results.len(), misses = misses.len(), "resolved cache lookups");
        if !misses.is_empty() {
            results.extend(self.refresh(&misses).await);
        }
        results
    }

    /// Single-key resolve that reports a degraded record as [`AsinCacheError::NotFound`].
    pub async fn resolve_one(&self, asin: &Asin) -> Result<ProductRecord, AsinCacheError> {
        let mut resolved = self.resolve(std::slice::from_ref(asin)).await;
        match resolved.remove(asin) {
            Some(record) if !record.is_degraded() => Ok(record),
            _ => Err(AsinCacheError::NotFound(asin.to_string())),
        }
    }

    /// Fetches every key from upstream concurrently and writes the results through.
    pub async fn refresh(&self, keys: &[Asin]) -> HashMap<Asin, ProductRecord> {
        let keys = unique_keys(keys);
        let fetches = keys.iter().map(|asin| async move { (asin.clone(), self.fetch_and_store(asin).await) });
        let fetched: HashMap<_, _> = futures::future::join_all(fetches).await.into_iter().collect();
        info!(count = fetched.len(), "refreshed product records");
        fetched
    }

    async fn fetch_and_store(&self, asin: &Asin) -> ProductRecord {
        let (record, intact) = self.fetcher.fetch_record(asin).await;
        if !intact && !self.policy.cache_degraded {
            debug!(%asin, "skipping cache write for degraded record");
            return record;
        }
        if let Err(e) = self.store.set(&product_data_key(asin), &record, self.policy.ttl).await {
            warn!(%asin, error = %e, "failed to cache product record");
        }
        record
    }

    /// Expires entries in place; the next `resolve` refetches them.
    pub async fn expire(&self, keys: &[Asin]) -> usize {
        let keys = unique_keys(keys);
        let expirations = keys.iter().map(|asin| async move {
            let result = self.store.expire(&product_data_key(asin)).await;
            if let Err(e) = &result {
                warn!(%asin, error = %e, "failed to expire cache entry");
            }
            result.is_ok()
        });
        futures::future::join_all(expirations).await.into_iter().filter(|ok| *ok).count()
    }
}
