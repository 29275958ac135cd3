use crate::core::models::{ASIN_CACHE_INVALIDATOR, Asin, NotificationEvent, ProductRecord};
use crate::core::services::{CacheService, unique_keys};
use crate::infrastructure::bus::NotificationBus;
use crate::infrastructure::fetcher::ProductApi;
use crate::infrastructure::store::BlobBackend;
use crate::infrastructure::store::cache_keys::product_data_key;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationOutcome {
    pub invalidated_count: usize,
    pub fresh_data: HashMap<Asin, ProductRecord>,
}

pub struct InvalidationService<B: BlobBackend, A: ProductApi> {
    cache: Arc<CacheService<B, A>>,
    bus: NotificationBus,
}

impl<B: BlobBackend, A: ProductApi> InvalidationService<B, A> {
    pub fn new(cache: Arc<CacheService<B, A>>, bus: NotificationBus) -> Self {
        InvalidationService { cache, bus }
    }

    /// Deletes, refetches and announces `keys`. No step can abort the others.
    pub async fn invalidate(&self, keys: &[Asin]) -> InvalidationOutcome {
        let keys = unique_keys(keys);
        let blob_keys: Vec<String> = keys.iter().map(product_data_key).collect();

        for (key, result) in self.cache.store().delete_many(&blob_keys).await {
            if let Err(e) = result {
                warn!(key = %key, error = %e, "failed to delete cache entry, refetching anyway");
            }
        }

        let fresh_data = self.cache.refresh(&keys).await;

        match self.bus.publish(ASIN_CACHE_INVALIDATOR, &NotificationEvent::new(fresh_data.clone())) {
            Ok(delivered) => debug!(delivered, "announced fresh product data"),
            Err(e) => warn!(error = %e, "failed to publish invalidation event"),
        }

        info!(invalidated = keys.len(), "invalidated product cache entries");
        InvalidationOutcome {
            invalidated_count: keys.len(),
            fresh_data,
        }
    }
}
