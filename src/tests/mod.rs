mod api_tests;
mod store_tests;

use crate::core::errors::AsinCacheError;
use crate::core::models::{Asin, Price, ProductRecord};
use crate::core::services::{CachePolicy, CacheService, InvalidationOutcome, InvalidationService};
use crate::devtools::Invalidator;
use crate::infrastructure::bus::NotificationBus;
use crate::infrastructure::fetcher::{ProductApi, ProductFetcher};
use crate::infrastructure::store::{BlobBackend, BlobStore, in_memory::InMemoryBackend};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Semaphore;

pub fn asin(raw: &str) -> Asin {
    Asin::parse(raw).expect("valid asin")
}

pub fn sample_record(asin: &Asin) -> ProductRecord {
    ProductRecord {
        title: format!("Title {}", asin),
        purchase_link: format!("https://www.amazon.com/link/{}", asin),
        thumbnails: vec![format!("https://img.example/{}.jpg", asin)],
        rating: 4.5,
        review_count: 12,
        price: Price::Amount(18.99),
    }
}

/// Canned product API: every ASIN resolves unless told to fail.
#[derive(Default)]
pub struct StubApi {
    product_calls: AtomicUsize,
    search_calls: AtomicUsize,
    failing_products: Mutex<HashSet<String>>,
    failing_searches: Mutex<HashSet<String>>,
    gate: Option<Arc<Semaphore>>,
}

impl StubApi {
    pub fn new() -> Self {
        StubApi::default()
    }

    /// Product lookups block until the semaphore has a permit.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        StubApi {
            gate: Some(gate),
            ..StubApi::default()
        }
    }

    pub fn fail_product(&self, asin: &str) {
        self.failing_products.lock().unwrap().insert(asin.to_string());
    }

    pub fn fail_search(&self, asin: &str) {
        self.failing_searches.lock().unwrap().insert(asin.to_string());
    }

    pub fn product_calls(&self) -> usize {
        self.product_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductApi for StubApi {
    async fn product(&self, asin: &Asin) -> Result<Value, AsinCacheError> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate open");
        }
        self.product_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_products.lock().unwrap().contains(asin.as_str()) {
            return Err(AsinCacheError::UpstreamTransportFailure(asin.to_string(), "connection reset".to_string()));
        }
        let record = sample_record(asin);
        Ok(json!({
            "product_results": {
                "title": record.title,
                "thumbnails": record.thumbnails,
                "rating": record.rating,
                "reviews": record.review_count
            },
            "prices": [{ "extracted_price": 18.99 }]
        }))
    }

    async fn search(&self, asin: &Asin) -> Result<Value, AsinCacheError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_searches.lock().unwrap().contains(asin.as_str()) {
            return Err(AsinCacheError::UpstreamTransportFailure(asin.to_string(), "timed out".to_string()));
        }
        Ok(json!({
            "organic_results": [
                { "asin": "SOMETHING-ELSE", "link": "https://www.amazon.com/other" },
                { "asin": asin.as_str(), "link": sample_record(asin).purchase_link }
            ]
        }))
    }
}

/// In-memory backend whose operations can be made to fail.
#[derive(Default)]
pub struct FlakyBackend {
    inner: InMemoryBackend,
    failing_reads: Mutex<HashSet<String>>,
    fail_writes: AtomicBool,
    fail_removes: AtomicBool,
}

impl FlakyBackend {
    pub fn fail_read(&self, key: &str) {
        self.failing_reads.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn fail_removes(&self) {
        self.fail_removes.store(true, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }
}

#[async_trait]
impl BlobBackend for FlakyBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, AsinCacheError> {
        if self.failing_reads.lock().unwrap().contains(key) {
            return Err(AsinCacheError::StoreUnavailable(format!("read {} refused", key)));
        }
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, body: String) -> Result<(), AsinCacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AsinCacheError::StoreUnavailable(format!("write {} refused", key)));
        }
        self.inner.write(key, body).await
    }

    async fn remove(&self, key: &str) -> Result<(), AsinCacheError> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(AsinCacheError::StoreUnavailable(format!("delete {} refused", key)));
        }
        self.inner.remove(key).await
    }
}

pub struct TestHarness<B: BlobBackend> {
    pub store: Arc<BlobStore<B>>,
    pub api: Arc<StubApi>,
    pub cache: Arc<CacheService<B, Arc<StubApi>>>,
    pub bus: NotificationBus,
    pub invalidation: Arc<InvalidationService<B, Arc<StubApi>>>,
}

pub fn create_test_harness_with<B: BlobBackend>(backend: B, api: StubApi, policy: CachePolicy) -> TestHarness<B> {
    let store = Arc::new(BlobStore::new(backend));
    let api = Arc::new(api);
    let fetcher = Arc::new(ProductFetcher::new(api.clone()));
    let cache = Arc::new(CacheService::new(store.clone(), fetcher, policy));
    let bus = NotificationBus::default();
    let invalidation = Arc::new(InvalidationService::new(cache.clone(), bus.clone()));
    TestHarness {
        store,
        api,
        cache,
        bus,
        invalidation,
    }
}

pub fn create_test_harness() -> TestHarness<InMemoryBackend> {
    create_test_harness_with(InMemoryBackend::new(), StubApi::new(), CachePolicy::default())
}

/// Invalidator that answers with [`sample_record`]s without touching a cache or bus.
#[derive(Default)]
pub struct ScriptedInvalidator {
    gate: Option<Arc<Semaphore>>,
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedInvalidator {
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        ScriptedInvalidator {
            gate: Some(gate),
            ..ScriptedInvalidator::default()
        }
    }

    pub fn failing(gate: Option<Arc<Semaphore>>) -> Self {
        ScriptedInvalidator {
            gate,
            fail: true,
            ..ScriptedInvalidator::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Invalidator for ScriptedInvalidator {
    async fn request_invalidation(&self, keys: Vec<Asin>) -> Result<InvalidationOutcome, AsinCacheError> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate open");
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AsinCacheError::UpstreamTransportFailure(
                "invalidate".to_string(),
                "connection refused".to_string(),
            ));
        }
        Ok(InvalidationOutcome {
            invalidated_count: keys.len(),
            fresh_data: keys.iter().map(|k| (k.clone(), sample_record(k))).collect(),
        })
    }
}

/// Yields to the scheduler until `condition` holds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
