use crate::core::errors::AsinCacheError;
use crate::core::models::{CacheEntry, Price, ProductRecord};
use crate::infrastructure::store::file::FileBackend;
use crate::infrastructure::store::in_memory::InMemoryBackend;
use crate::infrastructure::store::{BlobBackend, BlobStore};
use crate::tests::{asin, sample_record};
use chrono::Utc;
use std::time::Duration;

const WEEK: Duration = Duration::from_secs(60 * 60 * 24 * 7);

#[tokio::test]
async fn test_set_then_get_returns_value() {
    let store = BlobStore::new(InMemoryBackend::new());
    let record = sample_record(&asin("B000A"));
    store.set("data:B000A", &record, WEEK).await.unwrap();

    let cached: Option<ProductRecord> = store.get("data:B000A").await.unwrap();
    assert_eq!(cached, Some(record));
}

#[tokio::test]
async fn test_expired_entry_reads_as_absent_but_stays_stored() {
    let backend = InMemoryBackend::new();
    let store = BlobStore::new(backend.clone());
    let stale = CacheEntry::fetched_at(
        sample_record(&asin("B000A")),
        Utc::now() - chrono::Duration::days(8),
        WEEK,
    );
    store.set_entry("data:B000A", &stale).await.unwrap();

    let cached: Option<ProductRecord> = store.get("data:B000A").await.unwrap();
    assert!(cached.is_none());
    assert_eq!(backend.len().await, 1);
    let raw = store.get_entry::<ProductRecord>("data:B000A").await.unwrap().unwrap();
    assert!(raw.is_expired());
}

#[tokio::test]
async fn test_entry_at_exact_ttl_is_still_valid() {
    let now = Utc::now();
    let entry = CacheEntry::fetched_at((), now - chrono::Duration::days(7), WEEK);
    assert!(!entry.is_expired_at(now));
    assert!(entry.is_expired_at(now + chrono::Duration::milliseconds(1)));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let store = BlobStore::new(InMemoryBackend::new());
    store.set("data:B000A", &sample_record(&asin("B000A")), WEEK).await.unwrap();

    store.delete("data:B000A").await.unwrap();
    store.delete("data:B000A").await.unwrap();
    store.delete("data:NEVER").await.unwrap();
    assert!(store.get::<ProductRecord>("data:B000A").await.unwrap().is_none());
}

#[tokio::test]
async fn test_expire_marks_entry_stale_in_place() {
    let backend = InMemoryBackend::new();
    let store = BlobStore::new(backend.clone());
    store.set("data:B000A", &sample_record(&asin("B000A")), WEEK).await.unwrap();

    store.expire("data:B000A").await.unwrap();
    store.expire("data:MISSING").await.unwrap();

    assert!(store.get::<ProductRecord>("data:B000A").await.unwrap().is_none());
    let raw = store.get_entry::<ProductRecord>("data:B000A").await.unwrap().unwrap();
    assert_eq!(raw.ttl_ms, 0);
    assert_eq!(raw.value.title, "Title B000A");
    assert_eq!(backend.keys().await, vec!["data:B000A".to_string()]);
}

#[tokio::test]
async fn test_corrupt_blob_is_store_unavailable() {
    let backend = InMemoryBackend::new();
    backend.write("data:B000A", "{not json".to_string()).await.unwrap();
    let store = BlobStore::new(backend);

    let result = store.get::<ProductRecord>("data:B000A").await;
    assert!(matches!(result, Err(AsinCacheError::StoreUnavailable(_))));
}

#[tokio::test]
async fn test_entry_layout_matches_persisted_format() {
    let backend = InMemoryBackend::new();
    let store = BlobStore::new(backend.clone());
    store.set("data:B000A", &sample_record(&asin("B000A")), WEEK).await.unwrap();

    let body = backend.read("data:B000A").await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["ttlMs"], 604_800_000u64);
    assert!(json["fetchedAt"].is_i64());
    assert_eq!(json["value"]["purchaseLink"], "https://www.amazon.com/link/B000A");
    assert_eq!(json["value"]["reviewCount"], 12);
}

#[tokio::test]
async fn test_legacy_entry_field_names_are_accepted() {
    let backend = InMemoryBackend::new();
    let legacy = format!(
        r#"{{"value":{{"title":"Vinland","link":"https://a.co/x","thumbnails":[],"rating":5,"reviews":3,"price":"$18.99"}},"fetchedAt":{},"ttlMs":604800000}}"#,
        Utc::now().timestamp_millis()
    );
    backend.write("data:B000V", legacy).await.unwrap();
    let store = BlobStore::new(backend);

    let record: ProductRecord = store.get("data:B000V").await.unwrap().unwrap();
    assert_eq!(record.purchase_link, "https://a.co/x");
    assert_eq!(record.review_count, 3);
    assert_eq!(record.price, Price::Label("$18.99".to_string()));
}

#[tokio::test]
async fn test_file_backend_persists_across_reopen() {
    let root = tempfile::tempdir().unwrap();
    let record = sample_record(&asin("B000F"));
    {
        let store = BlobStore::new(FileBackend::open(root.path(), "serpapi-cache").await.unwrap());
        store.set("data:B000F", &record, WEEK).await.unwrap();
    }

    let store = BlobStore::new(FileBackend::open(root.path(), "serpapi-cache").await.unwrap());
    assert_eq!(store.get::<ProductRecord>("data:B000F").await.unwrap(), Some(record));
    assert!(store.backend().dir().join("data%3AB000F.json").exists());

    store.delete("data:B000F").await.unwrap();
    store.delete("data:B000F").await.unwrap();
    assert!(store.get::<ProductRecord>("data:B000F").await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_backend_rejects_path_like_namespace() {
    let root = tempfile::tempdir().unwrap();
    let result = FileBackend::open(root.path(), "../escape").await;
    assert!(matches!(result, Err(AsinCacheError::InvalidConfig(..))));
}
