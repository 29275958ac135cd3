use crate::core::errors::AsinCacheError;
use crate::infrastructure::store::BlobBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryBackend {
    blobs: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        InMemoryBackend {
            blobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobBackend for InMemoryBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, AsinCacheError> {
        let blobs = self.blobs.read().await;
        Ok(blobs.get(key).cloned())
    }

    async fn write(&self, key: &str, body: String) -> Result<(), AsinCacheError> {
        let mut blobs = self.blobs.write().await;
        blobs.insert(key.to_string(), body);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AsinCacheError> {
        let mut blobs = self.blobs.write().await;
        blobs.remove(key);
        Ok(())
    }
}
