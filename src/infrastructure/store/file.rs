use crate::core::errors::AsinCacheError;
use crate::infrastructure::store::BlobBackend;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// One JSON file per key under `<root>/<namespace>/`.
#[derive(Clone, Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub async fn open(root: impl AsRef<Path>, namespace: &str) -> Result<Self, AsinCacheError> {
        if namespace.is_empty() || namespace.contains(['/', '\\']) || namespace.starts_with('.') {
            return Err(AsinCacheError::InvalidConfig(
                "BLOB_STORE_NAMESPACE".to_string(),
                format!("`{}` is not a valid namespace", namespace),
            ));
        }
        let dir = root.as_ref().join(namespace);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AsinCacheError::StoreUnavailable(format!("Cannot create {}: {}", dir.display(), e)))?;
        debug!(dir = %dir.display(), "opened file blob store");
        Ok(FileBackend { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

/// Percent-encodes everything outside `[A-Za-z0-9_-]` so any key maps to a portable file name.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

#[async_trait]
impl BlobBackend for FileBackend {
    async fn read(&self, key: &str) -> Result<Option<String>, AsinCacheError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AsinCacheError::StoreUnavailable(format!("Failed to read {}: {}", key, e))),
        }
    }

    async fn write(&self, key: &str, body: String) -> Result<(), AsinCacheError> {
        // Write-then-rename keeps readers from observing a half-written entry.
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| AsinCacheError::StoreUnavailable(format!("Failed to write {}: {}", key, e)))?;
        if let Err(e) = tokio::fs::rename(&tmp, self.path_for(key)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AsinCacheError::StoreUnavailable(format!("Failed to write {}: {}", key, e)));
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AsinCacheError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AsinCacheError::StoreUnavailable(format!("Failed to delete {}: {}", key, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::encode_key;

    #[test]
    fn test_encode_key_escapes_separators() {
        assert_eq!(encode_key("data:B000X"), "data%3AB000X");
        assert_eq!(encode_key("a/../b"), "a%2F%2E%2E%2Fb");
    }
}
