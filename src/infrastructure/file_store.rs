// Key-value stores backing the persisted client state
use crate::application::key_value_store::{KeyValueStore, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// All keys kept in one JSON object on disk, rewritten on every change
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store, treating a missing or malformed file as empty
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed state file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Could not read state file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    async fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let raw = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.flush(&entries).await?;
        }
        Ok(())
    }
}

/// Non-persistent store for tests
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("storefront-insights-{}-{}.json", name, std::process::id()))
    }

    #[tokio::test]
    async fn test_file_store_persists_across_opens() {
        let path = temp_path("persist");
        let _ = tokio::fs::remove_file(&path).await;

        let store = JsonFileStore::open(&path).await;
        store.set("theme", "dark").await.unwrap();
        store.set("sidebarCollapsed", "true").await.unwrap();
        store.remove("sidebarCollapsed").await.unwrap();

        let reopened = JsonFileStore::open(&path).await;
        assert_eq!(reopened.get("theme").await.as_deref(), Some("dark"));
        assert_eq!(reopened.get("sidebarCollapsed").await, None);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_malformed_file_is_empty() {
        let path = temp_path("malformed");
        tokio::fs::write(&path, "[1, 2").await.unwrap();

        let store = JsonFileStore::open(&path).await;
        assert_eq!(store.get("user").await, None);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("theme").await, None);
        store.set("theme", "auto").await.unwrap();
        assert_eq!(store.get("theme").await.as_deref(), Some("auto"));
    }
}
