// Port to the persisted client state
use async_trait::async_trait;

pub const KEY_USER: &str = "user";
pub const KEY_THEME: &str = "theme";
pub const KEY_SIDEBAR_COLLAPSED: &str = "sidebarCollapsed";
pub const KEY_DEFAULT_CHART_TYPE: &str = "defaultChartType";
pub const KEY_ENABLE_ANIMATIONS: &str = "enableAnimations";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// String key-value storage. Reads never fail: anything unreadable is
/// reported as absent.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
