use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Stored value is corrupt: {0}")]
    Corrupt(String),
}

/// Counter state after [`ExpiringStore::increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u64,
    /// Time until the counter's window closes.
    pub resets_in: Duration,
}

/// Keyed string store with per-key expiry. Backs OTP codes, verification
/// markers and request throttling.
#[async_trait]
pub trait ExpiringStore: Send + Sync {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically bump a counter. The first increment opens a window of
    /// length `window`; the counter disappears when it closes.
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, StoreError>;
}
