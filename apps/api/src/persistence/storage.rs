use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use redis::AsyncCommands;

use super::PersistenceError;

/// Snapshots expire after 30 days without a write.
pub const SNAPSHOT_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Key/value store for encoded snapshots.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    async fn store(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    async fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Redis
// ────────────────────────────────────────────────────────────────────────────

pub struct RedisSnapshotStorage {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisSnapshotStorage {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            ttl_secs: SNAPSHOT_TTL_SECS,
        }
    }
}

#[async_trait]
impl SnapshotStorage for RedisSnapshotStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn store(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory
// ────────────────────────────────────────────────────────────────────────────

/// Process-local storage. An optional byte quota makes writes fail the way a
/// full browser store does.
#[derive(Default)]
pub struct MemorySnapshotStorage {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    writes: AtomicUsize,
}

impl MemorySnapshotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }
}

fn poisoned<T>(_: T) -> PersistenceError {
    PersistenceError::Storage("memory snapshot store lock poisoned".to_string())
}

#[async_trait]
impl SnapshotStorage for MemorySnapshotStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn store(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(PersistenceError::QuotaExceeded);
            }
        }
        entries.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let storage = MemorySnapshotStorage::new();
        assert_eq!(storage.load("k").await.unwrap(), None);
        storage.store("k", "v1").await.unwrap();
        storage.store("k", "v2").await.unwrap();
        assert_eq!(storage.load("k").await.unwrap().as_deref(), Some("v2"));
        assert_eq!(storage.writes(), 2);
        storage.remove("k").await.unwrap();
        assert_eq!(storage.load("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_quota() {
        let storage = MemorySnapshotStorage::with_quota(16);
        storage.store("a", "0123456789").await.unwrap();
        // overwriting the same key only counts the new value
        storage.store("a", "abcdefghij").await.unwrap();
        let err = storage.store("b", "0123456789").await.unwrap_err();
        assert!(matches!(err, PersistenceError::QuotaExceeded));
        assert_eq!(storage.writes(), 2);
    }
}
