// Persistence Adapter: versioned wizard snapshots, pluggable storage, and a
// debounced writer task per session. Contents are never interpreted here
// beyond the consistency checks a restored state must pass.

pub mod scheduler;
pub mod snapshot;
pub mod storage;

use thiserror::Error;

pub use scheduler::{FlushOutcome, SnapshotScheduler};
pub use snapshot::{legacy_snapshot_key, restore_or_fresh, snapshot_key};
pub use storage::{MemorySnapshotStorage, RedisSnapshotStorage, SnapshotStorage};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("snapshot carries no version")]
    MissingVersion,

    #[error("snapshot version {0} is not supported")]
    UnsupportedVersion(u64),

    #[error("snapshot is inconsistent: {0}")]
    Inconsistent(String),

    #[error("snapshot storage quota exceeded")]
    QuotaExceeded,

    #[error("snapshot storage error: {0}")]
    Storage(String),
}

impl From<redis::RedisError> for PersistenceError {
    fn from(e: redis::RedisError) -> Self {
        PersistenceError::Storage(e.to_string())
    }
}
