//! Draft sessions: one wizard state per session id, mutated only through
//! `dispatch`, which holds the session's mutex across apply-and-persist.
//! Sessions left untouched past the idle window are flushed and dropped by a
//! periodic sweep; their snapshots stay in storage for a later restore.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::draft::DocumentKind;
use crate::persistence::{
    legacy_snapshot_key, restore_or_fresh, snapshot_key, FlushOutcome, SnapshotScheduler,
    SnapshotStorage,
};
use crate::wizard::store::{apply, Action, Transition, WizardState};

pub struct DraftSession {
    pub id: Uuid,
    state: Mutex<WizardState>,
    persister: SnapshotScheduler,
    epoch: Instant,
    /// Milliseconds after `epoch` of the last use.
    last_touched_ms: AtomicU64,
}

impl DraftSession {
    fn new(id: Uuid, state: WizardState, persister: SnapshotScheduler, epoch: Instant) -> Self {
        let session = Self {
            id,
            state: Mutex::new(state),
            persister,
            epoch,
            last_touched_ms: AtomicU64::new(0),
        };
        session.touch();
        session
    }

    /// Current state (a copy).
    pub async fn state(&self) -> WizardState {
        self.touch();
        self.state.lock().await.clone()
    }

    /// Applies `action`; applied transitions are scheduled for persistence.
    pub async fn dispatch(&self, action: Action) -> Transition {
        self.touch();
        let mut state = self.state.lock().await;
        let transition = apply(state.clone(), action);
        if transition.is_applied() {
            *state = transition.state.clone();
            self.persister.schedule(&state);
        }
        transition
    }

    pub async fn flush(&self) -> FlushOutcome {
        self.touch();
        self.persister.flush().await
    }

    /// True once snapshot storage has failed for this session.
    pub fn is_in_memory_only(&self) -> bool {
        self.persister.is_degraded()
    }

    fn touch(&self) {
        let now = self.epoch.elapsed().as_millis() as u64;
        self.last_touched_ms.fetch_max(now, Ordering::Relaxed);
    }

    fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_touched_ms.load(Ordering::Relaxed));
        self.epoch.elapsed().saturating_sub(last)
    }
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<DraftSession>>>,
    storage: Arc<dyn SnapshotStorage>,
    debounce: Duration,
    epoch: Instant,
}

impl SessionRegistry {
    pub fn new(storage: Arc<dyn SnapshotStorage>, debounce: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            storage,
            debounce,
            epoch: Instant::now(),
        }
    }

    /// Returns the live session for `session_id`, restores it from storage, or
    /// starts a fresh `kind` draft. The flag reports whether a snapshot was used.
    ///
    /// The snapshot is loaded without holding the registry lock. If another
    /// caller registered the same id meanwhile, theirs is returned.
    pub async fn open(
        &self,
        kind: DocumentKind,
        session_id: Option<Uuid>,
    ) -> (Arc<DraftSession>, bool) {
        if let Some(existing) = self.live(session_id).await {
            return (existing, true);
        }

        let id = session_id.unwrap_or_else(Uuid::new_v4);
        let (raw, from_legacy) = match session_id {
            Some(id) => self.load_raw(id).await,
            None => (None, false),
        };
        let (state, restored) = restore_or_fresh(raw.as_deref(), kind);

        let mut sessions = self.sessions.write().await;
        let slot = match sessions.entry(id) {
            Entry::Occupied(existing) => {
                debug!(session_id = %id, "Draft session opened concurrently; reusing it");
                existing.get().touch();
                return (existing.get().clone(), true);
            }
            Entry::Vacant(slot) => slot,
        };

        let persister = SnapshotScheduler::spawn(self.storage.clone(), snapshot_key(id), self.debounce);
        if restored && from_legacy {
            // rewrite under the current key
            persister.schedule(&state);
        }
        let session = Arc::new(DraftSession::new(id, state, persister, self.epoch));
        slot.insert(session.clone());
        info!(session_id = %id, restored, "Draft session opened");
        (session, restored)
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<DraftSession>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Flushes and tears down a session. `None` if it was not open.
    pub async fn close(&self, id: Uuid) -> Option<FlushOutcome> {
        let session = self.sessions.write().await.remove(&id)?;
        let outcome = session.persister.shutdown().await;
        info!(session_id = %id, ?outcome, "Draft session closed");
        Some(outcome)
    }

    /// Flushes and drops every session idle for at least `idle`. Returns how
    /// many were evicted.
    pub async fn evict_idle(&self, idle: Duration) -> usize {
        let evicted: Vec<Arc<DraftSession>> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<Uuid> = sessions
                .values()
                .filter(|s| s.idle_for() >= idle)
                .map(|s| s.id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };
        for session in &evicted {
            let outcome = session.persister.shutdown().await;
            info!(session_id = %session.id, ?outcome, "Idle draft session evicted");
        }
        evicted.len()
    }

    /// Runs `evict_idle` every `every` until the registry is dropped.
    pub fn spawn_idle_sweep(self: &Arc<Self>, idle: Duration, every: Duration) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let evicted = registry.evict_idle(idle).await;
                if evicted > 0 {
                    debug!(evicted, "Idle session sweep");
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn live(&self, session_id: Option<Uuid>) -> Option<Arc<DraftSession>> {
        let session = self.get(session_id?).await?;
        session.touch();
        Some(session)
    }

    async fn load_raw(&self, id: Uuid) -> (Option<String>, bool) {
        for (key, legacy) in [(snapshot_key(id), false), (legacy_snapshot_key(id), true)] {
            match self.storage.load(&key).await {
                Ok(Some(raw)) => return (Some(raw), legacy),
                Ok(None) => continue,
                Err(e) => {
                    warn!(session_id = %id, "Snapshot load failed, starting fresh: {e}");
                    return (None, false);
                }
            }
        }
        (None, false)
    }
}
