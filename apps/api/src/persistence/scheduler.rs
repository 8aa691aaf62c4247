//! Debounced snapshot writer.
//!
//! Each session owns one writer task. `schedule` replaces the pending snapshot
//! and pushes the write deadline out to `window` from now (trailing edge); a
//! burst of schedules is still written at least every `MAX_WAIT_FACTOR * window`.
//! `flush` writes whatever is pending and resolves only after the write finished.
//!
//! A failed write marks the session degraded: later snapshots are dropped and
//! the wizard carries on with its in-memory state only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use super::snapshot::{encode, Snapshot};
use super::storage::SnapshotStorage;
use crate::wizard::store::WizardState;

const MAX_WAIT_FACTOR: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushOutcome {
    Persisted,
    NothingPending,
    /// Storage is unavailable for this session; state lives in memory only.
    InMemoryOnly,
}

enum Command {
    Schedule(Box<Snapshot>),
    Flush(oneshot::Sender<FlushOutcome>),
    Shutdown(oneshot::Sender<FlushOutcome>),
}

pub struct SnapshotScheduler {
    tx: mpsc::UnboundedSender<Command>,
    degraded: Arc<AtomicBool>,
}

impl SnapshotScheduler {
    /// Spawns the writer task for `key`.
    pub fn spawn(storage: Arc<dyn SnapshotStorage>, key: String, window: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let degraded = Arc::new(AtomicBool::new(false));
        let writer = Writer {
            storage,
            key,
            window,
            degraded: degraded.clone(),
            pending: None,
        };
        tokio::spawn(writer.run(rx));
        Self { tx, degraded }
    }

    /// Queues `state` for a debounced write.
    pub fn schedule(&self, state: &WizardState) {
        if self.is_degraded() {
            debug!("Snapshot skipped: session is in-memory only");
            return;
        }
        let snapshot = Box::new(Snapshot::capture(state));
        if self.tx.send(Command::Schedule(snapshot)).is_err() {
            warn!("Snapshot writer has stopped; dropping snapshot");
        }
    }

    /// Writes the pending snapshot now.
    pub async fn flush(&self) -> FlushOutcome {
        self.request(Command::Flush).await
    }

    /// Flushes and stops the writer task.
    pub async fn shutdown(&self) -> FlushOutcome {
        self.request(Command::Shutdown).await
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    async fn request(&self, make: fn(oneshot::Sender<FlushOutcome>) -> Command) -> FlushOutcome {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(make(reply_tx)).is_err() {
            return self.stopped_outcome();
        }
        reply_rx.await.unwrap_or_else(|_| self.stopped_outcome())
    }

    fn stopped_outcome(&self) -> FlushOutcome {
        if self.is_degraded() {
            FlushOutcome::InMemoryOnly
        } else {
            FlushOutcome::NothingPending
        }
    }
}

struct Writer {
    storage: Arc<dyn SnapshotStorage>,
    key: String,
    window: Duration,
    degraded: Arc<AtomicBool>,
    pending: Option<Box<Snapshot>>,
}

impl Writer {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let mut deadline: Option<Instant> = None;
        let mut burst_started: Option<Instant> = None;

        loop {
            let command = match deadline {
                Some(at) => tokio::select! {
                    command = rx.recv() => command,
                    _ = sleep_until(at) => {
                        self.write_pending().await;
                        deadline = None;
                        burst_started = None;
                        continue;
                    }
                },
                None => rx.recv().await,
            };

            match command {
                Some(Command::Schedule(snapshot)) => {
                    self.pending = Some(snapshot);
                    let now = Instant::now();
                    let started = *burst_started.get_or_insert(now);
                    let cap = started + self.window * MAX_WAIT_FACTOR;
                    deadline = Some((now + self.window).min(cap));
                }
                Some(Command::Flush(reply)) => {
                    let outcome = self.write_pending().await;
                    deadline = None;
                    burst_started = None;
                    let _ = reply.send(outcome);
                }
                Some(Command::Shutdown(reply)) => {
                    let outcome = self.write_pending().await;
                    let _ = reply.send(outcome);
                    break;
                }
                None => {
                    // every handle dropped without an explicit shutdown
                    self.write_pending().await;
                    break;
                }
            }
        }
        debug!(key = %self.key, "Snapshot writer stopped");
    }

    async fn write_pending(&mut self) -> FlushOutcome {
        let Some(snapshot) = self.pending.take() else {
            return if self.degraded.load(Ordering::SeqCst) {
                FlushOutcome::InMemoryOnly
            } else {
                FlushOutcome::NothingPending
            };
        };
        if self.degraded.load(Ordering::SeqCst) {
            return FlushOutcome::InMemoryOnly;
        }

        let result = match encode(&snapshot) {
            Ok(raw) => self.storage.store(&self.key, &raw).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => FlushOutcome::Persisted,
            Err(e) => {
                warn!(key = %self.key, "Snapshot write failed, continuing in memory only: {e}");
                self.degraded.store(true, Ordering::SeqCst);
                FlushOutcome::InMemoryOnly
            }
        }
    }
}
