//! The write/edit queue: pending changes, apply/reject, and change events.
//!
//! Every mutation a backend accepts becomes a [`PendingChange`] before
//! anything is persisted. By default changes auto-apply immediately, giving
//! callers plain synchronous semantics; with auto-apply off, an external
//! review surface (a diff UI) can inspect, apply, or reject each change
//! before storage is touched.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use toolfs_types::{ChangeEvent, ChangeStatus, FsError, PendingChange};

/// Where an applied change is persisted. Disk for the local backend, the
/// in-memory map for the scratch backend.
#[async_trait]
pub trait ChangeSink: Send + Sync {
    async fn persist(&self, path: &Path, content: &str) -> Result<(), FsError>;
}

struct QueueState {
    pending: HashMap<String, (PendingChange, Arc<dyn ChangeSink>)>,
    /// Applied/rejected changes, oldest first, FIFO-evicted at capacity.
    history: VecDeque<PendingChange>,
}

/// Tracks proposed mutations until they reach a terminal state.
///
/// State machine per change: `Pending -> Applied` or `Pending -> Rejected`,
/// both terminal. Terminal changes move to a bounded history ring and leave
/// the pending map.
pub struct ChangeQueue {
    state: Mutex<QueueState>,
    events: broadcast::Sender<ChangeEvent>,
    auto_apply: bool,
    history_capacity: usize,
}

impl ChangeQueue {
    /// A queue that applies changes as soon as they are added.
    pub fn auto_applying(history_capacity: usize) -> Self {
        Self::new(true, history_capacity)
    }

    pub fn new(auto_apply: bool, history_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(QueueState {
                pending: HashMap::new(),
                history: VecDeque::new(),
            }),
            events,
            auto_apply,
            history_capacity,
        }
    }

    /// Subscribe to change notifications. Subscribing is optional; events
    /// are dropped when nobody listens.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Queue a mutation. Fires `Added`, then, when auto-apply is on,
    /// immediately applies it. Returns the change in its resulting state.
    ///
    /// If auto-apply's persist step fails, the error propagates and the
    /// change stays pending so the caller can retry or surface it.
    pub async fn add_pending(
        &self,
        real_path: impl Into<std::path::PathBuf>,
        original_content: impl Into<String>,
        new_content: impl Into<String>,
        sink: Arc<dyn ChangeSink>,
    ) -> Result<PendingChange, FsError> {
        let change = PendingChange::new(real_path, original_content, new_content);
        let id = change.id.clone();

        {
            let mut state = self.state.lock().await;
            state.pending.insert(id.clone(), (change.clone(), sink));
        }
        tracing::debug!(change_id = %id, path = %change.file_path.display(), "change queued");
        let _ = self.events.send(ChangeEvent::Added(change.clone()));

        if self.auto_apply {
            self.apply(&id).await?;
            let mut applied = change;
            applied.status = ChangeStatus::Applied;
            Ok(applied)
        } else {
            Ok(change)
        }
    }

    /// Apply a pending change: persist through its sink, mark `Applied`,
    /// archive, and fire the event. Returns `false` for unknown IDs (already
    /// applied or rejected included).
    ///
    /// A persist failure returns the underlying I/O error and leaves the
    /// change pending; it is never silently marked applied.
    pub async fn apply(&self, id: &str) -> Result<bool, FsError> {
        let mut state = self.state.lock().await;
        let (change, sink) = match state.pending.get(id) {
            Some((change, sink)) => (change.clone(), Arc::clone(sink)),
            None => return Ok(false),
        };

        sink.persist(&change.file_path, &change.new_content).await?;

        let mut change = match state.pending.remove(id) {
            Some((change, _)) => change,
            None => return Ok(false),
        };
        change.status = ChangeStatus::Applied;
        tracing::debug!(change_id = %id, "change applied");
        let _ = self.events.send(ChangeEvent::Applied(change.clone()));
        Self::archive(&mut state, change, self.history_capacity);
        Ok(true)
    }

    /// Reject a pending change without touching storage. Idempotent: a
    /// second reject (or rejecting an unknown ID) is a no-op returning
    /// `false`.
    pub async fn reject(&self, id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some((mut change, _)) = state.pending.remove(id) else {
            return false;
        };
        change.status = ChangeStatus::Rejected;
        tracing::debug!(change_id = %id, "change rejected");
        let _ = self.events.send(ChangeEvent::Rejected(change.clone()));
        Self::archive(&mut state, change, self.history_capacity);
        true
    }

    /// Snapshot of changes still awaiting apply/reject.
    pub async fn pending(&self) -> Vec<PendingChange> {
        let state = self.state.lock().await;
        let mut changes: Vec<_> = state.pending.values().map(|(c, _)| c.clone()).collect();
        changes.sort_by(|a, b| a.timestamp_ms.cmp(&b.timestamp_ms).then(a.id.cmp(&b.id)));
        changes
    }

    /// Recently applied or rejected changes, oldest first.
    pub async fn history(&self) -> Vec<PendingChange> {
        let state = self.state.lock().await;
        state.history.iter().cloned().collect()
    }

    fn archive(state: &mut QueueState, change: PendingChange, capacity: usize) {
        state.history.push_back(change);
        while state.history.len() > capacity {
            state.history.pop_front();
        }
    }
}
