//! Per-backend write serialization.

use tokio::sync::{Mutex, MutexGuard};

/// Serializes write and edit operations on one backend instance.
///
/// Write and edit are read-modify-write sequences (read current content,
/// compute new content, persist); concurrent tool calls on the same backend
/// must not interleave those steps. The underlying `tokio::sync::Mutex`
/// queues waiters in FIFO order, and a caller that errors out while holding
/// the guard does not poison the lock; the next waiter proceeds normally.
///
/// Reads and searches are intentionally not gated; they may interleave with
/// in-flight writes.
#[derive(Debug, Default)]
pub struct WriteGate {
    inner: Mutex<()>,
}

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the gate. Held across the whole read-modify-write sequence.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }
}
