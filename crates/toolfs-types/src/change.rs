//! Pending-change tracking for the write/edit review queue.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use similar::TextDiff;

/// Lifecycle of a pending change. `Applied` and `Rejected` are terminal;
/// there is no transition out of either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Pending,
    Applied,
    Rejected,
}

/// A proposed file mutation, tracked until it is applied or rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    /// Unique within the process; never reused.
    pub id: String,
    /// Real (backend-resolved) path the change targets.
    pub file_path: PathBuf,
    /// Content before the change. Empty for new files.
    pub original_content: String,
    pub new_content: String,
    /// Creation time, epoch milliseconds.
    pub timestamp_ms: u64,
    pub status: ChangeStatus,
    pub is_new_file: bool,
}

impl PendingChange {
    /// Create a fresh change in the `Pending` state with a new unique ID.
    pub fn new(
        file_path: impl Into<PathBuf>,
        original_content: impl Into<String>,
        new_content: impl Into<String>,
    ) -> Self {
        let original_content = original_content.into();
        let is_new_file = original_content.is_empty();
        Self {
            id: next_change_id(),
            file_path: file_path.into(),
            original_content,
            new_content: new_content.into(),
            timestamp_ms: epoch_ms(),
            status: ChangeStatus::Pending,
            is_new_file,
        }
    }

    /// Render the change as a unified diff for review surfaces.
    pub fn unified_diff(&self) -> String {
        let name = self.file_path.to_string_lossy();
        TextDiff::from_lines(&self.original_content, &self.new_content)
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{name}"), &format!("b/{name}"))
            .to_string()
    }
}

/// Notification fired by the review queue. Tagged per event so subscribers
/// know the payload shape statically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "change", rename_all = "lowercase")]
pub enum ChangeEvent {
    Added(PendingChange),
    Applied(PendingChange),
    Rejected(PendingChange),
}

impl ChangeEvent {
    /// The change carried by this event, whatever its tag.
    pub fn change(&self) -> &PendingChange {
        match self {
            ChangeEvent::Added(c) | ChangeEvent::Applied(c) | ChangeEvent::Rejected(c) => c,
        }
    }
}

/// Successful result of a write operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub path: String,
    pub pending_change_id: String,
}

/// Successful result of an edit operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditResult {
    pub path: String,
    /// Occurrences replaced. Zero for the empty-file bootstrap case.
    pub occurrences: usize,
    pub pending_change_id: String,
}

static CHANGE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Allocate a process-unique change ID. IDs are never reused: the counter is
/// monotonic and the process ID distinguishes restarts.
pub fn next_change_id() -> String {
    let n = CHANGE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("change-{}-{}", std::process::id(), n)
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_change_starts_pending() {
        let change = PendingChange::new("/tmp/a.txt", "", "hello");
        assert_eq!(change.status, ChangeStatus::Pending);
        assert!(change.is_new_file);
    }

    #[test]
    fn existing_content_is_not_new_file() {
        let change = PendingChange::new("/tmp/a.txt", "old", "new");
        assert!(!change.is_new_file);
    }

    #[test]
    fn ids_are_unique() {
        let a = next_change_id();
        let b = next_change_id();
        assert_ne!(a, b);
    }

    #[test]
    fn unified_diff_shows_both_sides() {
        let change = PendingChange::new("/tmp/a.txt", "line1\nline2\n", "line1\nLINE2\n");
        let diff = change.unified_diff();
        assert!(diff.contains("-line2"));
        assert!(diff.contains("+LINE2"));
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let change = PendingChange::new("/tmp/a.txt", "", "x");
        let event = ChangeEvent::Added(change);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "added");
        assert!(json["change"]["id"].is_string());
    }
}
