//! toolfs-core: composite virtual filesystem for coding-agent tool calls.
//!
//! This crate provides:
//!
//! - **Backends**: the [`backend::FileBackend`] contract plus a real-disk
//!   backend, an in-memory scratch backend, and a longest-prefix composite
//!   router over mounted backends
//! - **Content ops**: paginated line-numbered reads and occurrence-counted
//!   string edits
//! - **Search**: external ripgrep with an in-process `grep-searcher`
//!   fallback, plus anchored glob listings
//! - **Review queue**: every write/edit becomes a pending change that can
//!   auto-apply or wait for an external apply/reject decision
//! - **Tools**: the agent-facing ls/read/write/edit/grep/glob surface over
//!   any backend

pub mod backend;
pub mod config;
pub mod content;
pub mod gate;
pub mod resolve;
pub mod review;
pub mod search;
pub mod tools;

pub use backend::{CompositeBackend, CompositeBuilder, FileBackend, LocalBackend, MemoryBackend};
pub use config::ToolfsConfig;
pub use review::{ChangeQueue, ChangeSink};
pub use search::SearchOptions;
pub use toolfs_types::{
    ChangeEvent, ChangeStatus, EditResult, FileData, FileInfo, FsError, GrepMatch, PendingChange,
    WriteResult,
};
