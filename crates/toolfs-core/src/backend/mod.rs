//! File backends: the operation contract and its implementations.
//!
//! A backend maps agent-facing virtual paths (`/src/main.rs`) onto some
//! storage: the real filesystem ([`LocalBackend`]) or an in-memory scratch
//! map ([`MemoryBackend`]). [`CompositeBackend`] routes between
//! mounted backends by longest prefix.

mod local;
mod memory;
mod router;

pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use router::{CompositeBackend, CompositeBuilder, MountInfo};

use async_trait::async_trait;
use toolfs_types::{EditResult, FileData, FileInfo, FsError, GrepMatch, WriteResult};

use crate::search::SearchOptions;

/// The file-operation contract every backend implements.
///
/// All paths are virtual: absolute-style, forward slashes. Operations
/// return typed errors for contract violations (traversal, ambiguous
/// replacement, bad patterns) so the tool layer can render them as
/// actionable text.
#[async_trait]
pub trait FileBackend: Send + Sync {
    /// List one directory. Directory entries carry a trailing `/`.
    async fn ls_info(&self, dir: &str) -> Result<Vec<FileInfo>, FsError>;

    /// Read a page of a file, rendered with 6-wide 1-based line numbers.
    async fn read(&self, path: &str, offset: usize, limit: usize) -> Result<String, FsError>;

    /// Read whole-file content split on line boundaries, with timestamps.
    async fn read_raw(&self, path: &str) -> Result<FileData, FsError>;

    /// Create a file. Write is create-only: an existing file fails with
    /// [`FsError::AlreadyExists`]; modifying goes through [`Self::edit`].
    /// The mutation is queued as a pending change before anything is
    /// persisted.
    async fn write(&self, path: &str, content: &str) -> Result<WriteResult, FsError>;

    /// Occurrence-counted string replacement. Also queued as a pending
    /// change.
    async fn edit(
        &self,
        path: &str,
        old_string: &str,
        new_string: &str,
        replace_all: bool,
    ) -> Result<EditResult, FsError>;

    /// Case-insensitive regex search under `base`, optionally filtered by a
    /// glob (`-g` semantics: a slash-free glob matches file names).
    async fn grep_raw(
        &self,
        pattern: &str,
        base: &str,
        glob: Option<&str>,
        options: &SearchOptions,
    ) -> Result<Vec<GrepMatch>, FsError>;

    /// List files matching an anchored glob relative to `base`, sorted by
    /// path.
    async fn glob_info(&self, pattern: &str, base: &str) -> Result<Vec<FileInfo>, FsError>;
}

/// Map an I/O error to [`FsError::NotFound`] for the given virtual path,
/// passing other kinds through.
pub(crate) fn map_io(err: std::io::Error, virtual_path: &str) -> FsError {
    if err.kind() == std::io::ErrorKind::NotFound {
        FsError::NotFound {
            path: virtual_path.to_string(),
        }
    } else {
        FsError::Io(err)
    }
}
