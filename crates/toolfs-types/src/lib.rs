//! Pure data types for toolfs.
//!
//! This crate has no I/O and no async. It holds the types that cross the
//! backend boundary: file metadata, grep matches, pending changes and their
//! lifecycle events, operation results, and the error taxonomy every public
//! operation returns.

mod change;
mod error;
mod info;

pub use change::{
    ChangeEvent, ChangeStatus, EditResult, PendingChange, WriteResult, next_change_id,
};
pub use error::FsError;
pub use info::{FileData, FileInfo, GrepMatch};
