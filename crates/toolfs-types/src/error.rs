//! Error taxonomy for every public filesystem operation.
//!
//! Contract-level failures (bad arguments, traversal attempts, ambiguous
//! replacements) are ordinary `Err` values that get rendered as actionable
//! text for the calling agent. Only genuine environment failures ride the
//! `Io` variant.

use thiserror::Error;

/// Everything a backend operation can fail with.
#[derive(Debug, Error)]
pub enum FsError {
    /// The virtual path contained a `..` segment or a leading `~`.
    #[error("path traversal rejected: {path:?} (\"..\" segments and \"~\" are not allowed)")]
    PathTraversal { path: String },

    /// The resolved path escaped the backend root.
    #[error("path escapes backend root: {path:?}")]
    OutsideRoot { path: String },

    #[error("file not found: {path:?}")]
    NotFound { path: String },

    /// Write targets may not already exist; existing files are changed via edit.
    #[error("file already exists: {path:?} (use edit to modify existing files)")]
    AlreadyExists { path: String },

    /// Writing through a symlink could redirect the write outside the root.
    #[error("refusing to write through symlink: {path:?}")]
    SymlinkNotAllowed { path: String },

    #[error("is a directory: {path:?}")]
    IsADirectory { path: String },

    #[error("not a directory: {path:?}")]
    NotADirectory { path: String },

    /// Edit called with an empty `old_string` on a non-empty file.
    #[error("old_string must not be empty (to create a file, use write)")]
    EmptyOldString,

    #[error("string not found in file: {needle:?}")]
    StringNotFound { needle: String },

    /// More than one occurrence and `replace_all` was not set.
    #[error(
        "found {count} occurrences of {needle:?}; pass replace_all=true to replace \
         every occurrence, or provide a larger unique string"
    )]
    AmbiguousReplacement { needle: String, count: usize },

    /// Read offset past the end of the file.
    #[error("offset {offset} exceeds file length of {lines} lines")]
    OffsetExceedsLength { offset: usize, lines: usize },

    /// The search pattern or glob failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// External search tool missing and the in-process fallback is disabled.
    #[error("search tool unavailable and fallback is disabled")]
    SearchUnavailable,

    /// External search exceeded its wall-clock budget or output cap.
    #[error("search exceeded its budget: {0}")]
    SearchBudgetExceeded(String),

    /// The search or listing was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// No mount matched and no default backend is configured.
    #[error("no backend mounted for path: {path:?}")]
    NoMount { path: String },

    #[error("file is not valid UTF-8: {path:?}")]
    NotUtf8 { path: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// True for `NotFound`, so callers can branch on create-vs-abort without
    /// matching the full enum.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_replacement_message_names_the_fix() {
        let err = FsError::AmbiguousReplacement {
            needle: "let x".into(),
            count: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("2 occurrences"));
        assert!(msg.contains("replace_all=true"));
    }

    #[test]
    fn offset_error_reports_both_numbers() {
        let err = FsError::OffsetExceedsLength {
            offset: 10,
            lines: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains("3 lines"));
    }

    #[test]
    fn is_not_found_only_for_not_found() {
        assert!(FsError::NotFound { path: "/a".into() }.is_not_found());
        assert!(!FsError::EmptyOldString.is_not_found());
    }
}
