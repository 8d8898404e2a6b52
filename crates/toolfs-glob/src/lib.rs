//! Glob pattern compilation for toolfs.
//!
//! Agent tool calls filter files with shell-style globs (`*.rs`,
//! `src/**/*.{ts,tsx}`). This crate compiles those patterns into anchored
//! regexes matched against forward-slash relative paths:
//!
//! - `**` matches across path separators
//! - `*` matches within a single segment
//! - `?` matches one non-separator character
//! - `[abc]` / `[a-z]` / `[!abc]` character classes
//! - `{a,b}` alternation
//!
//! A pattern with no `/` filters by file name only, matching ripgrep's `-g`
//! behavior.

mod pattern;

pub use pattern::{GlobError, GlobPattern, contains_glob};
