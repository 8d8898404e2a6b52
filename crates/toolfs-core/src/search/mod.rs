//! Pattern search: external ripgrep with an in-process fallback.
//!
//! The preferred path shells out to `rg` (fast, battle-tested filtering).
//! When the binary is missing, fails, or is disabled, the fallback scanner
//! walks the tree itself and matches lines with the ripgrep crates
//! (`grep-regex` + `grep-searcher`), so both engines share one regex
//! dialect.

mod external;
mod scanner;

pub(crate) use external::{ExternalError, rg_search};
pub(crate) use scanner::{grep_local, grep_slice, walk_local};

use std::time::Duration;

use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use grep_searcher::{Searcher, Sink, SinkMatch};
use tokio_util::sync::CancellationToken;
use toolfs_types::{FsError, GrepMatch};

use crate::config::ToolfsConfig;

/// Per-call search knobs. Built from [`ToolfsConfig`] defaults; callers can
/// override and attach a cancellation token.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Case-insensitive matching (the default for agent searches).
    pub ignore_case: bool,
    /// Try the external `rg` binary first.
    pub use_external: bool,
    /// Fall back to the in-process scanner when the external tool is
    /// missing or fails. With this off, such failures surface as
    /// [`FsError::SearchUnavailable`].
    pub allow_fallback: bool,
    /// Wall-clock budget for the external tool.
    pub budget: Duration,
    /// Cap on external tool output bytes.
    pub max_output_bytes: usize,
    /// Cooperative cancellation for long-running scans.
    pub cancel: CancellationToken,
}

impl SearchOptions {
    pub fn from_config(config: &ToolfsConfig) -> Self {
        Self {
            ignore_case: true,
            use_external: config.use_external_search,
            allow_fallback: true,
            budget: Duration::from_millis(config.search_budget_ms),
            max_output_bytes: config.max_search_output_bytes,
            cancel: CancellationToken::new(),
        }
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_config(&ToolfsConfig::default())
    }
}

/// Compile the search pattern, mapping compile errors to
/// [`FsError::InvalidPattern`] with the underlying message.
pub(crate) fn compile_matcher(pattern: &str, ignore_case: bool) -> Result<RegexMatcher, FsError> {
    RegexMatcherBuilder::new()
        .case_insensitive(ignore_case)
        .build(pattern)
        .map_err(|e| FsError::InvalidPattern(e.to_string()))
}

/// `grep-searcher` sink collecting matches for one file.
pub(crate) struct MatchCollector {
    virtual_path: String,
    pub matches: Vec<GrepMatch>,
}

impl MatchCollector {
    pub(crate) fn new(virtual_path: String) -> Self {
        Self {
            virtual_path,
            matches: Vec::new(),
        }
    }
}

impl Sink for MatchCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _searcher: &Searcher, mat: &SinkMatch<'_>) -> Result<bool, Self::Error> {
        let text = String::from_utf8_lossy(mat.bytes())
            .trim_end_matches(['\r', '\n'])
            .to_string();
        self.matches.push(GrepMatch {
            path: self.virtual_path.clone(),
            line: mat.line_number().unwrap_or(0),
            text,
        });
        Ok(true)
    }
}
