//! Configuration for backends and search.

use serde::{Deserialize, Serialize};

/// Tunable settings shared by the backends.
///
/// All fields have working defaults; deserializing `{}` yields the same
/// configuration as [`ToolfsConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolfsConfig {
    /// Apply pending changes immediately after they are queued. Disable to
    /// gate mutations behind an external review step.
    pub auto_apply: bool,
    /// Prefer the external ripgrep binary for searches, falling back to the
    /// in-process scanner when it is missing or fails.
    pub use_external_search: bool,
    /// Wall-clock budget for one external search invocation, milliseconds.
    pub search_budget_ms: u64,
    /// Cap on external search output. Exceeding it fails that call only.
    pub max_search_output_bytes: usize,
    /// Default page size for read, in lines.
    pub read_limit: usize,
    /// Lines longer than this many characters are chunked on read.
    pub max_line_length: usize,
    /// Capacity of the applied/rejected change history ring.
    pub history_capacity: usize,
}

impl Default for ToolfsConfig {
    fn default() -> Self {
        Self {
            auto_apply: true,
            use_external_search: true,
            search_budget_ms: 10_000,
            max_search_output_bytes: 10 * 1024 * 1024,
            read_limit: 2000,
            max_line_length: 2000,
            history_capacity: 50,
        }
    }
}
