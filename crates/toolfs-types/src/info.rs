//! File metadata and search-match types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one entry in a listing or glob result.
///
/// `path` is always a virtual path: forward slashes, leading `/`. Directory
/// paths carry a trailing `/` and no size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl FileInfo {
    /// Metadata for a regular file.
    pub fn file(path: impl Into<String>, size: u64, modified_at: Option<DateTime<Utc>>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            size: Some(size),
            modified_at,
        }
    }

    /// Metadata for a directory. Appends the trailing `/` if missing.
    pub fn directory(path: impl Into<String>, modified_at: Option<DateTime<Utc>>) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        Self {
            path,
            is_dir: true,
            size: None,
            modified_at,
        }
    }
}

/// Whole-file content split on line boundaries, with creation and
/// modification timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    pub lines: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl FileData {
    /// Split `content` into lines. A trailing newline does not produce a
    /// phantom empty final line.
    pub fn from_content(
        content: &str,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            lines: content.lines().map(str::to_owned).collect(),
            created_at,
            modified_at,
        }
    }
}

/// One matching line from a pattern search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrepMatch {
    /// Virtual path of the file containing the match.
    pub path: String,
    /// 1-based line number.
    pub line: u64,
    /// The matching line, without its trailing newline.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_info_gets_trailing_slash() {
        let info = FileInfo::directory("/src", None);
        assert_eq!(info.path, "/src/");
        assert!(info.is_dir);
        assert!(info.size.is_none());
    }

    #[test]
    fn directory_info_keeps_existing_slash() {
        let info = FileInfo::directory("/src/", None);
        assert_eq!(info.path, "/src/");
    }

    #[test]
    fn file_data_split_ignores_trailing_newline() {
        let now = Utc::now();
        let data = FileData::from_content("a\nb\n", now, now);
        assert_eq!(data.lines, vec!["a", "b"]);
    }

    #[test]
    fn file_data_empty_content_has_no_lines() {
        let now = Utc::now();
        let data = FileData::from_content("", now, now);
        assert!(data.lines.is_empty());
    }
}
