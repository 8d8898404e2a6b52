//! In-memory scratch backend.
//!
//! Useful for ephemeral workspaces and for tests: same contract as the
//! local backend, no disk underneath. Entries live in a path-keyed map
//! guarded by an `RwLock`; the change queue's sink writes back into the
//! same map.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use toolfs_glob::GlobPattern;
use toolfs_types::{EditResult, FileData, FileInfo, FsError, GrepMatch, WriteResult};

use super::FileBackend;
use crate::config::ToolfsConfig;
use crate::content;
use crate::gate::WriteGate;
use crate::resolve::{normalize_virtual, virtual_to_relative};
use crate::review::{ChangeQueue, ChangeSink};
use crate::search::{self, SearchOptions};

/// Map keys are root-relative forward-slash paths; the empty string is the
/// root directory itself.
#[derive(Debug, Clone)]
enum MemEntry {
    File {
        content: String,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    },
    Directory {
        modified_at: DateTime<Utc>,
    },
}

type Entries = Arc<RwLock<HashMap<String, MemEntry>>>;

pub struct MemoryBackend {
    entries: Entries,
    config: ToolfsConfig,
    queue: Arc<ChangeQueue>,
    gate: WriteGate,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_config(ToolfsConfig::default())
    }

    pub fn with_config(config: ToolfsConfig) -> Self {
        let queue = Arc::new(ChangeQueue::new(config.auto_apply, config.history_capacity));
        Self::with_queue(config, queue)
    }

    pub fn with_queue(config: ToolfsConfig, queue: Arc<ChangeQueue>) -> Self {
        let mut map = HashMap::new();
        map.insert(
            String::new(),
            MemEntry::Directory {
                modified_at: Utc::now(),
            },
        );
        Self {
            entries: Arc::new(RwLock::new(map)),
            config,
            queue,
            gate: WriteGate::new(),
        }
    }

    pub fn queue(&self) -> &Arc<ChangeQueue> {
        &self.queue
    }

    /// Normalize to `(virtual, map key)`.
    fn resolve(virtual_path: &str) -> Result<(String, String), FsError> {
        let normalized = normalize_virtual(virtual_path)?;
        let key = virtual_to_relative(&normalized).to_string();
        Ok((normalized, key))
    }

    async fn file_content(&self, key: &str, normalized: &str) -> Result<String, FsError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(MemEntry::File { content, .. }) => Ok(content.clone()),
            Some(MemEntry::Directory { .. }) => Err(FsError::IsADirectory {
                path: normalized.to_string(),
            }),
            None => Err(FsError::NotFound {
                path: normalized.to_string(),
            }),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes applied changes back into the entry map, materializing parent
/// directories like `create_dir_all` would.
struct MemorySink {
    entries: Entries,
}

#[async_trait]
impl ChangeSink for MemorySink {
    async fn persist(&self, path: &Path, content: &str) -> Result<(), FsError> {
        let key = path.to_string_lossy().replace('\\', "/");
        let mut entries = self.entries.write().await;
        let now = Utc::now();

        let mut parent = key.as_str();
        while let Some((dir, _)) = parent.rsplit_once('/') {
            entries
                .entry(dir.to_string())
                .or_insert(MemEntry::Directory { modified_at: now });
            parent = dir;
        }

        let created_at = match entries.get(&key) {
            Some(MemEntry::File { created_at, .. }) => *created_at,
            _ => now,
        };
        entries.insert(
            key,
            MemEntry::File {
                content: content.to_string(),
                created_at,
                modified_at: now,
            },
        );
        Ok(())
    }
}

#[async_trait]
impl FileBackend for MemoryBackend {
    async fn ls_info(&self, dir: &str) -> Result<Vec<FileInfo>, FsError> {
        let (normalized, key) = Self::resolve(dir)?;
        let entries = self.entries.read().await;
        match entries.get(&key) {
            Some(MemEntry::Directory { .. }) => {}
            Some(MemEntry::File { .. }) => {
                return Err(FsError::NotADirectory { path: normalized });
            }
            None => return Err(FsError::NotFound { path: normalized }),
        }

        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };
        let mut out = Vec::new();
        for (entry_key, entry) in entries.iter() {
            let Some(rest) = entry_key.strip_prefix(&prefix) else {
                continue;
            };
            // Direct children only, and not the directory itself.
            if rest.is_empty() || rest.contains('/') {
                continue;
            }
            let virtual_path = format!("/{entry_key}");
            match entry {
                MemEntry::File {
                    content,
                    modified_at,
                    ..
                } => out.push(FileInfo::file(
                    virtual_path,
                    content.len() as u64,
                    Some(*modified_at),
                )),
                MemEntry::Directory { modified_at } => {
                    out.push(FileInfo::directory(virtual_path, Some(*modified_at)));
                }
            }
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    async fn read(&self, path: &str, offset: usize, limit: usize) -> Result<String, FsError> {
        let (normalized, key) = Self::resolve(path)?;
        let text = self.file_content(&key, &normalized).await?;
        content::format_read(&text, offset, limit, self.config.max_line_length)
    }

    async fn read_raw(&self, path: &str) -> Result<FileData, FsError> {
        let (normalized, key) = Self::resolve(path)?;
        let entries = self.entries.read().await;
        match entries.get(&key) {
            Some(MemEntry::File {
                content,
                created_at,
                modified_at,
            }) => Ok(FileData::from_content(content, *created_at, *modified_at)),
            Some(MemEntry::Directory { .. }) => Err(FsError::IsADirectory { path: normalized }),
            None => Err(FsError::NotFound { path: normalized }),
        }
    }

    async fn write(&self, path: &str, content: &str) -> Result<WriteResult, FsError> {
        let _guard = self.gate.acquire().await;
        let (normalized, key) = Self::resolve(path)?;
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(MemEntry::Directory { .. }) => {
                    return Err(FsError::IsADirectory { path: normalized });
                }
                Some(MemEntry::File { .. }) => {
                    return Err(FsError::AlreadyExists { path: normalized });
                }
                None => {}
            }
        }

        let sink = Arc::new(MemorySink {
            entries: Arc::clone(&self.entries),
        });
        let change = self.queue.add_pending(key, "", content, sink).await?;
        Ok(WriteResult {
            path: normalized,
            pending_change_id: change.id,
        })
    }

    async fn edit(
        &self,
        path: &str,
        old_string: &str,
        new_string: &str,
        replace_all: bool,
    ) -> Result<EditResult, FsError> {
        let _guard = self.gate.acquire().await;
        let (normalized, key) = Self::resolve(path)?;
        let original = match self.file_content(&key, &normalized).await {
            Ok(text) => text,
            Err(e) if e.is_not_found() && old_string.is_empty() => String::new(),
            Err(e) => return Err(e),
        };

        let replaced = content::replace_occurrences(&original, old_string, new_string, replace_all)?;
        let sink = Arc::new(MemorySink {
            entries: Arc::clone(&self.entries),
        });
        let change = self
            .queue
            .add_pending(key, original, replaced.content, sink)
            .await?;
        Ok(EditResult {
            path: normalized,
            occurrences: replaced.occurrences,
            pending_change_id: change.id,
        })
    }

    async fn grep_raw(
        &self,
        pattern: &str,
        base: &str,
        glob: Option<&str>,
        options: &SearchOptions,
    ) -> Result<Vec<GrepMatch>, FsError> {
        // No real files to hand the external tool; always scan in process.
        let matcher = search::compile_matcher(pattern, options.ignore_case)?;
        let glob_pattern = glob
            .map(GlobPattern::new)
            .transpose()
            .map_err(|e| FsError::InvalidPattern(e.to_string()))?;
        let (normalized, key) = Self::resolve(base)?;

        let entries = self.entries.read().await;
        match entries.get(&key) {
            Some(MemEntry::Directory { .. }) => {}
            Some(MemEntry::File { .. }) => {
                return Err(FsError::NotADirectory { path: normalized });
            }
            None => return Err(FsError::NotFound { path: normalized }),
        }

        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };
        let mut candidates: Vec<(&String, &String)> = entries
            .iter()
            .filter_map(|(entry_key, entry)| match entry {
                MemEntry::File { content, .. } if entry_key.starts_with(&prefix) => {
                    Some((entry_key, content))
                }
                _ => None,
            })
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(b.0));

        let mut matches = Vec::new();
        for (entry_key, file_content) in candidates {
            if options.cancel.is_cancelled() {
                return Err(FsError::Cancelled);
            }
            if let Some(glob) = &glob_pattern {
                if !glob.matches_path(entry_key) {
                    continue;
                }
            }
            let virtual_path = format!("/{entry_key}");
            matches.extend(search::grep_slice(
                &matcher,
                &virtual_path,
                file_content.as_bytes(),
            ));
        }
        Ok(matches)
    }

    async fn glob_info(&self, pattern: &str, base: &str) -> Result<Vec<FileInfo>, FsError> {
        let glob_pattern =
            GlobPattern::new(pattern).map_err(|e| FsError::InvalidPattern(e.to_string()))?;
        let (normalized, key) = Self::resolve(base)?;

        let entries = self.entries.read().await;
        match entries.get(&key) {
            Some(MemEntry::Directory { .. }) => {}
            Some(MemEntry::File { .. }) => {
                return Err(FsError::NotADirectory { path: normalized });
            }
            None => return Err(FsError::NotFound { path: normalized }),
        }

        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };
        let mut out = Vec::new();
        for (entry_key, entry) in entries.iter() {
            let MemEntry::File {
                content,
                modified_at,
                ..
            } = entry
            else {
                continue;
            };
            let Some(rel_to_base) = entry_key.strip_prefix(&prefix) else {
                continue;
            };
            if glob_pattern.is_match(rel_to_base) {
                out.push(FileInfo::file(
                    format!("/{entry_key}"),
                    content.len() as u64,
                    Some(*modified_at),
                ));
            }
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_creates_parent_directories() {
        let b = MemoryBackend::new();
        b.write("/a/b/c.txt", "content").await.unwrap();

        let root = b.ls_info("/").await.unwrap();
        assert_eq!(root[0].path, "/a/");
        let inner = b.ls_info("/a/b").await.unwrap();
        assert_eq!(inner[0].path, "/a/b/c.txt");
    }

    #[tokio::test]
    async fn read_pages_with_line_numbers() {
        let b = MemoryBackend::new();
        b.write("/f.txt", "one\ntwo\nthree").await.unwrap();
        let page = b.read("/f.txt", 1, 1).await.unwrap();
        assert_eq!(page, "     2\ttwo");
    }

    #[tokio::test]
    async fn edit_preserves_created_timestamp() {
        let b = MemoryBackend::new();
        b.write("/f.txt", "old").await.unwrap();
        let before = b.read_raw("/f.txt").await.unwrap();

        b.edit("/f.txt", "old", "new", false).await.unwrap();
        let after = b.read_raw("/f.txt").await.unwrap();
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.lines, vec!["new"]);
    }

    #[tokio::test]
    async fn grep_scans_in_memory_contents() {
        let b = MemoryBackend::new();
        b.write("/src/x.ts", "const a = 1;\n// TODO: fix\n").await.unwrap();
        b.write("/src/y.rs", "// TODO rust\n").await.unwrap();

        let matches = b
            .grep_raw("todo", "/src", Some("*.ts"), &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].path, "/src/x.ts");
        assert_eq!(matches[0].line, 2);
    }

    #[tokio::test]
    async fn glob_matches_relative_to_base() {
        let b = MemoryBackend::new();
        b.write("/src/a.ts", "x").await.unwrap();
        b.write("/src/deep/b.ts", "x").await.unwrap();

        let top = b.glob_info("*.ts", "/src").await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].path, "/src/a.ts");
    }

    #[tokio::test]
    async fn ls_missing_directory_is_not_found() {
        let b = MemoryBackend::new();
        let err = b.ls_info("/nope").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
