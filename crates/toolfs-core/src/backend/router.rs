//! Longest-prefix router over mounted backends.
//!
//! A composite presents several backends as one tree: `/mem` can be a
//! scratch [`super::MemoryBackend`] while `/` is a [`super::LocalBackend`]
//! over the checkout. Dispatch picks the mount with the longest matching
//! prefix, hands the backend the path with the prefix stripped, and
//! re-prefixes every path in the result so callers only ever see composite
//! paths.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use toolfs_types::{EditResult, FileData, FileInfo, FsError, GrepMatch, WriteResult};

use super::FileBackend;
use crate::resolve::normalize_virtual;
use crate::search::SearchOptions;

/// One row of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    pub prefix: String,
}

pub struct CompositeBackend {
    /// Mount prefix (normalized, no trailing slash, `/` allowed) to backend.
    mounts: BTreeMap<String, Arc<dyn FileBackend>>,
}

pub struct CompositeBuilder {
    mounts: BTreeMap<String, Arc<dyn FileBackend>>,
}

impl CompositeBuilder {
    pub fn mount(
        self,
        prefix: impl AsRef<str>,
        backend: impl FileBackend + 'static,
    ) -> Result<Self, FsError> {
        self.mount_arc(prefix, Arc::new(backend))
    }

    pub fn mount_arc(
        mut self,
        prefix: impl AsRef<str>,
        backend: Arc<dyn FileBackend>,
    ) -> Result<Self, FsError> {
        let prefix = normalize_virtual(prefix.as_ref())?;
        self.mounts.insert(prefix, backend);
        Ok(self)
    }

    pub fn build(self) -> CompositeBackend {
        CompositeBackend {
            mounts: self.mounts,
        }
    }
}

impl CompositeBackend {
    pub fn builder() -> CompositeBuilder {
        CompositeBuilder {
            mounts: BTreeMap::new(),
        }
    }

    /// The mount table, longest prefix first.
    pub fn mounts(&self) -> Vec<MountInfo> {
        let mut rows: Vec<MountInfo> = self
            .mounts
            .keys()
            .map(|prefix| MountInfo {
                prefix: prefix.clone(),
            })
            .collect();
        rows.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        rows
    }

    /// Pick the mount whose prefix is the longest match for `path`.
    ///
    /// Matching is segment-aware: `/memory` does not match a `/mem` mount.
    /// Returns the backend, the path rewritten relative to the mount, and
    /// the mount prefix for re-prefixing results.
    fn dispatch(&self, path: &str) -> Result<(&Arc<dyn FileBackend>, String, &str), FsError> {
        let normalized = normalize_virtual(path)?;

        let mut best: Option<(&String, &Arc<dyn FileBackend>)> = None;
        for (prefix, backend) in &self.mounts {
            let matches = prefix == "/"
                || normalized == *prefix
                || normalized.starts_with(&format!("{prefix}/"));
            if matches && best.is_none_or(|(current, _)| prefix.len() > current.len()) {
                best = Some((prefix, backend));
            }
        }

        let Some((prefix, backend)) = best else {
            return Err(FsError::NoMount { path: normalized });
        };

        let inner = if prefix == "/" {
            normalized
        } else {
            let rest = &normalized[prefix.len()..];
            if rest.is_empty() {
                "/".to_string()
            } else {
                rest.to_string()
            }
        };
        Ok((backend, inner, prefix))
    }
}

/// Re-prefix a path a mounted backend returned with its mount prefix.
fn rejoin(prefix: &str, inner: &str) -> String {
    if prefix == "/" {
        inner.to_string()
    } else if inner == "/" {
        prefix.to_string()
    } else {
        format!("{prefix}{inner}")
    }
}

#[async_trait]
impl FileBackend for CompositeBackend {
    async fn ls_info(&self, dir: &str) -> Result<Vec<FileInfo>, FsError> {
        let normalized = normalize_virtual(dir)?;
        let dir_prefix = ensure_dir(&normalized);
        // Mount points under `dir` appear as synthesized directory entries,
        // even when no backend serves `dir` itself.
        let mut synthesized: Vec<FileInfo> = Vec::new();
        for prefix in self.mounts.keys() {
            let Some(rest) = prefix.strip_prefix(dir_prefix.as_str()) else {
                continue;
            };
            let first_segment = match rest.split_once('/') {
                Some((head, _)) => head,
                None => rest,
            };
            if first_segment.is_empty() {
                continue;
            }
            let path = format!("{dir_prefix}{first_segment}/");
            if !synthesized.iter().any(|e| e.path == path) {
                synthesized.push(FileInfo::directory(path, None));
            }
        }

        let mut entries = match self.dispatch(&normalized) {
            Ok((backend, inner, prefix)) => match backend.ls_info(&inner).await {
                Ok(mut listed) => {
                    for info in &mut listed {
                        info.path = rejoin(prefix, &info.path);
                    }
                    listed
                }
                // A mount point can sit under a directory its parent
                // backend does not have.
                Err(e) if e.is_not_found() && !synthesized.is_empty() => Vec::new(),
                Err(e) => return Err(e),
            },
            Err(FsError::NoMount { .. }) if !synthesized.is_empty() => Vec::new(),
            Err(e) => return Err(e),
        };

        for info in synthesized {
            if !entries.iter().any(|e| e.path == info.path) {
                entries.push(info);
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn read(&self, path: &str, offset: usize, limit: usize) -> Result<String, FsError> {
        let (backend, inner, _) = self.dispatch(path)?;
        backend.read(&inner, offset, limit).await
    }

    async fn read_raw(&self, path: &str) -> Result<FileData, FsError> {
        let (backend, inner, _) = self.dispatch(path)?;
        backend.read_raw(&inner).await
    }

    async fn write(&self, path: &str, content: &str) -> Result<WriteResult, FsError> {
        let (backend, inner, prefix) = self.dispatch(path)?;
        let mut result = backend.write(&inner, content).await?;
        result.path = rejoin(prefix, &result.path);
        Ok(result)
    }

    async fn edit(
        &self,
        path: &str,
        old_string: &str,
        new_string: &str,
        replace_all: bool,
    ) -> Result<EditResult, FsError> {
        let (backend, inner, prefix) = self.dispatch(path)?;
        let mut result = backend.edit(&inner, old_string, new_string, replace_all).await?;
        result.path = rejoin(prefix, &result.path);
        Ok(result)
    }

    async fn grep_raw(
        &self,
        pattern: &str,
        base: &str,
        glob: Option<&str>,
        options: &SearchOptions,
    ) -> Result<Vec<GrepMatch>, FsError> {
        let (backend, inner, prefix) = self.dispatch(base)?;
        let mut matches = backend.grep_raw(pattern, &inner, glob, options).await?;
        for m in &mut matches {
            m.path = rejoin(prefix, &m.path);
        }
        Ok(matches)
    }

    async fn glob_info(&self, pattern: &str, base: &str) -> Result<Vec<FileInfo>, FsError> {
        let (backend, inner, prefix) = self.dispatch(base)?;
        let mut infos = backend.glob_info(pattern, &inner).await?;
        for info in &mut infos {
            info.path = rejoin(prefix, &info.path);
        }
        Ok(infos)
    }
}

/// A normalized directory path with a guaranteed trailing slash.
fn ensure_dir(normalized: &str) -> String {
    if normalized == "/" {
        "/".to_string()
    } else {
        format!("{normalized}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    async fn composite() -> CompositeBackend {
        let root = MemoryBackend::new();
        root.write("/readme.md", "root file").await.unwrap();
        let mem = MemoryBackend::new();
        mem.write("/scratch.txt", "scratch note").await.unwrap();

        CompositeBackend::builder()
            .mount("/", root)
            .unwrap()
            .mount("/mem", mem)
            .unwrap()
            .build()
    }

    #[tokio::test]
    async fn longest_prefix_wins() {
        let c = composite().await;
        let data = c.read_raw("/mem/scratch.txt").await.unwrap();
        assert_eq!(data.lines, vec!["scratch note"]);
        let data = c.read_raw("/readme.md").await.unwrap();
        assert_eq!(data.lines, vec!["root file"]);
    }

    #[tokio::test]
    async fn prefix_match_is_segment_aware() {
        let c = composite().await;
        // "/memory" must fall through to the root mount, not "/mem".
        let err = c.read_raw("/memory/x.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn results_are_reprefixed() {
        let c = composite().await;
        let result = c.write("/mem/new.txt", "hello\nworld").await.unwrap();
        assert_eq!(result.path, "/mem/new.txt");

        let matches = c
            .grep_raw("hello", "/mem", None, &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(matches[0].path, "/mem/new.txt");
    }

    #[tokio::test]
    async fn root_listing_includes_mount_points() {
        let c = composite().await;
        let entries = c.ls_info("/").await.unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/mem/", "/readme.md"]);
    }

    #[tokio::test]
    async fn unmounted_path_without_root_mount_errors() {
        let mem = MemoryBackend::new();
        let c = CompositeBackend::builder()
            .mount("/mem", mem)
            .unwrap()
            .build();
        let err = c.read_raw("/elsewhere/file.txt").await.unwrap_err();
        assert!(matches!(err, FsError::NoMount { .. }));
    }

    #[tokio::test]
    async fn edits_route_through_mounts() {
        let c = composite().await;
        let result = c
            .edit("/mem/scratch.txt", "scratch", "SCRATCH", false)
            .await
            .unwrap();
        assert_eq!(result.path, "/mem/scratch.txt");
        assert_eq!(result.occurrences, 1);
    }

    #[tokio::test]
    async fn mount_table_lists_longest_first() {
        let c = composite().await;
        let mounts = c.mounts();
        let prefixes: Vec<&str> = mounts.iter().map(|m| m.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["/mem", "/"]);
    }
}
