//! Backend over a real directory tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use toolfs_glob::GlobPattern;
use toolfs_types::{EditResult, FileData, FileInfo, FsError, GrepMatch, WriteResult};

use super::{FileBackend, map_io};
use crate::config::ToolfsConfig;
use crate::content;
use crate::gate::WriteGate;
use crate::resolve::{join_virtual, normalize_virtual, virtual_to_relative};
use crate::review::{ChangeQueue, ChangeSink};
use crate::search::{self, SearchOptions, rg_search};

/// Backend rooted at a directory on the real filesystem.
///
/// Every virtual path is normalized, joined under the root, and
/// containment-checked against the canonicalized root, so neither `..`
/// segments nor symlinks can reach outside it. Mutations serialize through
/// a write gate and flow through the change queue.
pub struct LocalBackend {
    root: PathBuf,
    config: ToolfsConfig,
    queue: Arc<ChangeQueue>,
    gate: WriteGate,
}

impl LocalBackend {
    /// Backend with default configuration and its own auto-applying queue.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, ToolfsConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, config: ToolfsConfig) -> Self {
        let queue = Arc::new(ChangeQueue::new(config.auto_apply, config.history_capacity));
        Self::with_queue(root, config, queue)
    }

    /// Backend sharing an externally owned queue, so one review surface can
    /// observe changes from several backends.
    pub fn with_queue(
        root: impl Into<PathBuf>,
        config: ToolfsConfig,
        queue: Arc<ChangeQueue>,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            queue,
            gate: WriteGate::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn queue(&self) -> &Arc<ChangeQueue> {
        &self.queue
    }

    /// Resolve a virtual path to `(normalized virtual, real path)`.
    ///
    /// Existing paths are canonicalized; for not-yet-existing ones the
    /// nearest existing ancestor is canonicalized and the remainder
    /// appended. Either way the result must stay under the canonical root
    /// or the call fails with [`FsError::OutsideRoot`]. This is the second
    /// line of defense after normalization already rejected `..` segments;
    /// it catches symlinked directories pointing out of the tree.
    fn resolve(&self, virtual_path: &str) -> Result<(String, PathBuf), FsError> {
        let normalized = normalize_virtual(virtual_path)?;
        let rel = virtual_to_relative(&normalized);
        let joined = if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        };

        let canonical_root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());

        // Walk up to the nearest existing ancestor so that even deeply
        // nested not-yet-existing paths get their real prefix canonicalized.
        // A symlinked intermediate directory must resolve to its target
        // before the containment check, not after a later create_dir_all.
        let mut existing = joined.clone();
        let mut remainder: Vec<std::ffi::OsString> = Vec::new();
        while !existing.exists() {
            match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    remainder.push(name.to_os_string());
                    existing = parent.to_path_buf();
                }
                _ => {
                    return Err(FsError::OutsideRoot { path: normalized });
                }
            }
        }
        let mut resolved = existing.canonicalize()?;
        for segment in remainder.iter().rev() {
            resolved.push(segment);
        }

        if !resolved.starts_with(&canonical_root) {
            return Err(FsError::OutsideRoot { path: normalized });
        }
        Ok((normalized, resolved))
    }

    /// Reject a final path component that is itself a symlink, before any
    /// canonicalization has followed it. Writes through a link could land
    /// outside the tree the caller believes it is mutating.
    async fn reject_symlink(&self, normalized: &str) -> Result<(), FsError> {
        let rel = virtual_to_relative(normalized);
        if rel.is_empty() {
            return Ok(());
        }
        let unfollowed = self.root.join(rel);
        if let Ok(meta) = tokio::fs::symlink_metadata(&unfollowed).await {
            if meta.file_type().is_symlink() {
                return Err(FsError::SymlinkNotAllowed {
                    path: normalized.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn read_to_string(&self, real: &Path, normalized: &str) -> Result<String, FsError> {
        let meta = tokio::fs::metadata(real)
            .await
            .map_err(|e| map_io(e, normalized))?;
        if meta.is_dir() {
            return Err(FsError::IsADirectory {
                path: normalized.to_string(),
            });
        }
        let bytes = tokio::fs::read(real).await.map_err(|e| map_io(e, normalized))?;
        String::from_utf8(bytes).map_err(|_| FsError::NotUtf8 {
            path: normalized.to_string(),
        })
    }
}

/// Persists applied changes straight to disk, creating parent directories
/// as needed.
struct LocalSink;

#[async_trait]
impl ChangeSink for LocalSink {
    async fn persist(&self, path: &Path, content: &str) -> Result<(), FsError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl FileBackend for LocalBackend {
    async fn ls_info(&self, dir: &str) -> Result<Vec<FileInfo>, FsError> {
        let (normalized, real) = self.resolve(dir)?;
        let meta = tokio::fs::metadata(&real)
            .await
            .map_err(|e| map_io(e, &normalized))?;
        if !meta.is_dir() {
            return Err(FsError::NotADirectory { path: normalized });
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&real).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Ok(meta) = tokio::fs::symlink_metadata(entry.path()).await else {
                continue;
            };
            let file_type = meta.file_type();
            // Symlinks are not part of the virtual tree.
            if file_type.is_symlink() {
                continue;
            }
            let virtual_path = join_virtual(&normalized, &name);
            let modified = meta.modified().ok().map(DateTime::<Utc>::from);
            if file_type.is_dir() {
                entries.push(FileInfo::directory(virtual_path, modified));
            } else {
                entries.push(FileInfo::file(virtual_path, meta.len(), modified));
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn read(&self, path: &str, offset: usize, limit: usize) -> Result<String, FsError> {
        let (normalized, real) = self.resolve(path)?;
        let text = self.read_to_string(&real, &normalized).await?;
        content::format_read(&text, offset, limit, self.config.max_line_length)
    }

    async fn read_raw(&self, path: &str) -> Result<FileData, FsError> {
        let (normalized, real) = self.resolve(path)?;
        let text = self.read_to_string(&real, &normalized).await?;
        let meta = tokio::fs::metadata(&real)
            .await
            .map_err(|e| map_io(e, &normalized))?;
        let modified = meta
            .modified()
            .ok()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);
        let created = meta
            .created()
            .ok()
            .map(DateTime::<Utc>::from)
            .unwrap_or(modified);
        Ok(FileData::from_content(&text, created, modified))
    }

    async fn write(&self, path: &str, content: &str) -> Result<WriteResult, FsError> {
        let _guard = self.gate.acquire().await;
        let (normalized, real) = self.resolve(path)?;
        self.reject_symlink(&normalized).await?;

        match tokio::fs::symlink_metadata(&real).await {
            Ok(meta) if meta.is_dir() => {
                return Err(FsError::IsADirectory { path: normalized });
            }
            Ok(_) => {
                return Err(FsError::AlreadyExists { path: normalized });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let change = self
            .queue
            .add_pending(real, "", content, Arc::new(LocalSink))
            .await?;
        tracing::debug!(path = %normalized, change_id = %change.id, "file write queued");
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
        let (normalized, real) = self.resolve(path)?;
        self.reject_symlink(&normalized).await?;

        // Editing a missing file with an empty old_string bootstraps it,
        // mirroring the empty-file case.
        let original = match self.read_to_string(&real, &normalized).await {
            Ok(text) => text,
            Err(e) if e.is_not_found() && old_string.is_empty() => String::new(),
            Err(e) => return Err(e),
        };

        let replaced = content::replace_occurrences(&original, old_string, new_string, replace_all)?;
        let change = self
            .queue
            .add_pending(real, original, replaced.content, Arc::new(LocalSink))
            .await?;
        tracing::debug!(
            path = %normalized,
            occurrences = replaced.occurrences,
            change_id = %change.id,
            "file edit queued"
        );
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
        // Compile both filters up front so bad input fails fast even when
        // the external tool would have reported it differently.
        let matcher = search::compile_matcher(pattern, options.ignore_case)?;
        let glob_pattern = glob
            .map(GlobPattern::new)
            .transpose()
            .map_err(|e| FsError::InvalidPattern(e.to_string()))?;

        let (normalized, real) = self.resolve(base)?;
        let meta = tokio::fs::metadata(&real)
            .await
            .map_err(|e| map_io(e, &normalized))?;
        if !meta.is_dir() {
            return Err(FsError::NotADirectory { path: normalized });
        }
        let base_rel = virtual_to_relative(&normalized).to_string();

        if options.use_external {
            match rg_search(
                &self.root,
                &base_rel,
                pattern,
                glob,
                options.ignore_case,
                options.budget,
                options.max_output_bytes,
            )
            .await
            {
                Ok(matches) => return Ok(matches),
                Err(crate::search::ExternalError::BudgetExceeded(msg)) => {
                    return Err(FsError::SearchBudgetExceeded(msg));
                }
                Err(e) if !options.allow_fallback => {
                    tracing::warn!(error = ?e, "external search failed, fallback disabled");
                    return Err(FsError::SearchUnavailable);
                }
                Err(e) => {
                    tracing::debug!(error = ?e, "external search failed, using scanner");
                }
            }
        }

        search::grep_local(
            &self.root,
            &base_rel,
            &matcher,
            glob_pattern.as_ref(),
            &options.cancel,
        )
        .await
    }

    async fn glob_info(&self, pattern: &str, base: &str) -> Result<Vec<FileInfo>, FsError> {
        let glob_pattern =
            GlobPattern::new(pattern).map_err(|e| FsError::InvalidPattern(e.to_string()))?;
        let (normalized, real) = self.resolve(base)?;
        let meta = tokio::fs::metadata(&real)
            .await
            .map_err(|e| map_io(e, &normalized))?;
        if !meta.is_dir() {
            return Err(FsError::NotADirectory { path: normalized });
        }

        let base_rel = virtual_to_relative(&normalized);
        let files = search::walk_local(&self.root, base_rel, &CancellationToken::new()).await?;

        let mut out = Vec::new();
        for file in files {
            // The glob is anchored against the path relative to the search
            // base, not the backend root.
            let rel_to_base = match base_rel {
                "" => file.rel.as_str(),
                prefix => match file
                    .rel
                    .strip_prefix(prefix)
                    .and_then(|r| r.strip_prefix('/'))
                {
                    Some(rest) => rest,
                    None => continue,
                },
            };
            if glob_pattern.is_match(rel_to_base) {
                out.push(FileInfo::file(
                    format!("/{}", file.rel),
                    file.size,
                    file.modified,
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

    fn backend(dir: &tempfile::TempDir) -> LocalBackend {
        // Tests must not depend on an rg binary being installed.
        let config = ToolfsConfig {
            use_external_search: false,
            ..ToolfsConfig::default()
        };
        LocalBackend::with_config(dir.path(), config)
    }

    #[tokio::test]
    async fn resolve_rejects_escape_via_parent() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        let err = b.read("../outside.txt", 0, 10).await.unwrap_err();
        assert!(matches!(err, FsError::PathTraversal { .. }));
    }

    #[tokio::test]
    async fn resolve_rejects_symlink_out_of_root() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "s").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let b = backend(&dir);
        let err = b.read("/link/secret.txt", 0, 10).await.unwrap_err();
        assert!(matches!(err, FsError::OutsideRoot { .. }));
    }

    #[tokio::test]
    async fn write_under_symlinked_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let b = backend(&dir);
        // The parent chain does not exist yet, so resolution must still
        // follow the symlinked ancestor before checking containment.
        let err = b.write("/link/sub/f.txt", "escaped").await.unwrap_err();
        assert!(matches!(err, FsError::OutsideRoot { .. }));
        assert!(!outside.path().join("sub").exists());

        let err = b.write("/link/f.txt", "escaped").await.unwrap_err();
        assert!(matches!(err, FsError::OutsideRoot { .. }));
        assert!(!outside.path().join("f.txt").exists());
    }

    #[tokio::test]
    async fn write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        b.write("/notes/a.txt", "line1\nline2").await.unwrap();

        let page = b.read("/notes/a.txt", 0, 10).await.unwrap();
        assert_eq!(page, "     1\tline1\n     2\tline2");
    }

    #[tokio::test]
    async fn write_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        b.write("/a.txt", "one").await.unwrap();
        let err = b.write("/a.txt", "two").await.unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn write_refuses_dangling_symlink_target() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("/nonexistent/target", dir.path().join("link.txt")).unwrap();
        let b = backend(&dir);
        let err = b.write("/link.txt", "x").await.unwrap_err();
        assert!(matches!(err, FsError::SymlinkNotAllowed { .. }));
    }

    #[tokio::test]
    async fn edit_replaces_single_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        b.write("/a.txt", "alpha\nbeta\n").await.unwrap();

        let result = b.edit("/a.txt", "beta", "BETA", false).await.unwrap();
        assert_eq!(result.occurrences, 1);
        let data = b.read_raw("/a.txt").await.unwrap();
        assert_eq!(data.lines, vec!["alpha", "BETA"]);
    }

    #[tokio::test]
    async fn edit_bootstraps_missing_file_with_empty_old() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        let result = b.edit("/fresh.txt", "", "hello", false).await.unwrap();
        assert_eq!(result.occurrences, 0);
        assert!(dir.path().join("fresh.txt").exists());
    }

    #[tokio::test]
    async fn edit_ambiguous_without_replace_all() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        b.write("/a.txt", "x x x").await.unwrap();
        let err = b.edit("/a.txt", "x", "y", false).await.unwrap_err();
        assert!(matches!(err, FsError::AmbiguousReplacement { count: 3, .. }));

        let result = b.edit("/a.txt", "x", "y", true).await.unwrap();
        assert_eq!(result.occurrences, 3);
    }

    #[tokio::test]
    async fn ls_marks_directories_with_trailing_slash() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("f.txt"), "x").unwrap();

        let b = backend(&dir);
        let entries = b.ls_info("/").await.unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/f.txt", "/sub/"]);
    }

    #[tokio::test]
    async fn grep_fallback_filters_by_glob() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        b.write("/src/x.ts", "const a = 1;\n// TODO: fix\n").await.unwrap();
        b.write("/src/y.rs", "// TODO rust\n").await.unwrap();

        let matches = b
            .grep_raw("todo", "/", Some("*.ts"), &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].path, "/src/x.ts");
        assert_eq!(matches[0].line, 2);
    }

    #[tokio::test]
    async fn glob_is_anchored_to_base() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        b.write("/src/deep/a.ts", "x").await.unwrap();
        b.write("/src/b.ts", "x").await.unwrap();

        let top = b.glob_info("*.ts", "/src").await.unwrap();
        let paths: Vec<&str> = top.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/src/b.ts"]);

        let all = b.glob_info("**/*.ts", "/src").await.unwrap();
        let paths: Vec<&str> = all.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/src/b.ts", "/src/deep/a.ts"]);
    }
}
