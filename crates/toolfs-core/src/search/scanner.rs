//! In-process fallback scanner.
//!
//! Walks the tree without following symlinks, filters by glob, and scans
//! candidate files with bounded parallelism. Files are streamed line by
//! line by `grep-searcher`, so memory use is bounded by line length rather
//! than file size.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use grep_regex::RegexMatcher;
use grep_searcher::{BinaryDetection, SearcherBuilder};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use toolfs_glob::GlobPattern;
use toolfs_types::{FsError, GrepMatch};

use super::MatchCollector;

/// Directory names never descended into. The scanner has no gitignore
/// support; these cover the trees that dominate scan time in practice.
const PRUNED_DIRS: &[&str] = &[".git", "node_modules", "target"];

/// Concurrent per-file scans in flight.
const SCAN_CONCURRENCY: usize = 8;

/// A regular file found by the walker. `rel` is forward-slash, relative to
/// the walk root, no leading `/`.
#[derive(Debug, Clone)]
pub(crate) struct WalkedFile {
    pub rel: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Recursively collect regular files under `root`/`base_rel`.
///
/// Deterministic depth-first alphabetical order. Symlinks are neither
/// followed nor reported; unreadable subdirectories are skipped. An
/// unreadable base directory is an error.
pub(crate) async fn walk_local(
    root: &Path,
    base_rel: &str,
    cancel: &CancellationToken,
) -> Result<Vec<WalkedFile>, FsError> {
    let mut files = Vec::new();
    let mut stack = vec![base_rel.to_string()];

    while let Some(rel_dir) = stack.pop() {
        if cancel.is_cancelled() {
            return Err(FsError::Cancelled);
        }

        let abs = if rel_dir.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&rel_dir)
        };

        let mut dir = match tokio::fs::read_dir(&abs).await {
            Ok(dir) => dir,
            Err(e) if rel_dir == base_rel => return Err(e.into()),
            Err(e) => {
                tracing::debug!(dir = %abs.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = match tokio::fs::symlink_metadata(entry.path()).await {
                Ok(meta) => meta,
                Err(_) => continue,
            };
            entries.push((name, meta));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut subdirs = Vec::new();
        for (name, meta) in entries {
            let rel = if rel_dir.is_empty() {
                name.clone()
            } else {
                format!("{rel_dir}/{name}")
            };
            let file_type = meta.file_type();
            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                if !PRUNED_DIRS.contains(&name.as_str()) {
                    subdirs.push(rel);
                }
            } else if file_type.is_file() {
                files.push(WalkedFile {
                    rel,
                    size: meta.len(),
                    modified: meta.modified().ok().map(DateTime::<Utc>::from),
                });
            }
        }
        // Reverse so the LIFO stack pops alphabetically-first dirs first.
        for dir in subdirs.into_iter().rev() {
            stack.push(dir);
        }
    }

    Ok(files)
}

/// Fallback grep over the real filesystem: walk, glob-filter, then fan out
/// per-file scans over a semaphore-bounded `JoinSet` and fan the results
/// back in. Results are sorted by (path, line) for deterministic output.
pub(crate) async fn grep_local(
    root: &Path,
    base_rel: &str,
    matcher: &RegexMatcher,
    glob: Option<&GlobPattern>,
    cancel: &CancellationToken,
) -> Result<Vec<GrepMatch>, FsError> {
    let files = walk_local(root, base_rel, cancel).await?;
    let semaphore = Arc::new(Semaphore::new(SCAN_CONCURRENCY));
    let mut tasks = JoinSet::new();

    for file in files {
        if let Some(glob) = glob {
            if !glob.matches_path(&file.rel) {
                continue;
            }
        }
        if cancel.is_cancelled() {
            return Err(FsError::Cancelled);
        }

        let abs = root.join(&file.rel);
        let virtual_path = format!("/{}", file.rel);
        let matcher = matcher.clone();
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return Vec::new();
            };
            tokio::task::spawn_blocking(move || scan_file(&abs, virtual_path, &matcher))
                .await
                .unwrap_or_default()
        });
    }

    let mut all = Vec::new();
    while let Some(result) = tasks.join_next().await {
        if let Ok(matches) = result {
            all.extend(matches);
        }
    }
    if cancel.is_cancelled() {
        return Err(FsError::Cancelled);
    }

    all.sort_by(|a, b| a.path.cmp(&b.path).then(a.line.cmp(&b.line)));
    Ok(all)
}

/// Scan one file. Unreadable and binary files yield no matches.
fn scan_file(abs: &Path, virtual_path: String, matcher: &RegexMatcher) -> Vec<GrepMatch> {
    let mut collector = MatchCollector::new(virtual_path);
    let mut searcher = SearcherBuilder::new()
        .line_number(true)
        .binary_detection(BinaryDetection::quit(0))
        .build();
    if let Err(e) = searcher.search_path(matcher, abs, &mut collector) {
        tracing::debug!(file = %abs.display(), error = %e, "skipping unsearchable file");
        return Vec::new();
    }
    collector.matches
}

/// Scan an in-memory buffer (used by the memory backend, which has no real
/// files to hand to the walker).
pub(crate) fn grep_slice(
    matcher: &RegexMatcher,
    virtual_path: &str,
    content: &[u8],
) -> Vec<GrepMatch> {
    let mut collector = MatchCollector::new(virtual_path.to_string());
    let mut searcher = SearcherBuilder::new().line_number(true).build();
    if searcher
        .search_slice(matcher, content, &mut collector)
        .is_err()
    {
        return Vec::new();
    }
    collector.matches
}
