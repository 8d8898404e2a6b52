//! Virtual path normalization.
//!
//! Agent-facing paths are absolute-style strings (`/src/main.rs`) that a
//! backend maps onto its own root. Normalization happens before any
//! filesystem call and is deliberately strict: traversal attempts fail with
//! a typed error instead of being clamped, so the calling agent sees exactly
//! what was wrong.

use toolfs_types::FsError;

/// Normalize a virtual path.
///
/// - backslashes become forward slashes
/// - a leading `/` is ensured
/// - `.` segments and empty segments collapse
/// - any `..` segment or a leading `~` is rejected with
///   [`FsError::PathTraversal`], never silently clamped
///
/// Returns the canonical virtual form: `/seg/seg2`, or `/` for the root.
pub fn normalize_virtual(path: &str) -> Result<String, FsError> {
    let forward = path.replace('\\', "/");

    if forward.starts_with('~') {
        return Err(FsError::PathTraversal {
            path: path.to_string(),
        });
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in forward.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(FsError::PathTraversal {
                    path: path.to_string(),
                });
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(format!("/{}", segments.join("/")))
    }
}

/// The root-relative portion of a normalized virtual path (no leading `/`).
pub fn virtual_to_relative(normalized: &str) -> &str {
    normalized.trim_start_matches('/')
}

/// Join a normalized virtual directory and an entry name.
pub fn join_virtual(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalizes_to_leading_slash() {
        assert_eq!(normalize_virtual("src/main.rs").unwrap(), "/src/main.rs");
        assert_eq!(normalize_virtual("/src/main.rs").unwrap(), "/src/main.rs");
    }

    #[test]
    fn collapses_dot_and_empty_segments() {
        assert_eq!(normalize_virtual("/a/./b//c").unwrap(), "/a/b/c");
        assert_eq!(normalize_virtual("//").unwrap(), "/");
        assert_eq!(normalize_virtual("").unwrap(), "/");
    }

    #[test]
    fn backslashes_become_forward_slashes() {
        assert_eq!(normalize_virtual("src\\main.rs").unwrap(), "/src/main.rs");
    }

    #[test]
    fn rejects_parent_segments() {
        for path in ["..", "/..", "a/../b", "/a/b/..", "../etc/passwd"] {
            let err = normalize_virtual(path).unwrap_err();
            assert!(
                matches!(err, FsError::PathTraversal { .. }),
                "expected traversal rejection for {path:?}"
            );
        }
    }

    #[test]
    fn rejects_leading_tilde() {
        let err = normalize_virtual("~/secrets").unwrap_err();
        assert!(matches!(err, FsError::PathTraversal { .. }));
    }

    #[test]
    fn dotdot_in_name_is_allowed() {
        // Only the exact `..` segment is traversal; `..foo` is a file name.
        assert_eq!(normalize_virtual("/a/..b/c").unwrap(), "/a/..b/c");
        assert_eq!(normalize_virtual("/a...txt").unwrap(), "/a...txt");
    }

    #[test]
    fn join_virtual_handles_root() {
        assert_eq!(join_virtual("/", "a.txt"), "/a.txt");
        assert_eq!(join_virtual("/src", "a.txt"), "/src/a.txt");
    }

    proptest! {
        /// Any path with a `..` segment (under either separator) is rejected.
        #[test]
        fn traversal_always_rejected(
            prefix in "[a-z]{0,8}(/[a-z]{1,8}){0,3}",
            suffix in "([a-z]{1,8}/){0,3}[a-z]{0,8}",
            sep in prop::sample::select(vec!["/", "\\"]),
        ) {
            let path = format!("{prefix}{sep}..{sep}{suffix}");
            let rejected = matches!(
                normalize_virtual(&path),
                Err(FsError::PathTraversal { .. })
            );
            prop_assert!(rejected, "expected PathTraversal for {path:?}");
        }

        /// Valid relative paths always normalize under `/` and contain no
        /// `..` segments afterwards.
        #[test]
        fn valid_paths_stay_rooted(
            segments in prop::collection::vec("[a-zA-Z0-9_.-]{1,12}", 1..6)
        ) {
            prop_assume!(segments.iter().all(|s| s != ".." && s != "." && !s.starts_with('~')));
            let path = segments.join("/");
            let normalized = normalize_virtual(&path)?;
            prop_assert!(normalized.starts_with('/'));
            prop_assert!(normalized.split('/').all(|s| s != ".."));
        }
    }
}
