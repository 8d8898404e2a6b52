//! Content operations: paginated read formatting and occurrence-counted
//! string replacement.

use toolfs_types::FsError;

/// Returned by read when a file exists but holds nothing (or only
/// whitespace). Distinct from not-found so agents can tell the two apart.
pub const EMPTY_FILE_SENTINEL: &str = "File exists but has empty contents";

/// Render a page of `content` with line numbers.
///
/// Lines `[offset, offset + limit)` are rendered as a right-justified
/// 6-wide 1-based line number, a tab, then the line. Lines longer than
/// `max_line_length` characters are split into chunks; continuation chunks
/// are numbered `N.1`, `N.2`, and so on.
pub fn format_read(
    content: &str,
    offset: usize,
    limit: usize,
    max_line_length: usize,
) -> Result<String, FsError> {
    if content.trim().is_empty() {
        return Ok(EMPTY_FILE_SENTINEL.to_string());
    }

    let lines: Vec<&str> = content.lines().collect();
    if offset >= lines.len() {
        return Err(FsError::OffsetExceedsLength {
            offset,
            lines: lines.len(),
        });
    }

    let end = lines.len().min(offset.saturating_add(limit));
    let mut out = Vec::new();
    for (i, line) in lines[offset..end].iter().enumerate() {
        let number = offset + i + 1;
        let chars: Vec<char> = line.chars().collect();
        if chars.len() <= max_line_length {
            out.push(format!("{number:>6}\t{line}"));
        } else {
            for (chunk_index, chunk) in chars.chunks(max_line_length).enumerate() {
                let label = if chunk_index == 0 {
                    number.to_string()
                } else {
                    format!("{number}.{chunk_index}")
                };
                let text: String = chunk.iter().collect();
                out.push(format!("{label:>6}\t{text}"));
            }
        }
    }

    Ok(out.join("\n"))
}

/// Result of an occurrence-counted replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub content: String,
    pub occurrences: usize,
}

/// Replace `old` with `new` in `content`, counting occurrences literally
/// (substring matching, not regex).
///
/// - empty content with empty `old` bootstraps the file: returns `new` with
///   zero occurrences
/// - empty `old` on non-empty content is an error
/// - zero occurrences is an error naming the missing string
/// - multiple occurrences without `replace_all` is an error reporting the
///   count
pub fn replace_occurrences(
    content: &str,
    old: &str,
    new: &str,
    replace_all: bool,
) -> Result<Replacement, FsError> {
    if content.is_empty() && old.is_empty() {
        return Ok(Replacement {
            content: new.to_string(),
            occurrences: 0,
        });
    }
    if old.is_empty() {
        return Err(FsError::EmptyOldString);
    }

    let count = content.matches(old).count();
    match count {
        0 => Err(FsError::StringNotFound {
            needle: old.to_string(),
        }),
        1 => Ok(Replacement {
            content: content.replacen(old, new, 1),
            occurrences: 1,
        }),
        n if replace_all => Ok(Replacement {
            content: content.replace(old, new),
            occurrences: n,
        }),
        n => Err(FsError::AmbiguousReplacement {
            needle: old.to_string(),
            count: n,
        }),
    }
}
