//! Glob-to-regex compilation.

use regex::Regex;
use thiserror::Error;

/// A glob pattern that failed to compile.
#[derive(Debug, Error)]
pub enum GlobError {
    #[error("invalid glob pattern {pattern:?}: {message}")]
    Invalid { pattern: String, message: String },
}

/// Check if a string contains glob metacharacters (`*`, `?`, `[`, `{`).
///
/// Useful for callers that want to detect when a path argument is a pattern
/// and switch to matching mode.
pub fn contains_glob(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[') || s.contains('{')
}

/// A compiled glob pattern.
///
/// The pattern is anchored: it must match the entire candidate string.
/// Candidates are forward-slash relative paths with no leading `/`.
///
/// # Examples
/// ```
/// use toolfs_glob::GlobPattern;
///
/// let glob = GlobPattern::new("src/**/*.rs").unwrap();
/// assert!(glob.is_match("src/backend/local.rs"));
/// assert!(!glob.is_match("tests/local.rs"));
///
/// let names = GlobPattern::new("*.{ts,tsx}").unwrap();
/// assert!(names.matches_basename_only());
/// assert!(names.is_match("app.tsx"));
/// ```
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
    basename_only: bool,
}

impl GlobPattern {
    /// Compile a glob pattern.
    pub fn new(pattern: &str) -> Result<Self, GlobError> {
        let translated = translate(pattern).map_err(|message| GlobError::Invalid {
            pattern: pattern.to_string(),
            message,
        })?;
        let anchored = format!("^(?:{translated})$");
        let regex = Regex::new(&anchored).map_err(|e| GlobError::Invalid {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
            basename_only: !pattern.contains('/'),
        })
    }

    /// The original pattern text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True if the pattern has no `/` and should be matched against file
    /// names rather than full relative paths.
    pub fn matches_basename_only(&self) -> bool {
        self.basename_only
    }

    /// Match against the full candidate string.
    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// Match a relative path, honoring basename-only semantics: a pattern
    /// without `/` is tested against the final path segment.
    pub fn matches_path(&self, relative_path: &str) -> bool {
        if self.basename_only {
            let name = relative_path.rsplit('/').next().unwrap_or(relative_path);
            self.regex.is_match(name)
        } else {
            self.regex.is_match(relative_path)
        }
    }
}

/// Translate a glob into (unanchored) regex syntax.
fn translate(pattern: &str) -> Result<String, String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    // `**` crosses separators. Collapse any run of stars.
                    while chars.get(i) == Some(&'*') {
                        i += 1;
                    }
                    // `**/` also matches zero directories.
                    if chars.get(i) == Some(&'/') {
                        i += 1;
                        out.push_str("(?:[^/]*/)*");
                    } else {
                        out.push_str(".*");
                    }
                } else {
                    out.push_str("[^/]*");
                    i += 1;
                }
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            '[' => {
                let (class, consumed) = translate_class(&chars[i..])?;
                out.push_str(&class);
                i += consumed;
            }
            '{' => {
                let (group, consumed) = translate_braces(&chars[i..])?;
                out.push_str(&group);
                i += consumed;
            }
            '\\' if i + 1 < chars.len() => {
                push_literal(&mut out, chars[i + 1]);
                i += 2;
            }
            c => {
                push_literal(&mut out, c);
                i += 1;
            }
        }
    }

    Ok(out)
}

/// Translate a `[...]` character class. Returns the regex fragment and the
/// number of pattern characters consumed.
fn translate_class(chars: &[char]) -> Result<(String, usize), String> {
    debug_assert_eq!(chars.first(), Some(&'['));
    let mut out = String::from("[");
    let mut i = 1;

    if matches!(chars.get(i), Some('!') | Some('^')) {
        out.push('^');
        i += 1;
    }

    // `]` as the first member is literal.
    if chars.get(i) == Some(&']') {
        out.push_str("\\]");
        i += 1;
    }

    loop {
        match chars.get(i) {
            None => return Err("unclosed character class".to_string()),
            Some(']') => {
                out.push(']');
                i += 1;
                break;
            }
            Some(&c) => {
                if c == '\\' || c == '^' {
                    out.push('\\');
                }
                out.push(c);
                i += 1;
            }
        }
    }

    Ok((out, i))
}

/// Translate `{a,b,c}` alternation into `(?:a|b|c)`, recursing for nested
/// globs inside each alternative.
fn translate_braces(chars: &[char]) -> Result<(String, usize), String> {
    debug_assert_eq!(chars.first(), Some(&'{'));
    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut depth = 1;
    let mut i = 1;

    loop {
        match chars.get(i) {
            None => return Err("unclosed brace group".to_string()),
            Some('{') => {
                depth += 1;
                current.push('{');
                i += 1;
            }
            Some('}') => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    alternatives.push(current);
                    break;
                }
                current.push('}');
            }
            Some(',') if depth == 1 => {
                alternatives.push(std::mem::take(&mut current));
                i += 1;
            }
            Some(&c) => {
                current.push(c);
                i += 1;
            }
        }
    }

    let translated: Result<Vec<String>, String> =
        alternatives.iter().map(|alt| translate(alt)).collect();
    Ok((format!("(?:{})", translated?.join("|")), i))
}

fn push_literal(out: &mut String, c: char) {
    if regex_metachar(c) {
        out.push('\\');
    }
    out.push(c);
}

fn regex_metachar(c: char) -> bool {
    matches!(
        c,
        '.' | '+' | '(' | ')' | '|' | '^' | '$' | '[' | ']' | '{' | '}' | '*' | '?' | '\\'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("*.rs", "main.rs", true)]
    #[case("*.rs", "main.txt", false)]
    #[case("*.rs", "src/main.rs", false)] // `*` does not cross separators
    #[case("src/*.rs", "src/main.rs", true)]
    #[case("src/*.rs", "src/sub/main.rs", false)]
    #[case("**/*.rs", "src/sub/main.rs", true)]
    #[case("**/*.rs", "main.rs", true)] // `**/` matches zero directories
    #[case("src/**", "src/a/b/c.txt", true)]
    #[case("test?", "test1", true)]
    #[case("test?", "test12", false)]
    #[case("file[0-9].txt", "file5.txt", true)]
    #[case("file[0-9].txt", "filea.txt", false)]
    #[case("[!abc]x", "dx", true)]
    #[case("[!abc]x", "ax", false)]
    fn glob_matching(#[case] pattern: &str, #[case] input: &str, #[case] expected: bool) {
        let glob = GlobPattern::new(pattern).unwrap();
        assert_eq!(glob.is_match(input), expected, "{pattern} vs {input}");
    }

    #[rstest]
    #[case("*.{rs,toml}", "Cargo.toml", true)]
    #[case("*.{rs,toml}", "main.rs", true)]
    #[case("*.{rs,toml}", "main.py", false)]
    #[case("{a,b}{1,2}", "b2", true)]
    #[case("{a,{b,c}}", "c", true)]
    #[case("README{,.md}", "README", true)]
    #[case("README{,.md}", "README.md", true)]
    fn brace_alternation(#[case] pattern: &str, #[case] input: &str, #[case] expected: bool) {
        let glob = GlobPattern::new(pattern).unwrap();
        assert_eq!(glob.is_match(input), expected);
    }

    #[test]
    fn pattern_is_anchored() {
        let glob = GlobPattern::new("main").unwrap();
        assert!(glob.is_match("main"));
        assert!(!glob.is_match("main.rs"));
        assert!(!glob.is_match("xmain"));
    }

    #[test]
    fn regex_metachars_are_literal() {
        let glob = GlobPattern::new("a+b.txt").unwrap();
        assert!(glob.is_match("a+b.txt"));
        assert!(!glob.is_match("aab-txt"));
    }

    #[test]
    fn basename_only_without_slash() {
        let glob = GlobPattern::new("*.ts").unwrap();
        assert!(glob.matches_basename_only());
        assert!(glob.matches_path("src/deep/x.ts"));
        assert!(!glob.matches_path("src/deep/x.rs"));

        let rooted = GlobPattern::new("src/*.ts").unwrap();
        assert!(!rooted.matches_basename_only());
        assert!(rooted.matches_path("src/x.ts"));
        assert!(!rooted.matches_path("other/x.ts"));
    }

    #[test]
    fn escaped_metachars_match_literally() {
        let glob = GlobPattern::new("file\\[1\\]").unwrap();
        assert!(glob.is_match("file[1]"));
    }

    #[test]
    fn unclosed_class_is_error() {
        let err = GlobPattern::new("[abc").unwrap_err();
        assert!(err.to_string().contains("unclosed character class"));
    }

    #[test]
    fn unclosed_brace_is_error() {
        let err = GlobPattern::new("{a,b").unwrap_err();
        assert!(err.to_string().contains("unclosed brace group"));
    }

    #[test]
    fn contains_glob_detection() {
        assert!(contains_glob("*.rs"));
        assert!(contains_glob("src/[ab].txt"));
        assert!(contains_glob("*.{rs,go}"));
        assert!(!contains_glob("src/main.rs"));
    }
}
