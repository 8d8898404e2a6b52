//! External ripgrep invocation.
//!
//! Argument contract: `rg -n -H --no-heading [--ignore-case] [-g glob]
//! -e pattern -- base`. Exit 0 means matches were found, exit 1 means no
//! matches (success with empty results), anything else is a tool failure.

use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use toolfs_types::GrepMatch;

/// Failure modes of the external tool, kept separate from [`FsError`]
/// (`toolfs_types::FsError`) so the caller can decide between falling back
/// and surfacing the error.
#[derive(Debug)]
pub(crate) enum ExternalError {
    /// Spawn failed; the binary is likely not installed.
    Unavailable(String),
    /// The tool ran but exited with an unexpected status.
    Failed(String),
    /// Wall-clock budget or output cap exceeded. Fatal for this call, no
    /// fallback.
    BudgetExceeded(String),
}

/// Run ripgrep rooted at `root`, searching `base_rel` (`.` for the whole
/// root). Returned paths are virtual: forward slashes, leading `/`,
/// relative to `root`.
pub(crate) async fn rg_search(
    root: &Path,
    base_rel: &str,
    pattern: &str,
    glob: Option<&str>,
    ignore_case: bool,
    budget: Duration,
    max_output_bytes: usize,
) -> Result<Vec<GrepMatch>, ExternalError> {
    let base = if base_rel.is_empty() { "." } else { base_rel };

    let mut cmd = Command::new("rg");
    cmd.current_dir(root)
        .arg("-n")
        .arg("-H")
        .arg("--no-heading");
    if ignore_case {
        cmd.arg("--ignore-case");
    }
    if let Some(glob) = glob {
        cmd.arg("-g").arg(glob);
    }
    cmd.arg("-e")
        .arg(pattern)
        .arg("--")
        .arg(base)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| ExternalError::Unavailable(format!("failed to spawn rg: {e}")))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| ExternalError::Failed("rg stdout pipe missing".to_string()))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| ExternalError::Failed("rg stderr pipe missing".to_string()))?;

    // Stream stdout under the cap instead of buffering the whole output;
    // a runaway match set must not accumulate past `max_output_bytes`.
    // kill_on_drop reaps the child if the budget elapses or the cap trips,
    // since bailing out drops the spawned handle.
    let outcome = tokio::time::timeout(budget, async move {
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        let stdout = read_capped(&mut stdout_pipe, max_output_bytes).await?;
        let status = child
            .wait()
            .await
            .map_err(|e| ExternalError::Failed(format!("rg failed: {e}")))?;
        let stderr = stderr_task.await.unwrap_or_default();
        Ok::<_, ExternalError>((status, stdout, stderr))
    })
    .await;

    let (status, stdout, stderr) = match outcome {
        Ok(Ok(parts)) => parts,
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            return Err(ExternalError::BudgetExceeded(format!(
                "rg exceeded {}ms budget",
                budget.as_millis()
            )));
        }
    };

    match status.code() {
        Some(0) => Ok(parse_rg_output(&stdout)),
        // Exit 1 is "no matches", not an error.
        Some(1) => Ok(Vec::new()),
        code => {
            let stderr = String::from_utf8_lossy(&stderr);
            Err(ExternalError::Failed(format!(
                "rg exited with {code:?}: {}",
                stderr.trim()
            )))
        }
    }
}

/// Drain a reader into memory, failing as soon as the running total would
/// pass `max_bytes`.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> Result<Vec<u8>, ExternalError> {
    let mut collected = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .map_err(|e| ExternalError::Failed(format!("rg read failed: {e}")))?;
        if n == 0 {
            return Ok(collected);
        }
        if collected.len() + n > max_bytes {
            return Err(ExternalError::BudgetExceeded(format!(
                "rg output exceeded {max_bytes} byte cap"
            )));
        }
        collected.extend_from_slice(&chunk[..n]);
    }
}

/// Parse `path:line:text` output back into matches.
fn parse_rg_output(stdout: &[u8]) -> Vec<GrepMatch> {
    let text = String::from_utf8_lossy(stdout);
    let mut matches = Vec::new();

    for line in text.lines() {
        let mut parts = line.splitn(3, ':');
        let (Some(path), Some(number), Some(content)) =
            (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let Ok(number) = number.parse::<u64>() else {
            continue;
        };
        let rel = path
            .trim_start_matches("./")
            .replace('\\', "/");
        matches.push(GrepMatch {
            path: format!("/{rel}"),
            line: number,
            text: content.to_string(),
        });
    }

    matches
}
