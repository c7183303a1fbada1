//! Running external command-line tools with a deadline.

use std::ffi::OsStr;
use std::process::Output;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

/// Why a tool invocation did not produce output.
#[derive(Debug)]
pub(crate) enum ToolError {
    NotFound,
    Timeout,
    Io(std::io::Error),
}

/// Run `binary` with `args`, killing it when `timeout` expires.
///
/// A non-zero exit is not an error here; callers inspect `Output::status`.
pub(crate) async fn run_tool<I, S>(
    binary: &str,
    args: I,
    timeout: Duration,
) -> Result<Output, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(binary);
    command.args(args).kill_on_drop(true);
    debug!("Running {:?}", command.as_std());

    match tokio::time::timeout(timeout, command.output()).await {
        Err(_) => Err(ToolError::Timeout),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => Err(ToolError::NotFound),
        Ok(Err(e)) => Err(ToolError::Io(e)),
        Ok(Ok(output)) => Ok(output),
    }
}

/// Trimmed stderr, capped for error messages.
pub(crate) fn stderr_excerpt(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    match trimmed.char_indices().nth(500) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
