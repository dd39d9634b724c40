//! Streaming subprocess management.
//!
//! Provides [`stream_command`], which spawns a prepared
//! [`tokio::process::Command`], feeds it a script on stdin, and forwards
//! stdout/stderr to an [`OutputSink`] line by line while the process runs.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;

use super::{OutputSink, RunError, RunOutcome};

/// Maximum stdout or stderr size forwarded per stream (10 MiB).
///
/// Lines past this limit are dropped and a single truncation notice is sent.
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Prefix for lines read from stderr.
pub const STDERR_PREFIX: &str = "[ERR] ";

/// Spawn `cmd`, write `stdin_payload` to its stdin, and stream its output.
///
/// Stdout lines are forwarded as-is, stderr lines prefixed with
/// [`STDERR_PREFIX`]. Once the process exits and both streams are drained an
/// `Exit status: N` line is sent. The child is spawned with
/// `kill_on_drop(true)`, so dropping the returned future kills it.
pub async fn stream_command(
    cmd: &mut Command,
    stdin_payload: &str,
    output: OutputSink,
) -> Result<RunOutcome, RunError> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(RunError::Spawn)?;

    let stdout_task = tokio::spawn(forward_lines(child.stdout.take(), "", output.clone()));
    let stderr_task = tokio::spawn(forward_lines(
        child.stderr.take(),
        STDERR_PREFIX,
        output.clone(),
    ));

    if let Some(mut stdin) = child.stdin.take() {
        // The remote side may exit before reading everything.
        let _ = stdin.write_all(stdin_payload.as_bytes()).await;
        drop(stdin);
    }

    let status = child.wait().await?;
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    let exit_code = status.code().unwrap_or(-1);
    let _ = output.send(format!("Exit status: {exit_code}\n"));

    Ok(RunOutcome { exit_code })
}

/// Forward every line of `handle` to `output`, capped at [`MAX_OUTPUT_BYTES`].
async fn forward_lines<R: AsyncRead + Unpin>(
    handle: Option<R>,
    prefix: &'static str,
    output: OutputSink,
) {
    let Some(handle) = handle else {
        return;
    };

    let mut lines = BufReader::new(handle).lines();
    let mut forwarded = 0usize;
    let mut truncated = false;

    while let Ok(Some(line)) = lines.next_line().await {
        if truncated {
            continue;
        }
        forwarded += line.len() + 1;
        if forwarded > MAX_OUTPUT_BYTES {
            truncated = true;
            let _ = output.send(format!("{prefix}... output truncated\n"));
            continue;
        }
        if output.send(format!("{prefix}{line}\n")).is_err() {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
