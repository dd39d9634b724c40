//! [`ScriptRunner`] backed by the system `ssh` client.
//!
//! The script body is piped to `bash -s` on the remote host, so nothing is
//! written to the remote filesystem. Key-based authentication is assumed
//! (`BatchMode=yes`); the client never prompts.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::subprocess::stream_command;
use super::{OutputSink, RemoteTarget, RunError, RunOutcome, ScriptRunner, ScriptSource};

/// Exit status the OpenSSH client uses for its own errors.
const SSH_CLIENT_ERROR_EXIT: i32 = 255;

/// Runs scripts through the local OpenSSH client.
#[derive(Debug, Clone)]
pub struct SshRunner {
    program: String,
    connect_timeout: Duration,
}

impl SshRunner {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            program: "ssh".to_string(),
            connect_timeout,
        }
    }

    /// Use a different client binary (for example an absolute path).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments passed to the client for `target`.
    fn build_args(&self, target: &RemoteTarget) -> Vec<String> {
        vec![
            "-p".to_string(),
            target.port.to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            format!("{}@{}", target.username, target.address),
            "bash".to_string(),
            "-s".to_string(),
        ]
    }
}

#[async_trait]
impl ScriptRunner for SshRunner {
    async fn run(
        &self,
        target: &RemoteTarget,
        script: &ScriptSource,
        output: OutputSink,
    ) -> Result<RunOutcome, RunError> {
        tracing::debug!(
            server_id = target.server_id,
            script_id = script.script_id,
            address = %target.address,
            port = target.port,
            "Starting ssh session",
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(self.build_args(target));

        let outcome = stream_command(&mut cmd, &script.content, output).await?;

        // 255 is ambiguous (a remote `exit 255` looks the same), but in
        // practice it means the client never got a shell.
        if outcome.exit_code == SSH_CLIENT_ERROR_EXIT {
            return Err(RunError::Connection(format!(
                "ssh to {}@{}:{} exited with status {SSH_CLIENT_ERROR_EXIT}",
                target.username, target.address, target.port
            )));
        }

        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
