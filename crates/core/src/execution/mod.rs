//! Remote script execution capability.
//!
//! Defines [`ScriptRunner`], the narrow contract the task engine uses to run
//! a script on one host, together with [`RemoteTarget`], [`ScriptSource`],
//! [`RunOutcome`], and [`RunError`]. Implementations stream transcript chunks
//! through an [`OutputSink`] while they run so observers can watch progress.

pub mod mock;
pub mod ssh;
pub mod subprocess;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::DbId;

/// Channel sender half for transcript chunks produced during a run.
///
/// Each chunk is appended verbatim to the task output. A closed channel means
/// nobody is listening any more; implementations should stop sending.
pub type OutputSink = mpsc::UnboundedSender<String>;

/// Connection details for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Server id in the directory, used as the key in probe results.
    pub server_id: DbId,
    /// Display hostname.
    pub hostname: String,
    /// IP literal or DNS name used to connect.
    pub address: String,
    /// TCP port of the remote shell service.
    pub port: u16,
    /// Login name for the remote session.
    pub username: String,
}

/// A script to run on a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    pub script_id: DbId,
    pub name: String,
    /// Script body, fed to the remote shell on stdin.
    pub content: String,
}

/// Completion of a run that reached the remote shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Remote exit status (`-1` if killed by a signal).
    pub exit_code: i32,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors that prevent a run from completing.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The remote host could not be reached or refused the session.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The local transport process could not be started.
    #[error("Failed to start transport: {0}")]
    Spawn(#[source] std::io::Error),

    /// An I/O error occurred while communicating with the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Runs a script on a remote host.
///
/// Must be safe to call concurrently for different targets. Timeouts and
/// cancellation are enforced by the caller dropping the returned future, so
/// implementations must release their resources (child processes, sockets)
/// on drop.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(
        &self,
        target: &RemoteTarget,
        script: &ScriptSource,
        output: OutputSink,
    ) -> Result<RunOutcome, RunError>;
}

/// Shared fixtures for runner tests.
#[cfg(test)]
pub(crate) mod test_helpers {
    use super::{RemoteTarget, ScriptSource};

    pub fn target() -> RemoteTarget {
        RemoteTarget {
            server_id: 7,
            hostname: "web-01".to_string(),
            address: "10.0.0.7".to_string(),
            port: 2222,
            username: "deploy".to_string(),
        }
    }

    pub fn script(content: &str) -> ScriptSource {
        ScriptSource {
            script_id: 3,
            name: "uptime-check".to_string(),
            content: content.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
