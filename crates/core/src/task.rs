//! Task lifecycle state machine.
//!
//! A task moves `queued -> running -> {succeeded, failed}`. A task that is
//! cancelled while queued or running ends in `cancelled`. Terminal states
//! never change again; every attempt to move out of one is reported as
//! [`TransitionOutcome::Ignored`] so the caller can log it and carry on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Output written to a task when its driver starts executing, before any
/// remote output is appended.
pub const PROGRESS_MARKER: &str = "Connecting...\nExecuting...\n";

/// Prefix for the line appended to the output of a failed task.
pub const FAILURE_MARKER: &str = "[FAILED]";

/// Prefix for the line appended to the output of a cancelled task.
pub const CANCEL_MARKER: &str = "[CANCELLED]";

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, waiting for its driver to begin.
    Queued,
    /// The driver is waiting on the remote execution.
    Running,
    /// The remote execution completed with exit status 0.
    Succeeded,
    /// The remote execution errored, timed out, or exited non-zero.
    Failed,
    /// Cancelled before reaching another terminal state.
    Cancelled,
}

impl TaskStatus {
    /// Whether no further transition can occur from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Queued, Cancelled)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Cancelled)
        )
    }

    /// Whether a driver still owns the task.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Parse a wire name. Returns `None` for unknown values.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Lowercase wire name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of asking a task record to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The change was applied.
    Applied,
    /// The change was illegal from the current status and nothing was written.
    Ignored {
        /// Status the record was in.
        current: TaskStatus,
        /// Status the caller asked for.
        requested: TaskStatus,
    },
}

impl TransitionOutcome {
    /// Check `current -> requested` against the transition table.
    pub fn check(current: TaskStatus, requested: TaskStatus) -> Self {
        if current.can_transition_to(requested) {
            Self::Applied
        } else {
            Self::Ignored { current, requested }
        }
    }

    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
