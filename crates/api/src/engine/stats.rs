//! Execution counters exposed at `GET /api/v1/stats`.

use std::sync::atomic::{AtomicU64, Ordering};

use fleet_core::task::TaskStatus;
use serde::Serialize;

/// Counters updated by drivers and the dispatcher.
#[derive(Debug, Default)]
pub struct ExecutionStats {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

/// Point-in-time copy of [`ExecutionStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl ExecutionStats {
    /// A task moved to `running`.
    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    /// A task reached `status`. Non-terminal statuses are ignored.
    pub fn record_finished(&self, status: TaskStatus) {
        let counter = match status {
            TaskStatus::Succeeded => &self.succeeded,
            TaskStatus::Failed => &self.failed,
            TaskStatus::Cancelled => &self.cancelled,
            TaskStatus::Queued | TaskStatus::Running => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}
