//! Execution driver: owns the lifecycle of one task.
//!
//! The driver waits for a concurrency permit, moves the task to `running`,
//! invokes the [`ScriptRunner`] while appending streamed output, and
//! finalizes the record. Each step is a single atomic update through
//! [`TaskRepo`]. Illegal or late transitions are ignored and logged.

use std::sync::Arc;
use std::time::Duration;

use fleet_core::execution::{RemoteTarget, RunError, RunOutcome, ScriptRunner, ScriptSource};
use fleet_core::task::{TaskStatus, TransitionOutcome, FAILURE_MARKER};
use fleet_core::types::DbId;
use fleet_db::repositories::TaskRepo;
use fleet_db::DbPool;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use super::stats::ExecutionStats;

/// How a run ended, before it is written to the record.
#[derive(Debug)]
enum RunEnding {
    Completed(RunOutcome),
    Errored(RunError),
    TimedOut,
    Cancelled,
}

/// Drives tasks to a terminal state. Cheap to clone; one instance is shared
/// by every task the dispatcher starts.
#[derive(Clone)]
pub struct ExecutionDriver {
    pool: DbPool,
    runner: Arc<dyn ScriptRunner>,
    permits: Arc<Semaphore>,
    timeout: Duration,
    stats: Arc<ExecutionStats>,
}

impl ExecutionDriver {
    pub fn new(
        pool: DbPool,
        runner: Arc<dyn ScriptRunner>,
        max_concurrent: usize,
        timeout: Duration,
        stats: Arc<ExecutionStats>,
    ) -> Self {
        Self {
            pool,
            runner,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            timeout,
            stats,
        }
    }

    /// Run `task_id` to completion.
    ///
    /// If `cancel` fires, the driver stops waiting and drops the in-flight
    /// run. It does not write the `cancelled` status itself; whoever cancels
    /// finalizes the record first.
    pub async fn drive(
        &self,
        task_id: DbId,
        target: RemoteTarget,
        script: ScriptSource,
        cancel: CancellationToken,
    ) {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(task_id, "Task cancelled while waiting for a permit");
                return;
            }
            permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!(task_id, "Execution semaphore closed");
                    return;
                }
            },
        };

        match TaskRepo::start(&self.pool, task_id).await {
            Ok(TransitionOutcome::Applied) => {}
            Ok(TransitionOutcome::Ignored { current, .. }) => {
                tracing::debug!(task_id, %current, "Task no longer queued, not starting");
                return;
            }
            Err(e) => {
                tracing::error!(task_id, error = %e, "Failed to start task");
                return;
            }
        }

        self.stats.record_started();
        tracing::info!(
            task_id,
            server_id = target.server_id,
            script_id = script.script_id,
            "Task running",
        );

        let ending = self.execute(task_id, &target, &script, &cancel).await;
        self.finalize(task_id, ending).await;
    }

    /// Invoke the runner, appending output as it arrives, until it
    /// completes, the deadline passes, or `cancel` fires.
    async fn execute(
        &self,
        task_id: DbId,
        target: &RemoteTarget,
        script: &ScriptSource,
        cancel: &CancellationToken,
    ) -> RunEnding {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut run = self.runner.run(target, script, tx);
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        let ending = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break RunEnding::Cancelled,
                _ = &mut deadline => break RunEnding::TimedOut,
                Some(chunk) = rx.recv() => self.append(task_id, &chunk).await,
                result = &mut run => break match result {
                    Ok(outcome) => RunEnding::Completed(outcome),
                    Err(e) => RunEnding::Errored(e),
                },
            }
        };

        // Dropping the run releases the transport (kills the ssh child).
        drop(run);
        while let Ok(chunk) = rx.try_recv() {
            self.append(task_id, &chunk).await;
        }

        ending
    }

    async fn append(&self, task_id: DbId, chunk: &str) {
        if let Err(e) = TaskRepo::append_output(&self.pool, task_id, chunk).await {
            tracing::error!(task_id, error = %e, "Failed to append task output");
        }
    }

    async fn finalize(&self, task_id: DbId, ending: RunEnding) {
        let (status, marker) = match ending {
            RunEnding::Completed(outcome) if outcome.succeeded() => (TaskStatus::Succeeded, None),
            RunEnding::Completed(outcome) => (
                TaskStatus::Failed,
                Some(format!(
                    "{FAILURE_MARKER} exited with status {}",
                    outcome.exit_code
                )),
            ),
            RunEnding::Errored(e) => {
                tracing::warn!(task_id, error = %e, "Task execution failed");
                (TaskStatus::Failed, Some(format!("{FAILURE_MARKER} {e}")))
            }
            RunEnding::TimedOut => {
                tracing::warn!(
                    task_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Task execution timed out",
                );
                (
                    TaskStatus::Failed,
                    Some(format!(
                        "{FAILURE_MARKER} execution timed out after {:?}",
                        self.timeout
                    )),
                )
            }
            RunEnding::Cancelled => {
                tracing::debug!(task_id, "Task run stopped by cancellation");
                return;
            }
        };

        match TaskRepo::finish(&self.pool, task_id, status, marker.as_deref()).await {
            Ok((TransitionOutcome::Applied, _)) => {
                self.stats.record_finished(status);
                tracing::info!(task_id, %status, "Task finished");
            }
            Ok((TransitionOutcome::Ignored { current, requested }, _)) => {
                if current == TaskStatus::Cancelled {
                    tracing::debug!(task_id, %requested, "Task was cancelled before it finished");
                } else {
                    tracing::warn!(
                        task_id,
                        %current,
                        %requested,
                        "Ignored illegal task transition",
                    );
                }
            }
            Err(e) => {
                tracing::error!(task_id, error = %e, "Failed to finalize task");
            }
        }
    }
}
