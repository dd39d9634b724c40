//! Task dispatcher.
//!
//! Creates task records for single, bulk, and group submissions and starts
//! one [`ExecutionDriver`] per task on a [`TaskTracker`]. Every running driver
//! has a [`CancellationToken`] (a child of the dispatcher's shutdown token)
//! registered in `in_flight` so it can be cancelled individually or all at
//! once on shutdown.
//!
//! Record creation and driver spawning happen with no `.await` in between,
//! so dropping a submission future (client disconnect, request timeout)
//! never leaves created tasks without a driver.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fleet_core::error::CoreError;
use fleet_core::execution::{RemoteTarget, ScriptSource};
use fleet_core::task::{TaskStatus, TransitionOutcome, CANCEL_MARKER};
use fleet_core::types::DbId;
use fleet_db::models::script::Script;
use fleet_db::models::server::Server;
use fleet_db::models::task::{CreateTask, Task};
use fleet_db::repositories::{GroupRepo, ScriptRepo, ServerRepo, TaskRepo};
use fleet_db::DbPool;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::driver::ExecutionDriver;
use super::stats::ExecutionStats;

/// Starts and tracks task drivers.
pub struct TaskDispatcher {
    pool: DbPool,
    driver: ExecutionDriver,
    stats: Arc<ExecutionStats>,
    in_flight: Arc<InFlight>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

impl TaskDispatcher {
    pub fn new(pool: DbPool, driver: ExecutionDriver, stats: Arc<ExecutionStats>) -> Self {
        Self {
            pool,
            driver,
            stats,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Create and start one task for `server_id`.
    ///
    /// Fails with `Conflict` if the server already has a queued or running
    /// task.
    pub async fn submit_one(&self, server_id: DbId, script_id: DbId) -> Result<Task, CoreError> {
        self.ensure_accepting()?;
        let script = self.find_script(script_id).await?;
        let server = ServerRepo::find_by_id(&self.pool, server_id)
            .await
            .ok_or(CoreError::NotFound {
                entity: "Server",
                id: server_id,
            })?;

        let task = TaskRepo::create_if_idle(
            &self.pool,
            &CreateTask {
                server_id,
                script_id,
                source_group_id: None,
            },
        )
        .await
        .inspect_err(|_| tracing::warn!(server_id, "Task rejected, server is busy"))?;
        self.spawn_driver(&task, server.target(), script.source());

        tracing::info!(task_id = task.id, server_id, script_id, "Task submitted");
        Ok(task)
    }

    /// Create and start one task per server. Every server must exist and be
    /// listed once; otherwise nothing is created.
    pub async fn submit_bulk(
        &self,
        script_id: DbId,
        server_ids: &[DbId],
    ) -> Result<Vec<Task>, CoreError> {
        if server_ids.is_empty() {
            return Err(CoreError::Validation(
                "server_ids must not be empty".to_string(),
            ));
        }
        let distinct: BTreeSet<DbId> = server_ids.iter().copied().collect();
        if distinct.len() != server_ids.len() {
            return Err(CoreError::Validation(
                "server_ids must not contain duplicates".to_string(),
            ));
        }
        self.ensure_accepting()?;
        let script = self.find_script(script_id).await?;
        let servers = ServerRepo::find_many(&self.pool, server_ids).await?;

        let tasks = self.create_and_start(&servers, &script, None).await;
        tracing::info!(script_id, count = tasks.len(), "Bulk tasks submitted");
        Ok(tasks)
    }

    /// Fan a script out over the current members of a group.
    ///
    /// Membership is read once; tasks are returned in member-id order. An
    /// empty group yields an empty list.
    pub async fn execute_group(
        &self,
        group_id: DbId,
        script_id: DbId,
    ) -> Result<Vec<Task>, CoreError> {
        self.ensure_accepting()?;
        let member_ids = GroupRepo::member_ids(&self.pool, group_id).await?;
        let script = self.find_script(script_id).await?;

        let mut servers = Vec::with_capacity(member_ids.len());
        for server_id in member_ids {
            match ServerRepo::find_by_id(&self.pool, server_id).await {
                Some(server) => servers.push(server),
                None => tracing::warn!(group_id, server_id, "Group member no longer exists, skipping"),
            }
        }

        if servers.is_empty() {
            tracing::info!(group_id, script_id, "Group has no members, nothing dispatched");
            return Ok(Vec::new());
        }

        let tasks = self.create_and_start(&servers, &script, Some(group_id)).await;
        tracing::info!(group_id, script_id, count = tasks.len(), "Group execution dispatched");
        Ok(tasks)
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    /// Cancel a queued or running task. Cancelling a finished task returns
    /// it unchanged.
    pub async fn cancel(&self, task_id: DbId) -> Result<Task, CoreError> {
        let marker = format!("{CANCEL_MARKER} cancelled by request");
        self.cancel_with_marker(task_id, &marker).await
    }

    /// Stop accepting work, cancel every in-flight task, and wait for their
    /// drivers to exit.
    ///
    /// Tasks created by a submission that raced this call are caught by the
    /// final sweep.
    pub async fn shutdown(&self) {
        self.tracker.close();

        let ids: Vec<DbId> = lock(&self.in_flight).keys().copied().collect();
        tracing::info!(count = ids.len(), "Cancelling in-flight tasks");

        let marker = format!("{CANCEL_MARKER} server shutting down");
        for task_id in ids {
            self.cancel_quietly(task_id, &marker).await;
        }

        self.shutdown.cancel();
        self.tracker.wait().await;

        for task in TaskRepo::list(&self.pool).await {
            if task.status.is_active() {
                self.cancel_quietly(task.id, &marker).await;
            }
        }
    }

    /// Number of drivers that have not exited yet.
    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Refuse new work once shutdown has begun.
    fn ensure_accepting(&self) -> Result<(), CoreError> {
        if self.tracker.is_closed() {
            return Err(CoreError::Internal(
                "task dispatcher is shutting down".to_string(),
            ));
        }
        Ok(())
    }

    async fn find_script(&self, script_id: DbId) -> Result<Script, CoreError> {
        ScriptRepo::find_by_id(&self.pool, script_id)
            .await
            .ok_or(CoreError::NotFound {
                entity: "Script",
                id: script_id,
            })
    }

    async fn create_and_start(
        &self,
        servers: &[Server],
        script: &Script,
        source_group_id: Option<DbId>,
    ) -> Vec<Task> {
        let inputs: Vec<CreateTask> = servers
            .iter()
            .map(|server| CreateTask {
                server_id: server.id,
                script_id: script.id,
                source_group_id,
            })
            .collect();

        let tasks = TaskRepo::create_many(&self.pool, &inputs).await;
        let source = script.source();
        for (task, server) in tasks.iter().zip(servers) {
            self.spawn_driver(task, server.target(), source.clone());
        }
        tasks
    }

    /// Register and start the driver for a freshly created task. Must stay
    /// synchronous: see the module docs.
    fn spawn_driver(&self, task: &Task, target: RemoteTarget, script: ScriptSource) {
        let task_id = task.id;
        let token = self.shutdown.child_token();
        lock(&self.in_flight).insert(task_id, token.clone());

        let driver = self.driver.clone();
        let in_flight = Arc::clone(&self.in_flight);
        self.tracker.spawn(async move {
            driver.drive(task_id, target, script, token).await;
            lock(&in_flight).remove(&task_id);
        });
    }

    async fn cancel_quietly(&self, task_id: DbId, marker: &str) {
        if let Err(e) = self.cancel_with_marker(task_id, marker).await {
            tracing::error!(task_id, error = %e, "Failed to cancel task during shutdown");
        }
    }

    /// Finalize `task_id` as cancelled, then stop its driver.
    async fn cancel_with_marker(&self, task_id: DbId, marker: &str) -> Result<Task, CoreError> {
        let (outcome, task) =
            TaskRepo::finish(&self.pool, task_id, TaskStatus::Cancelled, Some(marker)).await?;

        match outcome {
            TransitionOutcome::Applied => {
                self.stats.record_finished(TaskStatus::Cancelled);
                if let Some(token) = lock(&self.in_flight).get(&task_id) {
                    token.cancel();
                }
                tracing::info!(task_id, "Task cancelled");
            }
            TransitionOutcome::Ignored { current, .. } => {
                tracing::debug!(task_id, %current, "Cancel requested for finished task");
            }
        }
        Ok(task)
    }
}

type InFlight = Mutex<HashMap<DbId, CancellationToken>>;

/// Lock the in-flight map. It is never held across an `.await`.
fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashMap<DbId, CancellationToken>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}
