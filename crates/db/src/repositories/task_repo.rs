//! Repository for task records.
//!
//! Every mutation goes through one of the [`Task`] transition methods while
//! holding that task's own write lock, so a reader never observes a torn
//! record and tasks never block one another.

use std::sync::Arc;

use fleet_core::error::CoreError;
use fleet_core::task::{TaskStatus, TransitionOutcome};
use fleet_core::types::DbId;
use tokio::sync::RwLock;

use crate::models::task::{CreateTask, Task, TaskPage};
use crate::Store;

/// Provides create, read, and lifecycle updates for tasks.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a new queued task.
    pub async fn create(store: &Store, input: &CreateTask) -> Task {
        let id = store.tasks.next_id();
        let task = Task::new(id, input);
        store
            .tasks
            .rows
            .write()
            .await
            .insert(id, Arc::new(RwLock::new(task.clone())));
        task
    }

    /// Insert a new queued task unless its server already has a queued or
    /// running one.
    ///
    /// The check and the insert happen under one table write, so two
    /// concurrent submissions for the same server cannot both pass.
    pub async fn create_if_idle(store: &Store, input: &CreateTask) -> Result<Task, CoreError> {
        let mut rows = store.tasks.rows.write().await;
        for row in rows.values().rev() {
            let existing = row.read().await;
            if existing.server_id == input.server_id && existing.status.is_active() {
                return Err(CoreError::Conflict(format!(
                    "Server {} is busy with task {}",
                    input.server_id, existing.id
                )));
            }
        }

        let id = store.tasks.next_id();
        let task = Task::new(id, input);
        rows.insert(id, Arc::new(RwLock::new(task.clone())));
        Ok(task)
    }

    /// Insert several queued tasks in one step, preserving input order.
    ///
    /// Observers see either none or all of them.
    pub async fn create_many(store: &Store, inputs: &[CreateTask]) -> Vec<Task> {
        let mut rows = store.tasks.rows.write().await;
        inputs
            .iter()
            .map(|input| {
                let id = store.tasks.next_id();
                let task = Task::new(id, input);
                rows.insert(id, Arc::new(RwLock::new(task.clone())));
                task
            })
            .collect()
    }

    /// Snapshot of one task.
    pub async fn find_by_id(store: &Store, id: DbId) -> Option<Task> {
        let row = Self::row(store, id).await?;
        let task = row.read().await.clone();
        Some(task)
    }

    /// Snapshot of every task, newest first.
    pub async fn list(store: &Store) -> Vec<Task> {
        Self::collect(store, |_| true).await
    }

    /// Tasks fanned out from `group_id`, newest first.
    pub async fn list_by_group(store: &Store, group_id: DbId) -> Vec<Task> {
        Self::collect(store, |task| task.source_group_id == Some(group_id)).await
    }

    /// One page of tasks, optionally filtered by status, newest first.
    pub async fn search(
        store: &Store,
        status: Option<TaskStatus>,
        limit: i64,
        offset: i64,
    ) -> TaskPage {
        let matching =
            Self::collect(store, |task| status.map_or(true, |s| task.status == s)).await;
        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        TaskPage { items, total }
    }

    /// The newest task for a server/script pair.
    pub async fn latest_for_pair(store: &Store, server_id: DbId, script_id: DbId) -> Option<Task> {
        Self::collect(store, |task| {
            task.server_id == server_id && task.script_id == script_id
        })
        .await
        .into_iter()
        .next()
    }

    /// `queued -> running`.
    pub async fn start(store: &Store, id: DbId) -> Result<TransitionOutcome, CoreError> {
        let row = Self::row(store, id).await.ok_or(CoreError::NotFound {
            entity: "Task",
            id,
        })?;
        let outcome = row.write().await.start();
        Ok(outcome)
    }

    /// Append a transcript chunk; returns `false` if the task is not running.
    pub async fn append_output(store: &Store, id: DbId, chunk: &str) -> Result<bool, CoreError> {
        let row = Self::row(store, id).await.ok_or(CoreError::NotFound {
            entity: "Task",
            id,
        })?;
        let appended = row.write().await.append_output(chunk);
        Ok(appended)
    }

    /// Move a task to a terminal status. Returns the outcome together with
    /// the record as it stands afterwards.
    pub async fn finish(
        store: &Store,
        id: DbId,
        status: TaskStatus,
        marker: Option<&str>,
    ) -> Result<(TransitionOutcome, Task), CoreError> {
        let row = Self::row(store, id).await.ok_or(CoreError::NotFound {
            entity: "Task",
            id,
        })?;
        let mut task = row.write().await;
        let outcome = task.finish(status, marker);
        Ok((outcome, task.clone()))
    }

    // -- helpers ------------------------------------------------------------

    async fn row(store: &Store, id: DbId) -> Option<Arc<RwLock<Task>>> {
        store.tasks.rows.read().await.get(&id).cloned()
    }

    /// Snapshot matching rows, id descending. The table lock is released
    /// before any row is read.
    async fn collect<F>(store: &Store, filter: F) -> Vec<Task>
    where
        F: Fn(&Task) -> bool,
    {
        let rows: Vec<Arc<RwLock<Task>>> =
            store.tasks.rows.read().await.values().rev().cloned().collect();

        let mut tasks = Vec::new();
        for row in rows {
            let task = row.read().await;
            if filter(&*task) {
                tasks.push(task.clone());
            }
        }
        tasks
    }
}
