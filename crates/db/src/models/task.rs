//! Task entity and the DTOs of the task routes.

use chrono::Utc;
use fleet_core::task::{TaskStatus, TransitionOutcome, PROGRESS_MARKER};
use fleet_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};

/// One script-on-host execution attempt.
///
/// Fields change only through [`Task::start`], [`Task::append_output`], and
/// [`Task::finish`], which keep `finished_at` set exactly when the status is
/// terminal.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: DbId,
    pub server_id: DbId,
    pub script_id: DbId,
    /// Group this task was fanned out from, if any.
    pub source_group_id: Option<DbId>,
    pub status: TaskStatus,
    pub output: String,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl Task {
    pub(crate) fn new(id: DbId, input: &CreateTask) -> Self {
        Self {
            id,
            server_id: input.server_id,
            script_id: input.script_id,
            source_group_id: input.source_group_id,
            status: TaskStatus::Queued,
            output: String::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// `queued -> running`, replacing the output with the progress marker.
    pub fn start(&mut self) -> TransitionOutcome {
        let outcome = TransitionOutcome::check(self.status, TaskStatus::Running);
        if outcome.is_applied() {
            self.status = TaskStatus::Running;
            self.output = PROGRESS_MARKER.to_string();
        }
        outcome
    }

    /// Append a transcript chunk. Only a running task accepts output.
    pub fn append_output(&mut self, chunk: &str) -> bool {
        if self.status != TaskStatus::Running {
            return false;
        }
        self.output.push_str(chunk);
        true
    }

    /// Move to a terminal status, appending `marker` as its own line.
    pub fn finish(&mut self, status: TaskStatus, marker: Option<&str>) -> TransitionOutcome {
        if !status.is_terminal() {
            return TransitionOutcome::Ignored {
                current: self.status,
                requested: status,
            };
        }
        let outcome = TransitionOutcome::check(self.status, status);
        if outcome.is_applied() {
            if let Some(marker) = marker {
                if !self.output.is_empty() && !self.output.ends_with('\n') {
                    self.output.push('\n');
                }
                self.output.push_str(marker);
                self.output.push('\n');
            }
            self.status = status;
            self.finished_at = Some(Utc::now());
        }
        outcome
    }
}

/// Insert DTO for a task. Tasks always start `queued`.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub server_id: DbId,
    pub script_id: DbId,
    pub source_group_id: Option<DbId>,
}

/// Body of `POST /api/v1/tasks`.
#[derive(Debug, Deserialize)]
pub struct SubmitTask {
    pub server_id: Option<DbId>,
    pub script_id: Option<DbId>,
}

/// Body of `POST /api/v1/tasks/bulk`.
#[derive(Debug, Deserialize)]
pub struct SubmitBulkTasks {
    pub script_id: Option<DbId>,
    #[serde(default)]
    pub server_ids: Vec<DbId>,
}

/// Query of `GET /api/v1/tasks/search`.
#[derive(Debug, Deserialize)]
pub struct TaskSearchQuery {
    /// Wire name of a status, e.g. `running`.
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// One page of a task search, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct TaskPage {
    pub items: Vec<Task>,
    /// Number of matching tasks across all pages.
    pub total: i64,
}

/// Query of `GET /api/v1/tasks/status`.
#[derive(Debug, Deserialize)]
pub struct LastStatusQuery {
    pub server_id: DbId,
    pub script_id: DbId,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn queued() -> Task {
        Task::new(
            1,
            &CreateTask {
                server_id: 10,
                script_id: 20,
                source_group_id: None,
            },
        )
    }

    #[test]
    fn new_task_is_queued_without_finish_time() {
        let task = queued();
        assert_eq!(task.status, TaskStatus::Queued);
        assert!(task.output.is_empty());
        assert!(task.finished_at.is_none());
    }

    #[test]
    fn start_sets_progress_marker() {
        let mut task = queued();
        assert!(task.start().is_applied());
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(task.output, PROGRESS_MARKER);
    }

    #[test]
    fn output_is_rejected_unless_running() {
        let mut task = queued();
        assert!(!task.append_output("early"));
        task.start();
        assert!(task.append_output("line\n"));
        task.finish(TaskStatus::Succeeded, None);
        assert!(!task.append_output("late"));
        assert!(!task.output.contains("late"));
    }

    #[test]
    fn finish_sets_finished_at_and_marker_line() {
        let mut task = queued();
        task.start();
        task.append_output("partial");
        assert!(task.finish(TaskStatus::Failed, Some("[FAILED] boom")).is_applied());
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.finished_at.is_some());
        assert!(task.output.ends_with("partial\n[FAILED] boom\n"));
    }

    #[test]
    fn second_finish_keeps_first_result() {
        let mut task = queued();
        task.start();
        task.finish(TaskStatus::Succeeded, None);
        let finished_at = task.finished_at;

        assert_matches!(
            task.finish(TaskStatus::Failed, Some("[FAILED] late")),
            TransitionOutcome::Ignored {
                current: TaskStatus::Succeeded,
                requested: TaskStatus::Failed,
            }
        );
        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(task.finished_at, finished_at);
        assert!(!task.output.contains("late"));
    }

    #[test]
    fn finish_with_non_terminal_status_is_ignored() {
        let mut task = queued();
        assert!(!task.finish(TaskStatus::Running, None).is_applied());
        assert_eq!(task.status, TaskStatus::Queued);
        assert!(task.finished_at.is_none());
    }

    #[test]
    fn queued_task_can_be_cancelled() {
        let mut task = queued();
        assert!(task.finish(TaskStatus::Cancelled, Some("[CANCELLED]")).is_applied());
        assert_eq!(task.output, "[CANCELLED]\n");
    }

    #[test]
    fn bulk_body_defaults_to_empty_server_list() {
        let body: SubmitBulkTasks =
            serde_json::from_str(r#"{"script_id": 4}"#).expect("deserialize");
        assert_eq!(body.script_id, Some(4));
        assert!(body.server_ids.is_empty());
    }
}
