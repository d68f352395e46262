//! The task envelope carried on the task queue, and its status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::Document;
use crate::error::TaskStateError;

/// Default pipeline registry key used when a task omits `taskType`.
pub const DEFAULT_TASK_TYPE: &str = "default";

/// `PENDING -> PROCESSING -> {DONE | FAILED}`. `PROCESSING` is entered
/// exactly once per successful consume; `DONE`/`FAILED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl TaskStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// One document's preprocess work unit, carried on the task queue.
///
/// Mutation only happens through [`Task::mark_processing`],
/// [`Task::mark_done`], and [`Task::mark_failed`], which enforce the status
/// state machine and the timestamp ordering invariant
/// (`created_at <= processed_at <= finished_at`) instead of allowing free
/// field assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(alias = "task_id")]
    pub task_id: Uuid,

    pub status: TaskStatus,

    pub document: Document,

    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,

    #[serde(alias = "processed_at", default)]
    pub processed_at: Option<DateTime<Utc>>,

    #[serde(alias = "finished_at", default)]
    pub finished_at: Option<DateTime<Utc>>,

    #[serde(alias = "task_type", default = "default_task_type")]
    pub task_type: String,

    #[serde(alias = "destination_collection", default)]
    pub destination_collection: Option<String>,
}

fn default_task_type() -> String {
    DEFAULT_TASK_TYPE.to_string()
}

impl Task {
    /// Build a new task in `PENDING` state, as a producer would.
    #[must_use]
    pub fn new(document: Document, created_at: DateTime<Utc>) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            status: TaskStatus::Pending,
            document,
            created_at,
            processed_at: None,
            finished_at: None,
            task_type: DEFAULT_TASK_TYPE.to_string(),
            destination_collection: None,
        }
    }

    /// Transition `PENDING -> PROCESSING`, recording `processed_at`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStateError::AlreadyStarted`] if the task already left
    /// `PENDING`.
    pub fn mark_processing(&mut self, at: DateTime<Utc>) -> Result<(), TaskStateError> {
        if self.status != TaskStatus::Pending {
            return Err(TaskStateError::AlreadyStarted(self.task_id));
        }
        self.status = TaskStatus::Processing;
        self.processed_at = Some(at);
        Ok(())
    }

    /// Transition `PROCESSING -> DONE`, recording `finished_at`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStateError::NotProcessing`] if the task is not
    /// currently `PROCESSING`.
    pub fn mark_done(&mut self, at: DateTime<Utc>) -> Result<(), TaskStateError> {
        self.finish(TaskStatus::Done, at)
    }

    /// Transition `PROCESSING -> FAILED`, recording `finished_at`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStateError::NotProcessing`] if the task is not
    /// currently `PROCESSING`.
    pub fn mark_failed(&mut self, at: DateTime<Utc>) -> Result<(), TaskStateError> {
        self.finish(TaskStatus::Failed, at)
    }

    fn finish(&mut self, to: TaskStatus, at: DateTime<Utc>) -> Result<(), TaskStateError> {
        if self.status.is_terminal() {
            return Err(TaskStateError::AlreadyFinished(self.task_id));
        }
        if self.status != TaskStatus::Processing {
            return Err(TaskStateError::NotProcessing(self.task_id));
        }
        self.status = to;
        self.finished_at = Some(at);
        Ok(())
    }

    /// Resolves the pipeline registry key, defaulting to `"default"`.
    #[must_use]
    pub fn task_type(&self) -> &str {
        if self.task_type.is_empty() {
            DEFAULT_TASK_TYPE
        } else {
            &self.task_type
        }
    }

    /// Builds the result-queue message for the task's current status.
    ///
    /// Returns `None` for `PENDING`, which is never published.
    #[must_use]
    pub fn status_message(&self) -> Option<TaskStatusMessage> {
        let date_time = match self.status {
            TaskStatus::Pending => return None,
            TaskStatus::Processing => self.processed_at?,
            TaskStatus::Done | TaskStatus::Failed => self.finished_at?,
        };
        Some(TaskStatusMessage {
            task_id: self.task_id.to_string(),
            status: self.status,
            date_time,
        })
    }
}

/// The message published to the result queue on every status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusMessage {
    pub task_id: String,
    pub status: TaskStatus,
    pub date_time: DateTime<Utc>,
}
