//! Records kept by the task manager for asynchronously executed tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Lifecycle states of an asynchronously submitted task.
///
/// A task is created Pending, becomes Running when a worker dequeues it,
/// and reaches exactly one terminal state. Terminal records never change
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AsyncTaskStatus {
    /// Stored and queued, not yet picked up.
    Pending,
    /// A worker is executing it.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with a failure (including queue saturation at submission).
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl AsyncTaskStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for AsyncTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A task wrapped with asynchronous-execution bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncTask {
    /// Unique task ID; assigned at submission if absent.
    #[serde(default)]
    pub id: String,
    /// Type discriminator used for capability matching.
    #[serde(rename = "type")]
    pub task_type: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Input data, interpreted per agent variant.
    #[serde(default)]
    pub input: HashMap<String, Value>,
    /// Advisory priority. Not used for ordering.
    #[serde(default)]
    pub priority: i32,
    /// Optional execution time bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Task-scoped context pushed into the executing agent.
    #[serde(default)]
    pub context: HashMap<String, Value>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Submitting user, if any. Used by list filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Owning bot, if any. Used by list filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
    /// Current lifecycle status.
    pub status: AsyncTaskStatus,
    /// Result summary recorded by the worker.
    #[serde(default)]
    pub result: HashMap<String, Value>,
    /// Failure explanation, if the task did not complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock execution time, once finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<Duration>,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last record mutation.
    pub updated_at: DateTime<Utc>,
    /// When a worker started executing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl AsyncTask {
    /// Creates a new pending task of the given type.
    #[must_use]
    pub fn new(task_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            task_type: task_type.into(),
            description: String::new(),
            input: HashMap::new(),
            priority: 0,
            timeout: None,
            context: HashMap::new(),
            metadata: HashMap::new(),
            user_id: None,
            bot_id: None,
            status: AsyncTaskStatus::Pending,
            result: HashMap::new(),
            error: None,
            execution_time: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Sets the task ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Adds an input entry.
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.input.insert(key.into(), value);
        self
    }

    /// Sets the submitting user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the owning bot.
    #[must_use]
    pub fn with_bot(mut self, bot_id: impl Into<String>) -> Self {
        self.bot_id = Some(bot_id.into());
        self
    }

    /// Sets the execution time bound.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Filters for listing tasks. All fields are conjunctive; pagination is
/// applied after filtering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilters {
    /// Match this status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AsyncTaskStatus>,
    /// Match this task type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    /// Match this submitting user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Match this owning bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
    /// Created at or after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_from: Option<DateTime<Utc>>,
    /// Created at or before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_to: Option<DateTime<Utc>>,
    /// Number of matches to skip.
    #[serde(default)]
    pub offset: usize,
    /// Maximum number of matches to return (0 = unlimited).
    #[serde(default)]
    pub limit: usize,
}

impl TaskFilters {
    /// Whether the given task passes every set filter.
    #[must_use]
    pub fn matches(&self, task: &AsyncTask) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(task_type) = &self.task_type {
            if &task.task_type != task_type {
                return false;
            }
        }
        if let Some(user_id) = &self.user_id {
            if task.user_id.as_ref() != Some(user_id) {
                return false;
            }
        }
        if let Some(bot_id) = &self.bot_id {
            if task.bot_id.as_ref() != Some(bot_id) {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if task.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.created_to {
            if task.created_at > to {
                return false;
            }
        }
        true
    }
}

/// The tracked outcome of one orchestrated execution, as reported back to
/// the task manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// ID of the executed task.
    pub task_id: String,
    /// ID of the agent that ran it.
    pub agent_id: String,
    /// Whether the execution succeeded.
    pub success: bool,
    /// Output data produced by the agent.
    #[serde(default)]
    pub output: HashMap<String, Value>,
    /// Failure explanation, present iff not successful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock execution time.
    pub execution_time: Duration,
    /// When the execution finished.
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!AsyncTaskStatus::Pending.is_terminal());
        assert!(!AsyncTaskStatus::Running.is_terminal());
        assert!(AsyncTaskStatus::Completed.is_terminal());
        assert!(AsyncTaskStatus::Failed.is_terminal());
        assert!(AsyncTaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_filters_match_status_and_type() {
        let task = AsyncTask::new("http_request").with_id("task-1");

        let filters = TaskFilters {
            status: Some(AsyncTaskStatus::Pending),
            task_type: Some("http_request".to_string()),
            ..TaskFilters::default()
        };
        assert!(filters.matches(&task));

        let filters = TaskFilters {
            status: Some(AsyncTaskStatus::Completed),
            ..TaskFilters::default()
        };
        assert!(!filters.matches(&task));
    }

    #[test]
    fn test_filters_match_owner() {
        let task = AsyncTask::new("mock").with_user("user-1").with_bot("bot-1");

        let filters = TaskFilters { user_id: Some("user-1".to_string()), ..TaskFilters::default() };
        assert!(filters.matches(&task));

        let filters = TaskFilters { bot_id: Some("bot-2".to_string()), ..TaskFilters::default() };
        assert!(!filters.matches(&task));
    }
}
