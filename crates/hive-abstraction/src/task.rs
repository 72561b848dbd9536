//! Task and result records exchanged between callers, the orchestrator, and
//! agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// A unit of requested work.
///
/// The `task_type` string is what agents match against in
/// `Agent::can_handle`; the `input` bag's semantics are owned by whichever
/// agent variant ends up executing the task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID, caller- or system-assigned.
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
    /// Task-scoped context merged into the executing agent before the call.
    #[serde(default)]
    pub context: HashMap<String, Value>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new task of the given type with a generated ID.
    #[must_use]
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            id: format!("task-{}", uuid::Uuid::new_v4()),
            task_type: task_type.into(),
            description: String::new(),
            input: HashMap::new(),
            priority: 0,
            timeout: None,
            context: HashMap::new(),
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Sets the task ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a single input entry.
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: Value) -> Self {
        self.input.insert(key.into(), value);
        self
    }

    /// Replaces the whole input bag.
    #[must_use]
    pub fn with_inputs(mut self, input: HashMap<String, Value>) -> Self {
        self.input = input;
        self
    }

    /// Sets the advisory priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the execution time bound.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a task-scoped context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}

/// The outcome of one agent execution.
///
/// `success` is the single source of truth for the caller; `error` is
/// present iff the execution failed. A result is never partially
/// successful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// ID of the task this result belongs to.
    pub task_id: String,
    /// Whether the execution succeeded.
    pub success: bool,
    /// Output data produced by the agent.
    #[serde(default)]
    pub output: HashMap<String, Value>,
    /// Failure explanation, present iff `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock execution time.
    #[serde(default)]
    pub duration: Duration,
    /// Free-form metadata (agent id, mode, provider details, ...).
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Optional follow-up actions suggested by the agent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<String>,
}

impl TaskResult {
    /// Creates a successful result with the given output.
    #[must_use]
    pub fn success(task_id: impl Into<String>, output: HashMap<String, Value>) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            output,
            error: None,
            duration: Duration::ZERO,
            metadata: HashMap::new(),
            next_actions: Vec::new(),
        }
    }

    /// Creates a failed result carrying a human-readable explanation.
    #[must_use]
    pub fn failure(task_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            output: HashMap::new(),
            error: Some(error.into()),
            duration: Duration::ZERO,
            metadata: HashMap::new(),
            next_actions: Vec::new(),
        }
    }

    /// Sets the execution duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Replaces the output bag.
    #[must_use]
    pub fn with_output(mut self, output: HashMap<String, Value>) -> Self {
        self.output = output;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_builder() {
        let task = Task::new("http_request")
            .with_id("task-1")
            .with_input("endpoint", json!("/status"))
            .with_priority(3)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(task.id, "task-1");
        assert_eq!(task.task_type, "http_request");
        assert_eq!(task.input.get("endpoint"), Some(&json!("/status")));
        assert_eq!(task.priority, 3);
        assert_eq!(task.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_task_generated_id() {
        let task = Task::new("mock");
        assert!(task.id.starts_with("task-"));
        assert!(task.input.is_empty());
    }

    #[test]
    fn test_result_success() {
        let mut output = HashMap::new();
        output.insert("text".to_string(), json!("hello"));
        let result = TaskResult::success("task-1", output);

        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.output.get("text"), Some(&json!("hello")));
    }

    #[test]
    fn test_result_failure() {
        let result = TaskResult::failure("task-1", "boom");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert!(result.output.is_empty());
    }
}
