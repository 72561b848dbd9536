//! Agent configuration, status, state, and per-agent metrics records.

use crate::error::AgentError;
use crate::task::Task;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The closed set of agent variants.
///
/// Factory dispatch is an exhaustive match over this enum, so adding a new
/// variant is a compile-time-checked change rather than a string branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Provider-backed text generation (with a first-class mock fallback).
    Ai,
    /// Outbound HTTP calls built from task input.
    Http,
    /// Ordered multi-step workflows over a shared data bag.
    Workflow,
    /// Delegation to the adapter registry.
    Adapter,
    /// Test double with configurable latency and failure rate.
    Mock,
}

impl AgentKind {
    /// All supported kinds, in declaration order.
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [Self::Ai, Self::Http, Self::Workflow, Self::Adapter, Self::Mock]
    }

    /// The lowercase wire name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Http => "http",
            Self::Workflow => "workflow",
            Self::Adapter => "adapter",
            Self::Mock => "mock",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai" => Ok(Self::Ai),
            "http" => Ok(Self::Http),
            "workflow" => Ok(Self::Workflow),
            "adapter" => Ok(Self::Adapter),
            "mock" => Ok(Self::Mock),
            other => Err(AgentError::UnsupportedKind(other.to_string())),
        }
    }
}

/// Configuration consumed by the factory to build exactly one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Which variant to build.
    #[serde(rename = "type")]
    pub kind: AgentKind,
    /// Agent name, required and used in the generated agent ID.
    pub name: String,
    /// Configuration version tag.
    #[serde(default)]
    pub version: String,
    /// Variant-specific configuration bag.
    #[serde(default)]
    pub config: HashMap<String, Value>,
    /// Declared capabilities, advisory only. Actual capability is
    /// determined by `Agent::can_handle`.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Timeout applied to the variant's outbound operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl AgentConfig {
    /// Creates a config for the given kind and name.
    #[must_use]
    pub fn new(kind: AgentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            version: "1.0".to_string(),
            config: HashMap::new(),
            capabilities: Vec::new(),
            timeout: None,
        }
    }

    /// Adds a variant-specific config entry.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Sets the operation timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Looks up a string-valued config entry.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    /// Looks up a numeric config entry as f64.
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.config.get(key).and_then(Value::as_f64)
    }
}

/// Possible agent statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Ready to accept a task.
    Idle,
    /// Currently executing a task.
    Busy,
    /// A fault was recorded. Still considered healthy for selection.
    Error,
    /// Stopped. Never selected again.
    Terminated,
}

impl AgentStatus {
    /// Whether an agent in this status is usable.
    ///
    /// Only Idle and Busy count as healthy; Terminated never does. The
    /// Error status is intentionally excluded from the healthy set's
    /// complement check but also not treated as healthy here, matching the
    /// observed runtime which never sets it.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Idle | Self::Busy)
    }
}

/// A snapshot of one agent's live state.
///
/// Invariant: `current_task` is `Some` iff `status == Busy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    /// The agent's unique ID.
    pub id: String,
    /// Current status.
    pub status: AgentStatus,
    /// The task in flight, set only while Busy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<Task>,
    /// Timestamp of the last state change.
    pub last_activity: DateTime<Utc>,
    /// Execution metrics, mutated only by the agent itself.
    pub metrics: AgentMetrics,
    /// Persistent agent-level context, independent of per-task context.
    #[serde(default)]
    pub context: HashMap<String, Value>,
}

impl AgentState {
    /// Creates the initial Idle state for a freshly built agent.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: AgentStatus::Idle,
            current_task: None,
            last_activity: Utc::now(),
            metrics: AgentMetrics::default(),
            context: HashMap::new(),
        }
    }
}

/// Per-agent execution metrics.
///
/// Updated exactly once per `execute` call, after it completes, under the
/// agent's own lock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentMetrics {
    /// Number of successful executions.
    pub tasks_completed: u64,
    /// Number of failed executions.
    pub tasks_failed: u64,
    /// Running mean execution time: `total / (completed + failed)`.
    #[serde(default)]
    pub average_exec_time: Duration,
    /// Sum of all execution times.
    #[serde(default)]
    pub total_exec_time: Duration,
    /// `completed / (completed + failed)`.
    pub success_rate: f64,
    /// Description of the most recent failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl AgentMetrics {
    /// Records the outcome of one execution.
    pub fn record(&mut self, success: bool, duration: Duration) {
        if success {
            self.tasks_completed += 1;
        } else {
            self.tasks_failed += 1;
        }

        self.total_exec_time += duration;
        let total = self.tasks_completed + self.tasks_failed;
        if total > 0 {
            self.average_exec_time = self.total_exec_time / u32::try_from(total).unwrap_or(u32::MAX);
            self.success_rate = self.tasks_completed as f64 / total as f64;
        }

        if !success {
            self.last_error = Some(format!("task failed at {}", Utc::now().to_rfc3339()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in AgentKind::all() {
            assert_eq!(kind.as_str().parse::<AgentKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_kind_unknown() {
        let err = "quantum".parse::<AgentKind>().unwrap_err();
        assert!(err.to_string().contains("quantum"));
    }

    #[test]
    fn test_status_health() {
        assert!(AgentStatus::Idle.is_healthy());
        assert!(AgentStatus::Busy.is_healthy());
        assert!(!AgentStatus::Error.is_healthy());
        assert!(!AgentStatus::Terminated.is_healthy());
    }

    #[test]
    fn test_metrics_running_mean() {
        let mut metrics = AgentMetrics::default();
        metrics.record(true, Duration::from_millis(100));
        metrics.record(false, Duration::from_millis(300));

        assert_eq!(metrics.tasks_completed, 1);
        assert_eq!(metrics.tasks_failed, 1);
        assert_eq!(metrics.average_exec_time, Duration::from_millis(200));
        assert_eq!(metrics.total_exec_time, Duration::from_millis(400));
        assert!((metrics.success_rate - 0.5).abs() < f64::EPSILON);
        assert!(metrics.last_error.is_some());
    }

    #[test]
    fn test_initial_state_idle() {
        let state = AgentState::new("agent-1");
        assert_eq!(state.status, AgentStatus::Idle);
        assert!(state.current_task.is_none());
        assert_eq!(state.metrics.tasks_completed, 0);
    }
}
