//! Aggregate metrics records for the orchestrator and the task manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// System-wide orchestration metrics.
///
/// `active_agents` is recomputed from agent health at read time; the task
/// counters are maintained incrementally as executions finish.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Number of agents ever registered.
    pub total_agents: usize,
    /// Number of currently healthy registered agents.
    pub active_agents: usize,
    /// Total tasks dispatched through the orchestrator.
    pub total_tasks: u64,
    /// Tasks that finished successfully.
    pub completed_tasks: u64,
    /// Tasks that failed.
    pub failed_tasks: u64,
    /// Running mean execution time across all dispatched tasks.
    #[serde(default)]
    pub average_exec_time: Duration,
    /// Time since the orchestrator started.
    #[serde(default)]
    pub uptime: Duration,
}

impl SystemMetrics {
    /// Folds one execution into the counters and the running average.
    pub fn record(&mut self, success: bool, duration: Duration) {
        self.total_tasks += 1;
        if success {
            self.completed_tasks += 1;
        } else {
            self.failed_tasks += 1;
        }

        // total = avg * (n - 1) + d, then divide by n
        let n = u32::try_from(self.total_tasks).unwrap_or(u32::MAX);
        let total = self.average_exec_time * n.saturating_sub(1) + duration;
        self.average_exec_time = total / n;
    }
}

/// Rich per-agent activity metrics tracked by the orchestrator, separate
/// from the metrics each agent keeps for itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentActivityMetrics {
    /// The agent these metrics belong to.
    pub agent_id: String,
    /// Total executions dispatched to this agent.
    pub tasks_executed: u64,
    /// Executions that succeeded.
    pub tasks_successful: u64,
    /// Executions that failed.
    pub tasks_failed: u64,
    /// Number of recorded errors.
    pub error_count: u64,
    /// Two-point rolling average response time after the first sample.
    #[serde(default)]
    pub average_response_time: Duration,
    /// `successful / executed`.
    pub success_rate: f64,
    /// When this agent last executed a task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<DateTime<Utc>>,
    /// When this agent last failed a task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<DateTime<Utc>>,
}

impl AgentActivityMetrics {
    /// Creates an empty record for the given agent.
    #[must_use]
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            tasks_executed: 0,
            tasks_successful: 0,
            tasks_failed: 0,
            error_count: 0,
            average_response_time: Duration::ZERO,
            success_rate: 0.0,
            last_execution: None,
            last_error: None,
        }
    }

    /// Folds one execution into the record.
    pub fn record(&mut self, success: bool, duration: Duration) {
        self.tasks_executed += 1;
        self.last_execution = Some(Utc::now());

        if success {
            self.tasks_successful += 1;
        } else {
            self.tasks_failed += 1;
            self.error_count += 1;
            self.last_error = Some(Utc::now());
        }

        if self.tasks_executed > 0 {
            self.success_rate = self.tasks_successful as f64 / self.tasks_executed as f64;
        }

        // First sample seeds the average; later samples use a simple
        // two-point rolling mean.
        if self.tasks_executed == 1 {
            self.average_response_time = duration;
        } else {
            self.average_response_time = (self.average_response_time + duration) / 2;
        }
    }
}

/// Aggregate task-manager statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskStats {
    /// Total tasks ever submitted.
    pub total_tasks: u64,
    /// Tasks currently pending in the queue.
    pub pending_tasks: u64,
    /// Tasks currently being executed.
    pub running_tasks: u64,
    /// Tasks that completed successfully.
    pub completed_tasks: u64,
    /// Tasks that failed (including queue-full rejections).
    pub failed_tasks: u64,
    /// Tasks cancelled before completion.
    pub cancelled_tasks: u64,
    /// Submission counts keyed by task type.
    #[serde(default)]
    pub tasks_by_type: HashMap<String, u64>,
    /// Two-point rolling average execution time across finished tasks.
    #[serde(default)]
    pub average_time: Duration,
    /// Per-worker statistics keyed by worker ID.
    #[serde(default)]
    pub worker_stats: HashMap<String, WorkerStats>,
    /// When this snapshot was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Statistics for one worker in the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerStats {
    /// Worker ID (`worker-1`, `worker-2`, ...).
    pub id: String,
    /// "idle" or "busy".
    pub status: String,
    /// Tasks this worker has executed.
    pub tasks_executed: u64,
    /// ID of the most recent task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_task: Option<String>,
    /// Timestamp of the last activity.
    pub last_activity: DateTime<Utc>,
    /// Two-point rolling average execution time.
    #[serde(default)]
    pub average_time: Duration,
}

impl WorkerStats {
    /// Creates an idle record for the given worker.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: "idle".to_string(),
            tasks_executed: 0,
            last_task: None,
            last_activity: Utc::now(),
            average_time: Duration::ZERO,
        }
    }

    /// Folds one finished execution into the record.
    pub fn record(&mut self, duration: Duration) {
        self.tasks_executed += 1;
        if self.tasks_executed == 1 {
            self.average_time = duration;
        } else {
            self.average_time = (self.average_time + duration) / 2;
        }
    }
}
