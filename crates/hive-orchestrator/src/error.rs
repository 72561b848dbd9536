// Error types for orchestration and task management

use hive_abstraction::{AgentError, AsyncTaskStatus};
use thiserror::Error;

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Orchestration errors
///
/// These are the hard errors of the runtime: configuration and registry
/// faults that surface to the immediate caller. Execution failures never
/// appear here; they are reported through `TaskResult`.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Agent configuration was rejected before construction
    #[error("invalid agent config: {0}")]
    Validation(#[from] AgentError),

    /// No agent with the given ID is registered
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    /// No registered agent is idle, healthy, and capable of the task type
    #[error("no suitable agent found for task type: {task_type}")]
    NoSuitableAgent {
        /// The task type that could not be matched
        task_type: String,
    },

    /// The agent was built but refused to start
    #[error("failed to start agent '{agent_id}': {reason}")]
    AgentStart {
        /// The agent that failed to start
        agent_id: String,
        /// The underlying failure
        reason: String,
    },

    /// No agents were provided for coordination
    #[error("no agents provided for coordination")]
    NoAgentsProvided,
}

/// Task manager errors
#[derive(Debug, Error)]
pub enum TaskManagerError {
    /// Start was called twice
    #[error("task manager already started")]
    AlreadyStarted,

    /// An operation requiring workers was attempted before start
    #[error("task manager not started")]
    NotStarted,

    /// The bounded queue had no room; the task was recorded as failed
    #[error("task queue is full")]
    QueueFull,

    /// No task with the given ID exists
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// The task is already terminal and cannot be cancelled
    #[error("cannot cancel task in {status} state")]
    InvalidCancel {
        /// The status that made the cancel illegal
        status: AsyncTaskStatus,
    },
}
