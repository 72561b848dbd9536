//! Shared data model for the Hive agent runtime.
//!
//! This crate defines the records exchanged between the orchestrator, the
//! task manager, and agents: tasks and results, agent configuration and
//! state, metrics, and the shared retry policy. It carries no runtime
//! logic of its own.

pub mod agent;
pub mod async_task;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod task;

pub use agent::{AgentConfig, AgentKind, AgentMetrics, AgentState, AgentStatus};
pub use async_task::{AsyncTask, AsyncTaskStatus, TaskFilters, TaskOutcome};
pub use error::AgentError;
pub use metrics::{AgentActivityMetrics, SystemMetrics, TaskStats, WorkerStats};
pub use retry::{Backoff, RetryPolicy};
pub use task::{Task, TaskResult};
