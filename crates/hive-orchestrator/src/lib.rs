//! Agent orchestration runtime for Hive.
//!
//! This crate defines the core agent trait, the factory that builds agent
//! variants from configuration, the orchestrator that selects and runs
//! agents for tasks, and the task manager that executes submitted tasks
//! asynchronously on a bounded worker pool.

pub mod adapters;
pub mod agents;
pub mod base;
pub mod error;
pub mod factory;
pub mod registry;
pub mod task_manager;

use async_trait::async_trait;
use hive_abstraction::{
    AgentActivityMetrics, AgentConfig, AgentKind, AgentMetrics, AgentState, AgentStatus,
    SystemMetrics, Task, TaskResult,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

pub use agents::{AdapterAgent, AiAgent, HttpAgent, MockAgent, WorkflowAgent};
pub use base::AgentCore;
pub use error::{OrchestratorError, Result, TaskManagerError};
pub use factory::AgentFactory;
pub use registry::AgentRegistry;
pub use task_manager::TaskManager;

// Re-export the shared data model so callers only need one crate.
pub use hive_abstraction::AgentError;

/// A trait that defines the interface for any task-executing agent.
///
/// Variants supply their state through [`AgentCore`] and only implement
/// `can_handle` and `execute`; everything else is provided by delegation.
#[async_trait]
pub trait Agent: Send + Sync {
    /// The shared state core backing this agent.
    fn core(&self) -> &AgentCore;

    /// Whether this agent can execute tasks of the given type.
    ///
    /// Pure predicate, no side effects.
    fn can_handle(&self, task_type: &str) -> bool;

    /// Executes the task and reports the outcome.
    ///
    /// Failures are expressed in the returned result (`success == false`,
    /// `error` populated); execution never panics the caller. The agent
    /// transitions Busy → Idle around the call and records its metrics
    /// exactly once, including early-exit failure paths.
    async fn execute(&self, task: Task) -> TaskResult;

    /// Returns the unique ID of the agent.
    fn id(&self) -> &str {
        self.core().id()
    }

    /// Returns the agent's variant kind.
    fn kind(&self) -> AgentKind {
        self.core().kind()
    }

    /// Returns a copy of the agent's capability list.
    fn capabilities(&self) -> Vec<String> {
        self.core().capabilities()
    }

    /// Returns a deep copy of the agent's current state.
    async fn state(&self) -> AgentState {
        self.core().state().await
    }

    /// Replaces the agent's state wholesale.
    async fn update_state(&self, state: AgentState) {
        self.core().update_state(state).await;
    }

    /// Replaces the agent's persistent context with the given map.
    async fn set_context(&self, context: HashMap<String, Value>) {
        self.core().set_context(context).await;
    }

    /// Returns a deep copy of the agent's persistent context.
    async fn context(&self) -> HashMap<String, Value> {
        self.core().context().await
    }

    /// Starts the agent (transitions to Idle).
    async fn start(&self) -> std::result::Result<(), AgentError> {
        self.core().start().await;
        Ok(())
    }

    /// Stops the agent (transitions to Terminated).
    async fn stop(&self) -> std::result::Result<(), AgentError> {
        self.core().stop().await;
        Ok(())
    }

    /// Whether the agent is usable: true for Idle and Busy, false for
    /// Terminated.
    async fn is_healthy(&self) -> bool {
        self.core().is_healthy().await
    }

    /// The agent's current status.
    async fn status(&self) -> AgentStatus {
        self.core().status().await
    }
}

/// Registry owner and task dispatcher.
///
/// The orchestrator validates and instantiates agents, selects a suitable
/// idle agent per task, shares context between agents, and aggregates
/// system-wide and per-agent metrics.
pub struct Orchestrator {
    /// Registry of live agents.
    registry: Arc<AgentRegistry>,
    /// Factory used by `instantiate`.
    factory: AgentFactory,
    /// Incrementally maintained system counters.
    metrics: RwLock<SystemMetrics>,
    /// Rich per-agent activity metrics, keyed by agent ID.
    activity: RwLock<HashMap<String, AgentActivityMetrics>>,
    /// When the orchestrator started.
    started_at: RwLock<Instant>,
}

impl Orchestrator {
    /// Creates a new orchestrator with a fresh factory and registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_factory(AgentFactory::new())
    }

    /// Creates a new orchestrator around an existing factory.
    #[must_use]
    pub fn with_factory(factory: AgentFactory) -> Self {
        Self {
            registry: Arc::new(AgentRegistry::new()),
            factory,
            metrics: RwLock::new(SystemMetrics::default()),
            activity: RwLock::new(HashMap::new()),
            started_at: RwLock::new(Instant::now()),
        }
    }

    /// Validates, builds, starts, and registers an agent.
    ///
    /// On any failure nothing is registered: the agent either ends up
    /// fully started in the registry or not present at all.
    ///
    /// # Errors
    /// Returns a validation error for bad config, or `AgentStart` when the
    /// built agent refuses to start.
    pub async fn instantiate(&self, config: &AgentConfig) -> Result<Arc<dyn Agent>> {
        self.factory.validate(config)?;
        let agent = self.factory.create(config)?;

        if let Err(e) = agent.start().await {
            return Err(OrchestratorError::AgentStart {
                agent_id: agent.id().to_string(),
                reason: e.to_string(),
            });
        }

        self.registry.register(Arc::clone(&agent)).await;
        {
            let mut metrics = self.metrics.write().await;
            metrics.total_agents += 1;
        }

        info!(
            agent_id = %agent.id(),
            kind = %agent.kind(),
            capabilities = ?agent.capabilities(),
            "Agent instantiated"
        );

        Ok(agent)
    }

    /// Stops and removes an agent.
    ///
    /// The stop is best-effort: a stop failure is logged but does not keep
    /// the agent registered.
    ///
    /// # Errors
    /// Returns `AgentNotFound` for unknown IDs.
    pub async fn terminate(&self, agent_id: &str) -> Result<()> {
        let agent = self.get_agent(agent_id).await?;

        if let Err(e) = agent.stop().await {
            error!(agent_id = %agent_id, error = %e, "Failed to stop agent gracefully");
        }

        self.registry.remove(agent_id).await;
        info!(agent_id = %agent_id, "Agent terminated");
        Ok(())
    }

    /// Retrieves an agent by ID.
    ///
    /// # Errors
    /// Returns `AgentNotFound` for unknown IDs.
    pub async fn get_agent(&self, agent_id: &str) -> Result<Arc<dyn Agent>> {
        self.registry
            .get(agent_id)
            .await
            .ok_or_else(|| OrchestratorError::AgentNotFound(agent_id.to_string()))
    }

    /// Lists all registered agents.
    pub async fn list_agents(&self) -> Vec<Arc<dyn Agent>> {
        self.registry.list().await
    }

    /// Returns the number of registered agents.
    pub async fn agent_count(&self) -> usize {
        self.registry.count().await
    }

    /// The agent kinds the underlying factory supports.
    #[must_use]
    pub fn supported_kinds(&self) -> Vec<AgentKind> {
        self.factory.supported_kinds()
    }

    /// Picks the first registered agent that can handle the task type, is
    /// healthy, and is currently idle.
    ///
    /// Linear scan in implementation-defined order; Busy agents are never
    /// selected, which gives per-agent mutual exclusion.
    async fn select_agent(&self, task_type: &str) -> Option<Arc<dyn Agent>> {
        for agent in self.registry.list().await {
            if agent.can_handle(task_type)
                && agent.is_healthy().await
                && agent.status().await == AgentStatus::Idle
            {
                return Some(agent);
            }
        }
        None
    }

    /// Runs the task on the agent, bounding it with the task's timeout,
    /// and folds the outcome into system and per-agent metrics.
    async fn execute_on_agent(&self, agent: Arc<dyn Agent>, task: Task) -> TaskResult {
        let task_id = task.id.clone();
        let start = Instant::now();

        let result = match task.timeout {
            Some(timeout) => {
                // Run on a detached task so an elapsed timeout does not
                // abort the agent mid-flight; the agent finishes in the
                // background and returns itself to Idle.
                let agent_clone = Arc::clone(&agent);
                let handle = tokio::spawn(async move { agent_clone.execute(task).await });
                match tokio::time::timeout(timeout, handle).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(join_error)) => {
                        TaskResult::failure(&task_id, format!("execution aborted: {join_error}"))
                    }
                    Err(_) => TaskResult::failure(
                        &task_id,
                        format!("task timed out after {}ms", timeout.as_millis()),
                    ),
                }
            }
            None => agent.execute(task).await,
        };

        let duration = start.elapsed();

        {
            let mut metrics = self.metrics.write().await;
            metrics.record(result.success, duration);
        }
        {
            let mut activity = self.activity.write().await;
            activity
                .entry(agent.id().to_string())
                .or_insert_with(|| AgentActivityMetrics::new(agent.id()))
                .record(result.success, duration);
        }

        result
    }

    /// Executes a task on the most appropriate agent.
    ///
    /// There is no queueing or waiting at this layer: when no registered
    /// agent is idle, healthy, and capable, the call fails immediately.
    ///
    /// # Errors
    /// Returns `NoSuitableAgent` when selection finds nothing.
    pub async fn execute_task(&self, task: Task) -> Result<TaskResult> {
        let Some(agent) = self.select_agent(&task.task_type).await else {
            warn!(
                task_id = %task.id,
                task_type = %task.task_type,
                "No suitable agent available"
            );
            return Err(OrchestratorError::NoSuitableAgent { task_type: task.task_type });
        };

        info!(
            task_id = %task.id,
            task_type = %task.task_type,
            agent_id = %agent.id(),
            "Executing task"
        );

        let result = self.execute_on_agent(Arc::clone(&agent), task).await;

        info!(
            task_id = %result.task_id,
            agent_id = %agent.id(),
            duration_ms = result.duration.as_millis() as u64,
            success = result.success,
            "Task completed"
        );

        Ok(result)
    }

    /// Executes a task and reports a tracked outcome, pushing the task's
    /// context into the selected agent first.
    ///
    /// This is the entry point the task manager's workers use.
    ///
    /// # Errors
    /// Returns `NoSuitableAgent` when selection finds nothing.
    pub async fn execute_task_tracked(
        &self,
        task: Task,
    ) -> Result<hive_abstraction::TaskOutcome> {
        let Some(agent) = self.select_agent(&task.task_type).await else {
            warn!(
                task_id = %task.id,
                task_type = %task.task_type,
                "No suitable agent available"
            );
            return Err(OrchestratorError::NoSuitableAgent { task_type: task.task_type });
        };

        if !task.context.is_empty() {
            agent.set_context(task.context.clone()).await;
        }

        debug!(
            task_id = %task.id,
            task_type = %task.task_type,
            agent_id = %agent.id(),
            "Executing tracked task"
        );

        let agent_id = agent.id().to_string();
        let result = self.execute_on_agent(Arc::clone(&agent), task).await;

        Ok(hive_abstraction::TaskOutcome {
            task_id: result.task_id,
            agent_id,
            success: result.success,
            output: result.output,
            error: result.error,
            execution_time: result.duration,
            completed_at: chrono::Utc::now(),
        })
    }

    /// Coordinates a task across an explicit set of agents.
    ///
    /// A single agent is used directly; for multiple agents the first
    /// healthy capable one wins. This is a deliberately simple fallback,
    /// not a consensus protocol.
    ///
    /// # Errors
    /// Returns `NoAgentsProvided` for an empty set and `NoSuitableAgent`
    /// when none of the given agents is usable.
    pub async fn coordinate_agents(
        &self,
        agents: &[Arc<dyn Agent>],
        task: Task,
    ) -> Result<TaskResult> {
        if agents.is_empty() {
            return Err(OrchestratorError::NoAgentsProvided);
        }

        if agents.len() == 1 {
            return Ok(agents[0].execute(task).await);
        }

        info!(task_id = %task.id, agent_count = agents.len(), "Coordinating multiple agents");

        for agent in agents {
            if agent.is_healthy().await && agent.can_handle(&task.task_type) {
                return Ok(agent.execute(task).await);
            }
        }

        Err(OrchestratorError::NoSuitableAgent { task_type: task.task_type })
    }

    /// Replaces an agent's context with the given map (not a merge).
    ///
    /// # Errors
    /// Returns `AgentNotFound` for unknown IDs.
    pub async fn pass_context(
        &self,
        agent_id: &str,
        context: HashMap<String, Value>,
    ) -> Result<()> {
        let agent = self.get_agent(agent_id).await?;
        let keys: Vec<&String> = context.keys().collect();

        agent.set_context(context.clone()).await;

        info!(agent_id = %agent_id, context_keys = ?keys, "Context passed to agent");
        Ok(())
    }

    /// Projects the listed keys out of one agent's context and replaces
    /// another agent's context with that projection.
    ///
    /// The target's previous context is discarded; callers that want to
    /// preserve other keys must include them in `keys`. The source agent
    /// is unchanged.
    ///
    /// # Errors
    /// Returns `AgentNotFound` when either agent is unknown.
    pub async fn share_context(
        &self,
        from_agent_id: &str,
        to_agent_id: &str,
        keys: &[String],
    ) -> Result<()> {
        let from_agent = self.get_agent(from_agent_id).await?;
        let to_agent = self.get_agent(to_agent_id).await?;

        let from_context = from_agent.context().await;
        let mut shared = HashMap::new();
        for key in keys {
            if let Some(value) = from_context.get(key) {
                shared.insert(key.clone(), value.clone());
            }
        }

        to_agent.set_context(shared).await;

        info!(
            from_agent = %from_agent_id,
            to_agent = %to_agent_id,
            shared_keys = ?keys,
            "Context shared between agents"
        );
        Ok(())
    }

    /// Returns the metrics an agent keeps about itself.
    ///
    /// # Errors
    /// Returns `AgentNotFound` for unknown IDs.
    pub async fn agent_metrics(&self, agent_id: &str) -> Result<AgentMetrics> {
        let agent = self.get_agent(agent_id).await?;
        Ok(agent.state().await.metrics)
    }

    /// Returns the orchestrator's activity record for an agent.
    ///
    /// Agents that have not executed anything yet get an empty record.
    ///
    /// # Errors
    /// Returns `AgentNotFound` for unknown IDs.
    pub async fn agent_activity(&self, agent_id: &str) -> Result<AgentActivityMetrics> {
        if !self.registry.contains(agent_id).await {
            return Err(OrchestratorError::AgentNotFound(agent_id.to_string()));
        }

        let activity = self.activity.read().await;
        Ok(activity
            .get(agent_id)
            .cloned()
            .unwrap_or_else(|| AgentActivityMetrics::new(agent_id)))
    }

    /// Returns a snapshot of system-wide metrics.
    ///
    /// `active_agents` is recomputed from agent health at read time.
    pub async fn system_metrics(&self) -> SystemMetrics {
        let mut snapshot = self.metrics.read().await.clone();
        snapshot.uptime = self.started_at.read().await.elapsed();

        let mut active = 0;
        for agent in self.registry.list().await {
            if agent.is_healthy().await {
                active += 1;
            }
        }
        snapshot.active_agents = active;

        snapshot
    }

    /// Marks the orchestrator started.
    pub async fn start(&self) {
        info!("Starting orchestrator");
        *self.started_at.write().await = Instant::now();
    }

    /// Stops every registered agent (best-effort) and clears the registry.
    pub async fn stop(&self) {
        info!("Stopping orchestrator");

        for agent in self.registry.drain().await {
            if let Err(e) = agent.stop().await {
                error!(agent_id = %agent.id(), error = %e, "Failed to stop agent");
            }
        }

        info!("Orchestrator stopped");
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}
