//! Shared state core embedded by every agent variant.
//!
//! The core owns identity, status, metrics, and the persistent context
//! bag. Variants differ only in how they execute tasks; everything else
//! delegates here.

use chrono::Utc;
use hive_abstraction::{AgentConfig, AgentKind, AgentState, AgentStatus, Task};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Identity and synchronized state shared by all agent variants.
///
/// State mutations go through the internal lock so that `state`/`context`
/// reads from the orchestrator can race safely with an in-flight execute.
/// All accessors return deep, independent copies.
pub struct AgentCore {
    id: String,
    kind: AgentKind,
    name: String,
    version: String,
    capabilities: Vec<String>,
    state: RwLock<AgentState>,
}

impl AgentCore {
    /// Builds a core from validated configuration.
    ///
    /// Declared capabilities from the config are advisory; when the config
    /// declares none, the variant's defaults apply.
    #[must_use]
    pub fn new(config: &AgentConfig, default_capabilities: &[&str]) -> Self {
        let id = format!("{}-{}-{}", config.kind, config.name, uuid::Uuid::new_v4());
        let capabilities = if config.capabilities.is_empty() {
            default_capabilities.iter().map(|c| (*c).to_string()).collect()
        } else {
            config.capabilities.clone()
        };

        Self {
            id: id.clone(),
            kind: config.kind,
            name: config.name.clone(),
            version: config.version.clone(),
            capabilities,
            state: RwLock::new(AgentState::new(id)),
        }
    }

    /// The agent's unique ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The agent's variant kind.
    #[must_use]
    pub const fn kind(&self) -> AgentKind {
        self.kind
    }

    /// The configured agent name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configuration version tag.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// A copy of the capability list.
    #[must_use]
    pub fn capabilities(&self) -> Vec<String> {
        self.capabilities.clone()
    }

    /// A deep copy of the current state.
    pub async fn state(&self) -> AgentState {
        self.state.read().await.clone()
    }

    /// Replaces the state wholesale, stamping the activity time.
    pub async fn update_state(&self, state: AgentState) {
        let mut guard = self.state.write().await;
        *guard = state;
        guard.last_activity = Utc::now();
    }

    /// Replaces the persistent context with the given map.
    pub async fn set_context(&self, context: HashMap<String, Value>) {
        let mut guard = self.state.write().await;
        let keys: Vec<&String> = context.keys().collect();
        debug!(agent_id = %self.id, context_keys = ?keys, "Context updated for agent");
        guard.context = context;
        guard.last_activity = Utc::now();
    }

    /// A deep copy of the persistent context.
    pub async fn context(&self) -> HashMap<String, Value> {
        self.state.read().await.context.clone()
    }

    /// Marks the agent Busy with the given task in flight.
    pub async fn begin_task(&self, task: &Task) {
        let mut guard = self.state.write().await;
        guard.status = AgentStatus::Busy;
        guard.current_task = Some(task.clone());
        guard.last_activity = Utc::now();
    }

    /// Marks the agent Idle again and records the execution outcome.
    ///
    /// Called exactly once per execute, including early-exit failure paths.
    pub async fn finish_task(&self, success: bool, duration: Duration) {
        let mut guard = self.state.write().await;
        guard.status = AgentStatus::Idle;
        guard.current_task = None;
        guard.metrics.record(success, duration);
        guard.last_activity = Utc::now();
    }

    /// Transitions to Idle and stamps the start.
    pub async fn start(&self) {
        let mut guard = self.state.write().await;
        guard.status = AgentStatus::Idle;
        guard.last_activity = Utc::now();

        info!(agent_id = %self.id, kind = %self.kind, name = %self.name, "Agent started");
    }

    /// Transitions to Terminated and clears any in-flight task reference.
    pub async fn stop(&self) {
        let mut guard = self.state.write().await;
        guard.status = AgentStatus::Terminated;
        guard.current_task = None;
        guard.last_activity = Utc::now();

        info!(agent_id = %self.id, kind = %self.kind, "Agent stopped");
    }

    /// Whether the agent is usable: Idle or Busy, never Terminated.
    pub async fn is_healthy(&self) -> bool {
        self.state.read().await.status.is_healthy()
    }

    /// The current status without copying the whole state.
    pub async fn status(&self) -> AgentStatus {
        self.state.read().await.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> AgentConfig {
        AgentConfig::new(AgentKind::Mock, "test")
    }

    #[tokio::test]
    async fn test_core_identity() {
        let core = AgentCore::new(&config(), &["mock", "test"]);
        assert!(core.id().starts_with("mock-test-"));
        assert_eq!(core.kind(), AgentKind::Mock);
        assert_eq!(core.capabilities(), vec!["mock", "test"]);
    }

    #[tokio::test]
    async fn test_declared_capabilities_override_defaults() {
        let mut cfg = config();
        cfg.capabilities = vec!["custom".to_string()];
        let core = AgentCore::new(&cfg, &["mock"]);
        assert_eq!(core.capabilities(), vec!["custom"]);
    }

    #[tokio::test]
    async fn test_busy_idle_cycle() {
        let core = AgentCore::new(&config(), &[]);
        let task = Task::new("mock").with_id("task-1");

        core.begin_task(&task).await;
        let state = core.state().await;
        assert_eq!(state.status, AgentStatus::Busy);
        assert_eq!(state.current_task.as_ref().map(|t| t.id.as_str()), Some("task-1"));

        core.finish_task(true, Duration::from_millis(10)).await;
        let state = core.state().await;
        assert_eq!(state.status, AgentStatus::Idle);
        assert!(state.current_task.is_none());
        assert_eq!(state.metrics.tasks_completed, 1);
    }

    #[tokio::test]
    async fn test_context_is_replaced_not_merged() {
        let core = AgentCore::new(&config(), &[]);

        let mut first = HashMap::new();
        first.insert("lang".to_string(), json!("es"));
        first.insert("tz".to_string(), json!("UTC"));
        core.set_context(first).await;

        let mut second = HashMap::new();
        second.insert("lang".to_string(), json!("en"));
        core.set_context(second).await;

        let ctx = core.context().await;
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.get("lang"), Some(&json!("en")));
    }

    #[tokio::test]
    async fn test_context_copies_are_independent() {
        let core = AgentCore::new(&config(), &[]);
        let mut ctx = HashMap::new();
        ctx.insert("key".to_string(), json!("value"));
        core.set_context(ctx).await;

        let mut copy = core.context().await;
        copy.insert("other".to_string(), json!(1));

        assert_eq!(core.context().await.len(), 1);
    }

    #[tokio::test]
    async fn test_stop_terminates() {
        let core = AgentCore::new(&config(), &[]);
        assert!(core.is_healthy().await);

        core.stop().await;
        assert!(!core.is_healthy().await);
        assert_eq!(core.status().await, AgentStatus::Terminated);
    }
}
