//! Agent registry for managing registered agents.
//!
//! This module provides functionality to register, retrieve, list, and
//! unregister live agents. The orchestrator owns the only instance.

use crate::Agent;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Registry for managing agents, keyed by agent ID.
pub struct AgentRegistry {
    /// Map of agent ID to agent instance.
    agents: Arc<RwLock<HashMap<String, Arc<dyn Agent>>>>,
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agent_count", &self.agents.try_read().map(|a| a.len()).unwrap_or(0))
            .finish_non_exhaustive()
    }
}

impl AgentRegistry {
    /// Creates a new empty agent registry.
    #[must_use]
    pub fn new() -> Self {
        Self { agents: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Registers an agent in the registry.
    ///
    /// # Returns
    /// Returns `true` if the agent was newly registered, `false` if it
    /// replaced an existing agent with the same ID.
    pub async fn register(&self, agent: Arc<dyn Agent>) -> bool {
        let id = agent.id().to_string();

        debug!(agent_id = %id, "Registering agent");

        let mut agents = self.agents.write().await;
        let was_new = !agents.contains_key(&id);
        agents.insert(id.clone(), agent);

        if !was_new {
            warn!(agent_id = %id, "Agent replaced in registry");
        }

        was_new
    }

    /// Retrieves an agent by ID.
    pub async fn get(&self, id: &str) -> Option<Arc<dyn Agent>> {
        let agents = self.agents.read().await;
        agents.get(id).cloned()
    }

    /// Lists all registered agents.
    ///
    /// Scan order is implementation-defined; callers must not rely on it.
    pub async fn list(&self) -> Vec<Arc<dyn Agent>> {
        let agents = self.agents.read().await;
        agents.values().cloned().collect()
    }

    /// Removes an agent from the registry.
    ///
    /// # Returns
    /// Returns `true` if the agent was found and removed.
    pub async fn remove(&self, id: &str) -> bool {
        debug!(agent_id = %id, "Unregistering agent");

        let mut agents = self.agents.write().await;
        let removed = agents.remove(id).is_some();

        if !removed {
            warn!(agent_id = %id, "Attempted to unregister non-existent agent");
        }

        removed
    }

    /// Checks whether an agent is registered.
    pub async fn contains(&self, id: &str) -> bool {
        let agents = self.agents.read().await;
        agents.contains_key(id)
    }

    /// Returns the number of registered agents.
    pub async fn count(&self) -> usize {
        let agents = self.agents.read().await;
        agents.len()
    }

    /// Removes every agent and returns the drained set.
    pub async fn drain(&self) -> Vec<Arc<dyn Agent>> {
        let mut agents = self.agents.write().await;
        agents.drain().map(|(_, agent)| agent).collect()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
