//! Agent factory: validates configuration and constructs variants.
//!
//! Dispatch is an exhaustive match over [`AgentKind`], so the supported
//! set is closed at compile time. Validation always runs before
//! construction; an invalid config never produces a partially built
//! agent.

use crate::adapters::{AdapterFactory, AdapterRegistry};
use crate::agents::{AdapterAgent, AiAgent, HttpAgent, MockAgent, WorkflowAgent};
use crate::Agent;
use hive_abstraction::{AgentConfig, AgentError, AgentKind};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Stateless constructor and validator for agent variants.
///
/// The factory owns the adapter registry and adapter factory it hands to
/// every adapter agent, so all adapter agents built by one factory share
/// one registry.
pub struct AgentFactory {
    adapter_registry: Arc<AdapterRegistry>,
    adapter_factory: AdapterFactory,
}

impl AgentFactory {
    /// Creates a factory with a fresh adapter registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapter_registry: Arc::new(AdapterRegistry::new()),
            adapter_factory: AdapterFactory::new(),
        }
    }

    /// The adapter registry shared by adapter agents built here.
    #[must_use]
    pub fn adapter_registry(&self) -> Arc<AdapterRegistry> {
        Arc::clone(&self.adapter_registry)
    }

    /// Builds an agent for the given configuration.
    ///
    /// # Errors
    /// Returns an error when variant-specific required fields are missing
    /// or malformed. Callers are expected to run [`Self::validate`] first;
    /// the per-variant constructors re-check what they parse.
    pub fn create(&self, config: &AgentConfig) -> Result<Arc<dyn Agent>, AgentError> {
        debug!(kind = %config.kind, name = %config.name, "Creating agent");

        let agent: Arc<dyn Agent> = match config.kind {
            AgentKind::Ai => Arc::new(AiAgent::new(config)),
            AgentKind::Http => Arc::new(HttpAgent::new(config)?),
            AgentKind::Workflow => Arc::new(WorkflowAgent::new(config)?),
            AgentKind::Adapter => Arc::new(AdapterAgent::new(
                config,
                Arc::clone(&self.adapter_registry),
                self.adapter_factory.clone(),
            )),
            AgentKind::Mock => Arc::new(MockAgent::new(config)),
        };

        Ok(agent)
    }

    /// Checks a configuration without building anything.
    ///
    /// # Errors
    /// Returns an error when the name is empty or a variant-specific
    /// required field is missing or malformed.
    pub fn validate(&self, config: &AgentConfig) -> Result<(), AgentError> {
        if config.name.trim().is_empty() {
            return Err(AgentError::MissingField {
                kind: config.kind.to_string(),
                field: "name".to_string(),
            });
        }

        match config.kind {
            AgentKind::Ai => {
                // A placeholder credential is fine; it selects mock mode
                let has_credential = config.config.contains_key("api_key")
                    || config.config.contains_key("openai_api_key")
                    || config.config.contains_key("vertex_project");
                if !has_credential {
                    return Err(AgentError::MissingField {
                        kind: config.kind.to_string(),
                        field: "api_key".to_string(),
                    });
                }
                Ok(())
            }
            AgentKind::Http => match config.config.get("base_url") {
                Some(Value::String(_)) => Ok(()),
                Some(_) => Err(AgentError::InvalidField {
                    field: "base_url".to_string(),
                    reason: "must be a string".to_string(),
                }),
                None => Err(AgentError::MissingField {
                    kind: config.kind.to_string(),
                    field: "base_url".to_string(),
                }),
            },
            AgentKind::Workflow => match config.config.get("steps") {
                Some(Value::Array(_)) => Ok(()),
                Some(_) => Err(AgentError::InvalidField {
                    field: "steps".to_string(),
                    reason: "must be an array".to_string(),
                }),
                None => Err(AgentError::MissingField {
                    kind: config.kind.to_string(),
                    field: "steps".to_string(),
                }),
            },
            // Adapter agents can provision adapters dynamically and mock
            // agents run on defaults, so neither requires config
            AgentKind::Adapter | AgentKind::Mock => Ok(()),
        }
    }

    /// The kinds this factory can build.
    #[must_use]
    pub fn supported_kinds(&self) -> Vec<AgentKind> {
        AgentKind::all().to_vec()
    }
}

impl Default for AgentFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_config(kind: AgentKind) -> AgentConfig {
        match kind {
            AgentKind::Ai => {
                AgentConfig::new(kind, "assistant").with_entry("api_key", json!("sk-test-key"))
            }
            AgentKind::Http => {
                AgentConfig::new(kind, "caller").with_entry("base_url", json!("https://example.test"))
            }
            AgentKind::Workflow => AgentConfig::new(kind, "flow").with_entry(
                "steps",
                json!([{"type": "log", "config": {"message": "hi"}}]),
            ),
            AgentKind::Adapter => AgentConfig::new(kind, "bridge"),
            AgentKind::Mock => AgentConfig::new(kind, "double"),
        }
    }

    #[tokio::test]
    async fn test_validate_then_create_round_trip() {
        let factory = AgentFactory::new();
        for kind in AgentKind::all() {
            let config = valid_config(kind);
            factory.validate(&config).unwrap();
            let agent = factory.create(&config).unwrap();
            assert_eq!(agent.kind(), kind);
        }
    }

    #[test]
    fn test_empty_name_rejected() {
        let factory = AgentFactory::new();
        let config = AgentConfig::new(AgentKind::Mock, "  ");
        assert!(factory.validate(&config).is_err());
    }

    #[test]
    fn test_ai_requires_a_credential_key() {
        let factory = AgentFactory::new();
        let config = AgentConfig::new(AgentKind::Ai, "assistant");
        assert!(factory.validate(&config).is_err());

        let config = config.with_entry("openai_api_key", json!("sk-test-key"));
        assert!(factory.validate(&config).is_ok());
    }

    #[test]
    fn test_http_base_url_shape() {
        let factory = AgentFactory::new();

        let config = AgentConfig::new(AgentKind::Http, "caller");
        assert!(factory.validate(&config).is_err());

        let config = config.with_entry("base_url", json!(42));
        assert!(factory.validate(&config).is_err());
    }

    #[test]
    fn test_workflow_steps_shape() {
        let factory = AgentFactory::new();

        let config =
            AgentConfig::new(AgentKind::Workflow, "flow").with_entry("steps", json!("not-a-list"));
        assert!(factory.validate(&config).is_err());
    }

    #[test]
    fn test_supported_kinds() {
        let factory = AgentFactory::new();
        assert_eq!(factory.supported_kinds().len(), 5);
    }

    #[tokio::test]
    async fn test_adapter_agents_share_one_registry() {
        let factory = AgentFactory::new();
        let registry = factory.adapter_registry();

        let agent = factory.create(&valid_config(AgentKind::Adapter)).unwrap();
        let task = hive_abstraction::Task::new("create_adapter")
            .with_input("adapter_type", json!("http"))
            .with_input("adapter_name", json!("shared"));
        let result = agent.execute(task).await;

        assert!(result.success);
        assert_eq!(registry.count().await, 1);
    }
}
