//! Name-keyed registry of live adapters.

use super::Adapter;
use hive_abstraction::AgentError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Registry for managing adapters.
pub struct AdapterRegistry {
    /// Map of adapter name to adapter instance.
    adapters: Arc<RwLock<HashMap<String, Arc<dyn Adapter>>>>,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapter_count", &self.adapters.try_read().map(|a| a.len()).unwrap_or(0))
            .finish_non_exhaustive()
    }
}

impl AdapterRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { adapters: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Registers an adapter under the given name.
    ///
    /// # Errors
    /// Returns `AgentError::AlreadyRegistered` if the name is taken.
    pub async fn register(
        &self,
        name: impl Into<String>,
        adapter: Arc<dyn Adapter>,
    ) -> Result<(), AgentError> {
        let name = name.into();
        let mut adapters = self.adapters.write().await;

        if adapters.contains_key(&name) {
            return Err(AgentError::AlreadyRegistered(name));
        }

        info!(
            name = %name,
            adapter_type = %adapter.adapter_type(),
            version = %adapter.version(),
            "Adapter registered"
        );
        adapters.insert(name, adapter);
        Ok(())
    }

    /// Removes an adapter by name.
    ///
    /// # Errors
    /// Returns `AgentError::AdapterNotFound` for unknown names.
    pub async fn unregister(&self, name: &str) -> Result<(), AgentError> {
        let mut adapters = self.adapters.write().await;
        match adapters.remove(name) {
            Some(adapter) => {
                info!(name = %name, adapter_type = %adapter.adapter_type(), "Adapter unregistered");
                Ok(())
            }
            None => {
                warn!(name = %name, "Attempted to unregister non-existent adapter");
                Err(AgentError::AdapterNotFound(name.to_string()))
            }
        }
    }

    /// Retrieves an adapter by name.
    ///
    /// # Errors
    /// Returns `AgentError::AdapterNotFound` for unknown names.
    pub async fn get(&self, name: &str) -> Result<Arc<dyn Adapter>, AgentError> {
        let adapters = self.adapters.read().await;
        adapters.get(name).cloned().ok_or_else(|| AgentError::AdapterNotFound(name.to_string()))
    }

    /// Lists all registered adapters.
    pub async fn list(&self) -> Vec<Arc<dyn Adapter>> {
        let adapters = self.adapters.read().await;
        adapters.values().cloned().collect()
    }

    /// Returns adapters of the given type.
    pub async fn by_type(&self, adapter_type: &str) -> Vec<Arc<dyn Adapter>> {
        debug!(adapter_type = %adapter_type, "Looking up adapters by type");

        let adapters = self.adapters.read().await;
        adapters.values().filter(|a| a.adapter_type() == adapter_type).cloned().collect()
    }

    /// Returns adapters whose `can_handle` accepts the given operation.
    pub async fn by_capability(&self, operation: &str) -> Vec<Arc<dyn Adapter>> {
        let adapters = self.adapters.read().await;
        adapters.values().filter(|a| a.can_handle(operation)).cloned().collect()
    }

    /// Returns the number of registered adapters.
    pub async fn count(&self) -> usize {
        let adapters = self.adapters.read().await;
        adapters.len()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::HttpAdapter;

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = AdapterRegistry::new();
        let adapter = Arc::new(HttpAdapter::new("http-1", "1.0"));

        registry.register("http-1", adapter).await.unwrap();
        assert_eq!(registry.count().await, 1);

        let retrieved = registry.get("http-1").await.unwrap();
        assert_eq!(retrieved.name(), "http-1");
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = AdapterRegistry::new();
        registry.register("http-1", Arc::new(HttpAdapter::new("http-1", "1.0"))).await.unwrap();

        let result =
            registry.register("http-1", Arc::new(HttpAdapter::new("http-1", "2.0"))).await;
        assert!(matches!(result, Err(AgentError::AlreadyRegistered(_))));
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_unregister() {
        let registry = AdapterRegistry::new();
        registry.register("http-1", Arc::new(HttpAdapter::new("http-1", "1.0"))).await.unwrap();

        registry.unregister("http-1").await.unwrap();
        assert_eq!(registry.count().await, 0);
        assert!(registry.unregister("http-1").await.is_err());
    }

    #[tokio::test]
    async fn test_by_type_and_capability() {
        let registry = AdapterRegistry::new();
        registry.register("http-1", Arc::new(HttpAdapter::new("http-1", "1.0"))).await.unwrap();

        assert_eq!(registry.by_type("http").await.len(), 1);
        assert_eq!(registry.by_type("database").await.len(), 0);
        assert_eq!(registry.by_capability("http_request").await.len(), 1);
        assert_eq!(registry.by_capability("sql_query").await.len(), 0);
    }
}
