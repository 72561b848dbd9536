//! Interoperability adapters consumed by the adapter agent.
//!
//! An adapter is an externally-registerable transport capability. The
//! runtime only depends on the boundary below: identity, lifecycle,
//! health, capability matching, and one HTTP-shaped request operation.

pub mod http;
pub mod registry;

use async_trait::async_trait;
use hive_abstraction::AgentError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub use http::HttpAdapter;
pub use registry::AdapterRegistry;

/// An HTTP-shaped request handed to an adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpRequest {
    /// HTTP method name. Defaults to GET when empty.
    #[serde(default)]
    pub method: String,
    /// Absolute request URL.
    #[serde(default)]
    pub url: String,
    /// Request headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Optional JSON body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Per-request timeout override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Query parameters.
    #[serde(default)]
    pub params: HashMap<String, Value>,
}

/// The adapter's response to one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// JSON-decoded body, or the raw text as a JSON string.
    pub body: Value,
    /// Wall-clock request time.
    pub duration: Duration,
    /// Whether the status code was in [200, 300).
    pub success: bool,
    /// Failure explanation for non-2xx responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The boundary the runtime requires from any adapter implementation.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns the adapter's registered name.
    fn name(&self) -> &str;

    /// Returns the adapter type (e.g. "http").
    fn adapter_type(&self) -> &str;

    /// Returns the adapter version.
    fn version(&self) -> &str;

    /// Applies configuration before the adapter is started.
    async fn initialize(&self, config: &HashMap<String, Value>) -> Result<(), AgentError>;

    /// Marks the adapter ready to serve requests.
    async fn start(&self) -> Result<(), AgentError>;

    /// Takes the adapter out of service.
    async fn stop(&self) -> Result<(), AgentError>;

    /// Whether the adapter is currently serving requests.
    async fn is_healthy(&self) -> bool;

    /// Returns a copy of the capability list.
    fn capabilities(&self) -> Vec<String>;

    /// Whether this adapter can serve the given operation.
    fn can_handle(&self, operation: &str) -> bool;

    /// Executes one request.
    ///
    /// # Errors
    /// Returns an error for an unhealthy adapter or a transport failure.
    /// Non-2xx responses are not errors; they come back as a response with
    /// `success == false`.
    async fn make_request(&self, request: HttpRequest) -> Result<HttpResponse, AgentError>;
}

/// Creates and validates adapters by type.
///
/// The supported set is closed; the runtime only ships an HTTP adapter.
#[derive(Debug, Clone, Default)]
pub struct AdapterFactory;

impl AdapterFactory {
    /// Creates a new factory.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Creates an adapter of the given type.
    ///
    /// # Errors
    /// Returns `AgentError::UnsupportedKind` for unknown types.
    pub fn create(
        &self,
        adapter_type: &str,
        config: &HashMap<String, Value>,
    ) -> Result<Arc<dyn Adapter>, AgentError> {
        match adapter_type {
            "http" => {
                let name = config
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("default-http-adapter")
                    .to_string();
                let version =
                    config.get("version").and_then(Value::as_str).unwrap_or("1.0").to_string();
                Ok(Arc::new(HttpAdapter::new(name, version)))
            }
            other => Err(AgentError::UnsupportedKind(other.to_string())),
        }
    }

    /// Validates adapter configuration for the given type.
    ///
    /// # Errors
    /// Returns an error for unknown types or malformed optional fields.
    pub fn validate(
        &self,
        adapter_type: &str,
        config: &HashMap<String, Value>,
    ) -> Result<(), AgentError> {
        match adapter_type {
            "http" => {
                if let Some(timeout) = config.get("timeout") {
                    if !timeout.is_number() {
                        return Err(AgentError::InvalidField {
                            field: "timeout".to_string(),
                            reason: "must be a number of seconds".to_string(),
                        });
                    }
                }
                if let Some(headers) = config.get("default_headers") {
                    if !headers.is_object() {
                        return Err(AgentError::InvalidField {
                            field: "default_headers".to_string(),
                            reason: "must be an object".to_string(),
                        });
                    }
                }
                Ok(())
            }
            other => Err(AgentError::UnsupportedKind(other.to_string())),
        }
    }

    /// The adapter types this factory can build.
    #[must_use]
    pub fn supported_types(&self) -> Vec<&'static str> {
        vec!["http"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_factory_creates_http_adapter() {
        let factory = AdapterFactory::new();
        let mut config = HashMap::new();
        config.insert("name".to_string(), json!("my-adapter"));

        let adapter = factory.create("http", &config).unwrap();
        assert_eq!(adapter.name(), "my-adapter");
        assert_eq!(adapter.adapter_type(), "http");
    }

    #[test]
    fn test_factory_rejects_unknown_type() {
        let factory = AdapterFactory::new();
        let result = factory.create("carrier-pigeon", &HashMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_timeout_shape() {
        let factory = AdapterFactory::new();

        let mut config = HashMap::new();
        config.insert("timeout".to_string(), json!(30));
        assert!(factory.validate("http", &config).is_ok());

        config.insert("timeout".to_string(), json!("soon"));
        assert!(factory.validate("http", &config).is_err());
    }
}
