//! HTTP adapter backed by a shared reqwest client.

use super::{Adapter, HttpRequest, HttpResponse};
use async_trait::async_trait;
use hive_abstraction::AgentError;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A reqwest-backed [`Adapter`] serving HTTP-shaped operations.
///
/// The adapter is unhealthy until started; requests against a stopped
/// adapter fail without touching the network.
pub struct HttpAdapter {
    name: String,
    version: String,
    client: reqwest::Client,
    default_headers: RwLock<HashMap<String, String>>,
    timeout: RwLock<Duration>,
    healthy: RwLock<bool>,
}

impl HttpAdapter {
    /// Creates a stopped adapter with the default timeout.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            client: reqwest::Client::new(),
            default_headers: RwLock::new(HashMap::new()),
            timeout: RwLock::new(DEFAULT_TIMEOUT),
            healthy: RwLock::new(false),
        }
    }

    /// Merges the given headers into the defaults applied to every request.
    pub async fn set_default_headers(&self, headers: HashMap<String, String>) {
        let mut guard = self.default_headers.write().await;
        guard.extend(headers);
    }

    /// Replaces the default request timeout.
    pub async fn set_timeout(&self, timeout: Duration) {
        *self.timeout.write().await = timeout;
    }
}

#[async_trait]
impl Adapter for HttpAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn adapter_type(&self) -> &str {
        "http"
    }

    fn version(&self) -> &str {
        &self.version
    }

    async fn initialize(&self, config: &HashMap<String, Value>) -> Result<(), AgentError> {
        if let Some(secs) = config.get("timeout").and_then(Value::as_f64) {
            *self.timeout.write().await = Duration::from_secs_f64(secs.max(0.0));
        }

        let mut headers = self.default_headers.write().await;
        if let Some(defaults) = config.get("default_headers").and_then(Value::as_object) {
            for (key, value) in defaults {
                if let Some(text) = value.as_str() {
                    headers.insert(key.clone(), text.to_string());
                }
            }
        }
        headers
            .entry("User-Agent".to_string())
            .or_insert_with(|| format!("hive-http-adapter/{}", self.version));

        let timeout = *self.timeout.read().await;
        info!(
            name = %self.name,
            timeout = ?timeout,
            default_headers = headers.len(),
            "HTTP adapter initialized"
        );

        Ok(())
    }

    async fn start(&self) -> Result<(), AgentError> {
        *self.healthy.write().await = true;
        info!(name = %self.name, "HTTP adapter started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), AgentError> {
        *self.healthy.write().await = false;
        info!(name = %self.name, "HTTP adapter stopped");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        *self.healthy.read().await
    }

    fn capabilities(&self) -> Vec<String> {
        vec![
            "http_request".to_string(),
            "rest_api".to_string(),
            "webhook".to_string(),
            "json".to_string(),
        ]
    }

    fn can_handle(&self, operation: &str) -> bool {
        if self.capabilities().iter().any(|c| c == operation) {
            return true;
        }
        // HTTP method names count as operations too
        matches!(
            operation.to_uppercase().as_str(),
            "GET" | "POST" | "PUT" | "PATCH" | "DELETE" | "HEAD" | "OPTIONS"
        )
    }

    async fn make_request(&self, request: HttpRequest) -> Result<HttpResponse, AgentError> {
        if !self.is_healthy().await {
            return Err(AgentError::AdapterUnhealthy(self.name.clone()));
        }

        let start = Instant::now();

        let method_name = if request.method.is_empty() { "GET" } else { &request.method };
        let method = reqwest::Method::from_bytes(method_name.to_uppercase().as_bytes())
            .map_err(|e| AgentError::Http(format!("invalid method '{method_name}': {e}")))?;

        let timeout = request.timeout.unwrap_or(*self.timeout.read().await);
        let mut builder = self.client.request(method.clone(), &request.url).timeout(timeout);

        for (key, value) in self.default_headers.read().await.iter() {
            builder = builder.header(key, value);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        if !request.params.is_empty() {
            let query: Vec<(String, String)> = request
                .params
                .iter()
                .map(|(k, v)| (k.clone(), stringify_param(v)))
                .collect();
            builder = builder.query(&query);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        info!(
            name = %self.name,
            method = %method,
            url = %request.url,
            "Making HTTP request"
        );

        let response = builder.send().await.map_err(|e| {
            error!(
                name = %self.name,
                method = %method,
                url = %request.url,
                error = %e,
                "HTTP request failed"
            );
            AgentError::Http(e.to_string())
        })?;

        let status = response.status();
        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(text) = value.to_str() {
                headers.insert(key.to_string(), text.to_string());
            }
        }

        let text = response.text().await.map_err(|e| AgentError::Http(e.to_string()))?;
        let body = decode_body(&text);

        let duration = start.elapsed();
        let success = status.is_success();

        info!(
            name = %self.name,
            method = %method,
            url = %request.url,
            status_code = status.as_u16(),
            duration_ms = duration.as_millis() as u64,
            success,
            "HTTP request completed"
        );

        Ok(HttpResponse {
            status_code: status.as_u16(),
            headers,
            body,
            duration,
            success,
            error: if success { None } else { Some(format!("HTTP {}", status)) },
        })
    }
}

/// Decodes a response body as JSON, falling back to the raw text.
fn decode_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Renders a query-parameter value without JSON string quoting.
fn stringify_param(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
