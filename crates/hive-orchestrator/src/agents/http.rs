//! HTTP agent: executes outbound requests described by task input.

use crate::base::AgentCore;
use crate::Agent;
use async_trait::async_trait;
use hive_abstraction::{AgentConfig, AgentError, Task, TaskResult};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::info;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CAPABILITIES: [&str; 4] = ["http_request", "api_call", "webhook", "integration"];

/// Typed configuration extracted from the generic agent config bag.
#[derive(Debug, Clone)]
struct HttpAgentConfig {
    base_url: String,
    headers: HashMap<String, String>,
}

impl HttpAgentConfig {
    fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let base_url = config
            .get_str("base_url")
            .map(str::to_string)
            .ok_or_else(|| AgentError::MissingField {
                kind: config.kind.to_string(),
                field: "base_url".to_string(),
            })?;

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("User-Agent".to_string(), format!("hive-agent/{}", config.version));

        if let Some(custom) = config.config.get("headers").and_then(Value::as_object) {
            for (key, value) in custom {
                if let Some(text) = value.as_str() {
                    headers.insert(key.clone(), text.to_string());
                }
            }
        }

        Ok(Self { base_url, headers })
    }
}

/// Agent that turns task input into one outbound HTTP call.
///
/// Request shape comes from the input bag: `method` (default POST),
/// `endpoint` joined onto the configured base URL, `headers`, `params`,
/// and a JSON `body`. Success mirrors the response status: [200, 300).
pub struct HttpAgent {
    core: AgentCore,
    client: reqwest::Client,
    base_url: String,
    headers: HashMap<String, String>,
}

impl HttpAgent {
    /// Builds an HTTP agent from validated configuration.
    ///
    /// # Errors
    /// Returns an error when `base_url` is missing from the config bag.
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let parsed = HttpAgentConfig::from_config(config)?;

        let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            core: AgentCore::new(config, &CAPABILITIES),
            client,
            base_url: parsed.base_url,
            headers: parsed.headers,
        })
    }

    /// Joins the configured base URL with a task-supplied endpoint.
    fn request_url(&self, task: &Task) -> String {
        let endpoint = task.input.get("endpoint").and_then(Value::as_str).unwrap_or("");
        if endpoint.is_empty() {
            return self.base_url.clone();
        }
        if self.base_url.ends_with('/') || endpoint.starts_with('/') {
            format!("{}{}", self.base_url.trim_end_matches('/'), ensure_leading_slash(endpoint))
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    fn build_request(&self, task: &Task) -> Result<reqwest::RequestBuilder, AgentError> {
        let method_name =
            task.input.get("method").and_then(Value::as_str).unwrap_or("POST");
        let method = reqwest::Method::from_bytes(method_name.to_uppercase().as_bytes())
            .map_err(|e| AgentError::Http(format!("invalid method '{method_name}': {e}")))?;

        let url = self.request_url(task);
        let mut builder = self.client.request(method, url);

        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        if let Some(headers) = task.input.get("headers").and_then(Value::as_object) {
            for (key, value) in headers {
                if let Some(text) = value.as_str() {
                    builder = builder.header(key, text);
                }
            }
        }

        if let Some(params) = task.input.get("params").and_then(Value::as_object) {
            let query: Vec<(String, String)> = params
                .iter()
                .map(|(k, v)| {
                    let rendered = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), rendered)
                })
                .collect();
            builder = builder.query(&query);
        }

        if let Some(body) = task.input.get("body") {
            builder = builder.json(body);
        }

        Ok(builder)
    }
}

fn ensure_leading_slash(endpoint: &str) -> String {
    if endpoint.starts_with('/') {
        endpoint.to_string()
    } else {
        format!("/{endpoint}")
    }
}

#[async_trait]
impl Agent for HttpAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn can_handle(&self, task_type: &str) -> bool {
        matches!(
            task_type,
            "http_request"
                | "api_call"
                | "webhook"
                | "integration"
                | "get"
                | "post"
                | "put"
                | "patch"
                | "delete"
        )
    }

    async fn execute(&self, task: Task) -> TaskResult {
        let start = Instant::now();
        self.core.begin_task(&task).await;

        info!(
            agent_id = %self.core.id(),
            task_id = %task.id,
            task_type = %task.task_type,
            "HTTP agent executing task"
        );

        let url = self.request_url(&task);
        let method = task
            .input
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("POST")
            .to_uppercase();

        let builder = match self.build_request(&task) {
            Ok(builder) => builder,
            Err(e) => {
                let duration = start.elapsed();
                self.core.finish_task(false, duration).await;
                return TaskResult::failure(&task.id, format!("failed to build request: {e}"))
                    .with_duration(duration)
                    .with_metadata("agent_id", json!(self.core.id()))
                    .with_metadata("agent_type", json!(self.core.kind().as_str()));
            }
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let duration = start.elapsed();
                self.core.finish_task(false, duration).await;
                return TaskResult::failure(&task.id, format!("HTTP request failed: {e}"))
                    .with_duration(duration)
                    .with_metadata("agent_id", json!(self.core.id()))
                    .with_metadata("agent_type", json!(self.core.kind().as_str()));
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(text) = value.to_str() {
                headers.insert(key.to_string(), text.to_string());
            }
        }

        let text = response.text().await.unwrap_or_default();
        let body: Value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text))
        };

        let duration = start.elapsed();
        let success = status.is_success();
        self.core.finish_task(success, duration).await;

        let mut output = HashMap::new();
        output.insert("status_code".to_string(), json!(status.as_u16()));
        output.insert("headers".to_string(), json!(headers));
        output.insert("body".to_string(), body);
        output.insert("url".to_string(), json!(url));
        output.insert("method".to_string(), json!(method));

        let mut result = TaskResult {
            task_id: task.id.clone(),
            success,
            output,
            error: None,
            duration,
            metadata: HashMap::new(),
            next_actions: Vec::new(),
        };
        if !success {
            result.error = Some(format!("HTTP {}", status));
        }
        result = result
            .with_metadata("agent_id", json!(self.core.id()))
            .with_metadata("agent_type", json!(self.core.kind().as_str()))
            .with_metadata("content_type", json!(content_type));

        info!(
            agent_id = %self.core.id(),
            task_id = %task.id,
            duration_ms = duration.as_millis() as u64,
            status_code = status.as_u16(),
            success,
            "HTTP agent task completed"
        );

        result
    }
}
