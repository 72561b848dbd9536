//! Adapter agent: delegates work to registered adapters instead of
//! talking to the network itself, and exposes meta-operations for
//! introspecting the adapter registry.

use crate::adapters::{Adapter, AdapterFactory, AdapterRegistry, HttpRequest};
use crate::base::AgentCore;
use crate::Agent;
use async_trait::async_trait;
use hive_abstraction::{AgentConfig, AgentError, Task, TaskResult};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

const CAPABILITIES: [&str; 7] = [
    "http_request",
    "api_call",
    "webhook",
    "integration",
    "create_adapter",
    "list_adapters",
    "adapter_health",
];

const DYNAMIC_HTTP_ADAPTER: &str = "dynamic-http-adapter";

/// Agent that routes tasks through the adapter registry.
pub struct AdapterAgent {
    core: AgentCore,
    registry: Arc<AdapterRegistry>,
    factory: AdapterFactory,
}

impl AdapterAgent {
    /// Builds an adapter agent sharing the given registry and factory.
    #[must_use]
    pub fn new(
        config: &AgentConfig,
        registry: Arc<AdapterRegistry>,
        factory: AdapterFactory,
    ) -> Self {
        Self { core: AgentCore::new(config, &CAPABILITIES), registry, factory }
    }

    /// Finds an HTTP adapter, provisioning one on demand when the registry
    /// has none.
    async fn http_adapter(&self) -> Result<Arc<dyn Adapter>, AgentError> {
        let existing = self.registry.by_type("http").await;
        if let Some(adapter) = existing.into_iter().next() {
            return Ok(adapter);
        }

        info!(agent_id = %self.core.id(), "No HTTP adapter registered, provisioning one");

        let mut config = HashMap::new();
        config.insert("name".to_string(), json!(DYNAMIC_HTTP_ADAPTER));
        config.insert("version".to_string(), json!("1.0"));

        let adapter = self.factory.create("http", &config)?;
        adapter.initialize(&config).await?;
        adapter.start().await?;
        self.registry.register(DYNAMIC_HTTP_ADAPTER, Arc::clone(&adapter)).await?;

        Ok(adapter)
    }

    fn request_from_input(input: &HashMap<String, Value>) -> HttpRequest {
        let mut request = HttpRequest {
            method: "GET".to_string(),
            ..HttpRequest::default()
        };

        if let Some(method) = input.get("method").and_then(Value::as_str) {
            request.method = method.to_string();
        }
        if let Some(url) = input.get("url").and_then(Value::as_str) {
            request.url = url.to_string();
        }
        if let Some(endpoint) = input.get("endpoint").and_then(Value::as_str) {
            request.url = endpoint.to_string();
        }
        if let Some(headers) = input.get("headers").and_then(Value::as_object) {
            for (key, value) in headers {
                if let Some(text) = value.as_str() {
                    request.headers.insert(key.clone(), text.to_string());
                }
            }
        }
        if let Some(params) = input.get("params").and_then(Value::as_object) {
            request.params = params.clone().into_iter().collect();
        }
        if let Some(body) = input.get("body") {
            request.body = Some(body.clone());
        }
        if let Some(timeout_ms) = input.get("timeout").and_then(Value::as_f64) {
            request.timeout = Some(Duration::from_millis(timeout_ms.max(0.0) as u64));
        }

        request
    }

    async fn run_http_request(
        &self,
        task: &Task,
        adapter: Arc<dyn Adapter>,
    ) -> TaskResult {
        let request = Self::request_from_input(&task.input);

        match adapter.make_request(request).await {
            Ok(response) => {
                let mut output = HashMap::new();
                output.insert("status_code".to_string(), json!(response.status_code));
                output.insert("headers".to_string(), json!(response.headers));
                output.insert("body".to_string(), response.body);
                output.insert(
                    "duration_ms".to_string(),
                    json!(response.duration.as_millis() as u64),
                );
                output.insert("adapter_name".to_string(), json!(adapter.name()));
                output.insert("adapter_type".to_string(), json!(adapter.adapter_type()));
                output.insert("adapter_healthy".to_string(), json!(adapter.is_healthy().await));

                TaskResult {
                    task_id: task.id.clone(),
                    success: response.success,
                    output,
                    error: response.error,
                    duration: Duration::ZERO,
                    metadata: HashMap::new(),
                    next_actions: Vec::new(),
                }
                .with_metadata("agent_id", json!(self.core.id()))
                .with_metadata("agent_type", json!(self.core.kind().as_str()))
                .with_metadata("adapter_used", json!(adapter.name()))
            }
            Err(e) => TaskResult::failure(&task.id, format!("HTTP request failed: {e}"))
                .with_metadata("adapter_used", json!(adapter.name())),
        }
    }

    async fn run_http_task(&self, task: &Task) -> TaskResult {
        match self.http_adapter().await {
            Ok(adapter) => self.run_http_request(task, adapter).await,
            Err(e) => {
                TaskResult::failure(&task.id, format!("failed to provision HTTP adapter: {e}"))
            }
        }
    }

    async fn run_create_adapter(&self, task: &Task) -> TaskResult {
        let Some(adapter_type) = task.input.get("adapter_type").and_then(Value::as_str) else {
            return TaskResult::failure(&task.id, "adapter_type is required");
        };

        let adapter_name = task
            .input
            .get("adapter_name")
            .and_then(Value::as_str)
            .map_or_else(
                || format!("{adapter_type}-adapter-{}", uuid::Uuid::new_v4()),
                str::to_string,
            );

        let mut config: HashMap<String, Value> = task
            .input
            .get("config")
            .and_then(Value::as_object)
            .map(|o| o.clone().into_iter().collect())
            .unwrap_or_default();
        config.insert("name".to_string(), json!(adapter_name));

        let built = async {
            self.factory.validate(adapter_type, &config)?;
            let adapter = self.factory.create(adapter_type, &config)?;
            adapter.initialize(&config).await?;
            adapter.start().await?;
            self.registry.register(adapter_name.clone(), Arc::clone(&adapter)).await?;
            Ok::<Arc<dyn Adapter>, AgentError>(adapter)
        }
        .await;

        match built {
            Ok(adapter) => {
                let mut output = HashMap::new();
                output.insert("adapter_name".to_string(), json!(adapter.name()));
                output.insert("adapter_type".to_string(), json!(adapter.adapter_type()));
                output.insert("adapter_version".to_string(), json!(adapter.version()));
                output.insert("capabilities".to_string(), json!(adapter.capabilities()));
                output.insert("healthy".to_string(), json!(adapter.is_healthy().await));

                TaskResult::success(&task.id, output)
                    .with_metadata("agent_id", json!(self.core.id()))
                    .with_metadata("agent_type", json!(self.core.kind().as_str()))
                    .with_metadata("operation", json!("create_adapter"))
            }
            Err(e) => TaskResult::failure(&task.id, format!("failed to create adapter: {e}")),
        }
    }

    async fn run_list_adapters(&self, task: &Task) -> TaskResult {
        let adapters = self.registry.list().await;

        let mut listing = Vec::with_capacity(adapters.len());
        for adapter in &adapters {
            listing.push(json!({
                "name": adapter.name(),
                "type": adapter.adapter_type(),
                "version": adapter.version(),
                "capabilities": adapter.capabilities(),
                "healthy": adapter.is_healthy().await,
            }));
        }

        let mut output = HashMap::new();
        output.insert("adapters".to_string(), json!(listing));
        output.insert("count".to_string(), json!(listing.len()));

        TaskResult::success(&task.id, output)
            .with_metadata("agent_id", json!(self.core.id()))
            .with_metadata("agent_type", json!(self.core.kind().as_str()))
            .with_metadata("operation", json!("list_adapters"))
    }

    async fn run_adapter_health(&self, task: &Task) -> TaskResult {
        let adapters = self.registry.list().await;

        let mut health = Map::new();
        let mut healthy_count = 0usize;
        for adapter in &adapters {
            let healthy = adapter.is_healthy().await;
            if healthy {
                healthy_count += 1;
            }
            health.insert(
                adapter.name().to_string(),
                json!({
                    "healthy": healthy,
                    "type": adapter.adapter_type(),
                    "version": adapter.version(),
                    "capabilities": adapter.capabilities(),
                }),
            );
        }

        let overall = if adapters.is_empty() {
            0.0
        } else {
            healthy_count as f64 / adapters.len() as f64
        };

        let mut output = HashMap::new();
        output.insert("adapters".to_string(), Value::Object(health));
        output.insert("total_count".to_string(), json!(adapters.len()));
        output.insert("healthy_count".to_string(), json!(healthy_count));
        output.insert("overall_health".to_string(), json!(overall));

        TaskResult::success(&task.id, output)
            .with_metadata("agent_id", json!(self.core.id()))
            .with_metadata("agent_type", json!(self.core.kind().as_str()))
            .with_metadata("operation", json!("adapter_health"))
    }

    /// Fallback for task types outside the fixed set: use the first
    /// healthy adapter whose capabilities match.
    async fn run_with_capable_adapter(&self, task: &Task) -> TaskResult {
        let capable = self.registry.by_capability(&task.task_type).await;
        if capable.is_empty() {
            return TaskResult::failure(
                &task.id,
                format!("no adapter found capable of handling task type: {}", task.task_type),
            );
        }

        let mut selected = None;
        for adapter in capable {
            if adapter.is_healthy().await {
                selected = Some(adapter);
                break;
            }
        }

        match selected {
            Some(adapter) => self.run_http_request(task, adapter).await,
            None => TaskResult::failure(&task.id, "no healthy adapter available"),
        }
    }
}

#[async_trait]
impl Agent for AdapterAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn can_handle(&self, task_type: &str) -> bool {
        CAPABILITIES.contains(&task_type)
    }

    async fn execute(&self, task: Task) -> TaskResult {
        let start = Instant::now();
        self.core.begin_task(&task).await;

        info!(
            agent_id = %self.core.id(),
            task_id = %task.id,
            task_type = %task.task_type,
            "Adapter agent executing task"
        );

        let result = match task.task_type.as_str() {
            "http_request" | "api_call" => self.run_http_task(&task).await,
            "create_adapter" => self.run_create_adapter(&task).await,
            "list_adapters" => self.run_list_adapters(&task).await,
            "adapter_health" => self.run_adapter_health(&task).await,
            _ => self.run_with_capable_adapter(&task).await,
        };

        let duration = start.elapsed();
        self.core.finish_task(result.success, duration).await;

        info!(
            agent_id = %self.core.id(),
            task_id = %task.id,
            duration_ms = duration.as_millis() as u64,
            success = result.success,
            "Adapter agent task completed"
        );

        result.with_duration(duration)
    }
}
