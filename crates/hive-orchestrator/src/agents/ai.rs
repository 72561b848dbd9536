//! AI agent: provider-backed text generation with a first-class mock mode.
//!
//! When no real credential is configured (or the placeholder credential is
//! detected) the agent serves deterministic canned responses instead of
//! calling out. That fallback is normal operation, not an error path.

use crate::base::AgentCore;
use crate::Agent;
use async_trait::async_trait;
use hive_abstraction::{AgentConfig, Task, TaskResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const PLACEHOLDER_KEY: &str = "sk-test-key";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CAPABILITIES: [&str; 4] = ["text_generation", "conversation", "analysis", "summarization"];

const MOCK_RESPONSES: [&str; 5] = [
    "Hello! I'm an AI assistant ready to help you with your questions and tasks.",
    "I understand your request. Let me provide you with a comprehensive response based on the information provided.",
    "Thank you for your question. Here's my analysis and recommendations for your situation.",
    "Based on the context you've provided, I can offer the following insights and suggestions.",
    "I've processed your request and generated a response that should address your needs effectively.",
];

/// Typed configuration extracted from the generic agent config bag.
#[derive(Debug, Clone)]
struct AiAgentConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl AiAgentConfig {
    fn from_config(config: &AgentConfig) -> Self {
        let api_key = config
            .get_str("api_key")
            .or_else(|| config.get_str("openai_api_key"))
            .map(str::to_string);
        let model = config.get_str("model").unwrap_or(DEFAULT_MODEL).to_string();
        let base_url = config.get_str("base_url").unwrap_or(DEFAULT_BASE_URL).to_string();
        Self { api_key, model, base_url }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: String,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

/// Text-generation agent with provider and mock modes.
pub struct AiAgent {
    core: AgentCore,
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    mock_mode: bool,
    mock_index: AtomicUsize,
}

impl AiAgent {
    /// Builds an AI agent from validated configuration.
    ///
    /// Mock mode engages when the credential is absent, empty, or the
    /// `sk-test-key` placeholder.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let parsed = AiAgentConfig::from_config(config);
        let api_key = parsed.api_key.unwrap_or_default();
        let mock_mode = api_key.is_empty() || api_key == PLACEHOLDER_KEY;

        let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            core: AgentCore::new(config, &CAPABILITIES),
            client,
            api_key,
            model: parsed.model,
            base_url: parsed.base_url,
            mock_mode,
            mock_index: AtomicUsize::new(0),
        }
    }

    /// Whether the agent is serving canned responses.
    #[must_use]
    pub const fn is_mock_mode(&self) -> bool {
        self.mock_mode
    }

    async fn execute_mock(&self, task: &Task) -> TaskResult {
        // Keep mock latency visible so callers exercise real await points
        tokio::time::sleep(Duration::from_millis(200)).await;

        let index = self.mock_index.fetch_add(1, Ordering::Relaxed) % MOCK_RESPONSES.len();
        let mut response = MOCK_RESPONSES[index].to_string();

        if let Some(prompt) = task.input.get("prompt").and_then(Value::as_str) {
            let lowered = prompt.to_lowercase();
            if lowered.contains("email") {
                response = "Subject: Professional Response\n\nDear Customer,\n\nThank you for your inquiry. We appreciate your interest in our services and would be happy to provide you with the information you requested.\n\nBest regards,\nCustomer Service Team".to_string();
            } else if lowered.contains("summary") {
                response = "Summary: Based on the provided information, the key points are: 1) Main topic identification, 2) Key insights extraction, 3) Actionable recommendations. This analysis provides a comprehensive overview of the subject matter.".to_string();
            } else if lowered.contains("analysis") {
                response = "Analysis Results: The data shows positive trends with several key indicators pointing toward successful outcomes. Recommendations include continued monitoring and strategic adjustments as needed.".to_string();
            }
        }

        let mut output = HashMap::new();
        output.insert("text".to_string(), json!(response));
        output.insert("model".to_string(), json!(format!("{}-mock", self.model)));
        output.insert("tokens_used".to_string(), json!(response.len() / 4));
        output.insert("finish_reason".to_string(), json!("stop"));

        TaskResult::success(&task.id, output)
            .with_metadata("agent_id", json!(self.core.id()))
            .with_metadata("agent_type", json!(self.core.kind().as_str()))
            .with_metadata("mode", json!("mock"))
    }

    async fn execute_real(&self, task: &Task) -> TaskResult {
        let Some(prompt) = task.input.get("prompt").and_then(Value::as_str) else {
            return TaskResult::failure(&task.id, "prompt is required for AI tasks");
        };
        if prompt.is_empty() {
            return TaskResult::failure(&task.id, "prompt is required for AI tasks");
        }

        let mut messages = Vec::new();
        if let Some(system) = task.input.get("system").and_then(Value::as_str) {
            if !system.is_empty() {
                messages.push(ChatMessage { role: "system".to_string(), content: system.to_string() });
            }
        }
        messages.push(ChatMessage { role: "user".to_string(), content: prompt.to_string() });

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(task.input.get("temperature").and_then(Value::as_f64).unwrap_or(0.7)),
            max_tokens: Some(task.input.get("max_tokens").and_then(Value::as_u64).unwrap_or(1000)),
        };

        let response = match self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return TaskResult::failure(&task.id, format!("API request failed: {e}"));
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return TaskResult::failure(&task.id, format!("API error {}: {}", status.as_u16(), body));
        }

        let parsed: ChatResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return TaskResult::failure(&task.id, format!("failed to parse response: {e}"));
            }
        };

        let Some(choice) = parsed.choices.first() else {
            return TaskResult::failure(&task.id, "no choices in API response");
        };

        let mut output = HashMap::new();
        output.insert("text".to_string(), json!(choice.message.content));
        output.insert("model".to_string(), json!(parsed.model));
        output.insert("tokens_used".to_string(), json!(parsed.usage.total_tokens));
        output.insert("finish_reason".to_string(), json!(choice.finish_reason));

        TaskResult::success(&task.id, output)
            .with_metadata("agent_id", json!(self.core.id()))
            .with_metadata("agent_type", json!(self.core.kind().as_str()))
            .with_metadata("mode", json!("real"))
            .with_metadata("prompt_tokens", json!(parsed.usage.prompt_tokens))
            .with_metadata("completion_tokens", json!(parsed.usage.completion_tokens))
    }
}

#[async_trait]
impl Agent for AiAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn can_handle(&self, task_type: &str) -> bool {
        matches!(
            task_type,
            "text_generation"
                | "conversation"
                | "analysis"
                | "summarization"
                | "ai"
                | "openai"
                | "gpt"
                | "chat"
        )
    }

    async fn execute(&self, task: Task) -> TaskResult {
        let start = Instant::now();
        self.core.begin_task(&task).await;

        info!(
            agent_id = %self.core.id(),
            task_id = %task.id,
            task_type = %task.task_type,
            use_mock = self.mock_mode,
            "AI agent executing task"
        );

        let result = if self.mock_mode {
            self.execute_mock(&task).await
        } else {
            self.execute_real(&task).await
        };

        let duration = start.elapsed();
        self.core.finish_task(result.success, duration).await;

        info!(
            agent_id = %self.core.id(),
            task_id = %task.id,
            duration_ms = duration.as_millis() as u64,
            success = result.success,
            "AI agent task completed"
        );

        result.with_duration(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_abstraction::AgentKind;

    fn mock_config() -> AgentConfig {
        AgentConfig::new(AgentKind::Ai, "assistant")
            .with_entry("api_key", json!(PLACEHOLDER_KEY))
    }

    #[tokio::test]
    async fn test_placeholder_key_enables_mock_mode() {
        let agent = AiAgent::new(&mock_config());
        assert!(agent.is_mock_mode());
    }

    #[tokio::test]
    async fn test_missing_key_enables_mock_mode() {
        let config = AgentConfig::new(AgentKind::Ai, "assistant");
        let agent = AiAgent::new(&config);
        assert!(agent.is_mock_mode());
    }

    #[tokio::test]
    async fn test_real_key_disables_mock_mode() {
        let config = AgentConfig::new(AgentKind::Ai, "assistant")
            .with_entry("api_key", json!("sk-live-abc123"));
        let agent = AiAgent::new(&config);
        assert!(!agent.is_mock_mode());
    }

    #[tokio::test]
    async fn test_mock_execution_succeeds() {
        let agent = AiAgent::new(&mock_config());
        let task = Task::new("text_generation").with_input("prompt", json!("Tell me a story"));

        let result = agent.execute(task).await;
        assert!(result.success);
        assert!(result.output.get("text").and_then(Value::as_str).is_some());
        assert_eq!(result.output.get("finish_reason"), Some(&json!("stop")));
        assert_eq!(result.metadata.get("mode"), Some(&json!("mock")));
    }

    #[tokio::test]
    async fn test_mock_summary_flavor() {
        let agent = AiAgent::new(&mock_config());
        let task =
            Task::new("summarization").with_input("prompt", json!("Write a summary of the report"));

        let result = agent.execute(task).await;
        let text = result.output.get("text").and_then(Value::as_str).unwrap();
        assert!(text.starts_with("Summary:"));
    }

    #[tokio::test]
    async fn test_mock_responses_rotate() {
        let agent = AiAgent::new(&mock_config());
        let first = agent.execute(Task::new("chat").with_input("prompt", json!("hi"))).await;
        let second = agent.execute(Task::new("chat").with_input("prompt", json!("hi"))).await;

        let a = first.output.get("text").and_then(Value::as_str).unwrap().to_string();
        let b = second.output.get("text").and_then(Value::as_str).unwrap().to_string();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_can_handle() {
        let agent = AiAgent::new(&mock_config());
        assert!(agent.can_handle("text_generation"));
        assert!(agent.can_handle("chat"));
        assert!(!agent.can_handle("http_request"));
    }

    #[tokio::test]
    async fn test_metrics_updated_on_mock_run() {
        let agent = AiAgent::new(&mock_config());
        agent.execute(Task::new("chat").with_input("prompt", json!("hi"))).await;

        let state = agent.state().await;
        assert_eq!(state.metrics.tasks_completed, 1);
    }
}
