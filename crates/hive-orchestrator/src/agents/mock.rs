//! Mock agent: a test double with configurable latency and failure rate.
//!
//! Useful for exercising orchestration logic without a real backend. Not
//! part of the production capability matrix.

use crate::base::AgentCore;
use crate::Agent;
use async_trait::async_trait;
use hive_abstraction::{AgentConfig, Task, TaskResult};
use rand::Rng;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::info;

const DEFAULT_RESPONSES: [&str; 4] = [
    "Mock agent executed task successfully",
    "Task completed with mock data",
    "Simulated execution completed",
    "Mock response generated",
];

const CAPABILITIES: [&str; 4] = ["mock", "test", "development", "simulation"];

/// Canned-response agent with randomized delay and sampled failures.
pub struct MockAgent {
    core: AgentCore,
    responses: Vec<String>,
    min_processing: Duration,
    max_processing: Duration,
    failure_rate: f64,
}

impl MockAgent {
    /// Builds a mock agent from configuration.
    ///
    /// Recognized config entries, all optional: `responses` (array of
    /// strings), `min_processing_time_ms` (default 100),
    /// `max_processing_time_ms` (default 2000), `failure_rate`
    /// (default 0.05).
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let responses = config
            .config
            .get("responses")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| DEFAULT_RESPONSES.iter().map(|r| (*r).to_string()).collect());

        let min_ms = config.get_f64("min_processing_time_ms").unwrap_or(100.0).max(0.0) as u64;
        let max_ms = config.get_f64("max_processing_time_ms").unwrap_or(2000.0).max(0.0) as u64;

        Self {
            core: AgentCore::new(config, &CAPABILITIES),
            responses,
            min_processing: Duration::from_millis(min_ms),
            max_processing: Duration::from_millis(max_ms.max(min_ms)),
            failure_rate: config.get_f64("failure_rate").unwrap_or(0.05),
        }
    }

    fn processing_time(&self) -> Duration {
        let min = self.min_processing.as_millis() as u64;
        let max = self.max_processing.as_millis() as u64;
        if min == max {
            return self.min_processing;
        }
        let ms = rand::thread_rng().gen_range(min..=max);
        Duration::from_millis(ms)
    }

    fn should_fail(&self) -> bool {
        // gen f64 is in [0, 1), so rates of 0.0 and 1.0 are deterministic
        rand::thread_rng().r#gen::<f64>() < self.failure_rate
    }

    fn pick_response(&self, task: &Task) -> String {
        let index = rand::thread_rng().gen_range(0..self.responses.len());
        format!("{} for task '{}' (ID: {})", self.responses[index], task.task_type, task.id)
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn can_handle(&self, _task_type: &str) -> bool {
        // The mock agent accepts anything
        true
    }

    async fn execute(&self, task: Task) -> TaskResult {
        let start = Instant::now();
        self.core.begin_task(&task).await;

        info!(
            agent_id = %self.core.id(),
            task_id = %task.id,
            task_type = %task.task_type,
            "Mock agent executing task"
        );

        let delay = self.processing_time();
        tokio::time::sleep(delay).await;

        if self.should_fail() {
            let duration = start.elapsed();
            self.core.finish_task(false, duration).await;

            return TaskResult::failure(&task.id, "simulated failure for testing purposes")
                .with_duration(duration)
                .with_metadata("agent_id", json!(self.core.id()))
                .with_metadata("agent_type", json!(self.core.kind().as_str()))
                .with_metadata("simulated", json!(true));
        }

        let response = self.pick_response(&task);
        let context_keys: Vec<String> = self.core.context().await.keys().cloned().collect();
        let input_keys: Vec<&String> = task.input.keys().collect();

        let mut output = HashMap::new();
        output.insert("response".to_string(), json!(response));
        output.insert("task_type".to_string(), json!(task.task_type));
        output.insert("input_keys".to_string(), json!(input_keys));
        output.insert("context_keys".to_string(), json!(context_keys));
        output.insert("timestamp".to_string(), json!(chrono::Utc::now().timestamp()));

        let duration = start.elapsed();
        self.core.finish_task(true, duration).await;

        info!(
            agent_id = %self.core.id(),
            task_id = %task.id,
            duration_ms = duration.as_millis() as u64,
            response_length = response.len(),
            "Mock agent task completed"
        );

        TaskResult::success(&task.id, output)
            .with_duration(duration)
            .with_metadata("agent_id", json!(self.core.id()))
            .with_metadata("agent_type", json!(self.core.kind().as_str()))
            .with_metadata("simulated", json!(true))
    }
}
