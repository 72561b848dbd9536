//! Workflow agent: executes an ordered list of steps against a shared
//! data bag, with a per-step on-error policy.

use crate::base::AgentCore;
use crate::Agent;
use async_trait::async_trait;
use hive_abstraction::{AgentConfig, AgentError, RetryPolicy, Task, TaskResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const CAPABILITIES: [&str; 4] = ["workflow", "sequence", "orchestration", "automation"];

/// The closed set of step kinds a workflow can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Emit a log line with variable substitution.
    Log,
    /// Pause for a configured number of milliseconds.
    Delay,
    /// Apply a named transformation to the workflow data.
    Transform,
    /// Evaluate a condition expression against the workflow data.
    Condition,
    /// Simulated outbound HTTP call.
    HttpCall,
    /// Write a variable into the workflow data.
    SetVariable,
}

/// What to do when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Record the failure and move on.
    Continue,
    /// Re-invoke the step once and keep whichever outcome results.
    Retry,
    /// Abort the workflow immediately.
    #[default]
    Stop,
}

/// One step in a workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// What the step does.
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Step-specific configuration bag.
    #[serde(default)]
    pub config: HashMap<String, Value>,
    /// Failure policy. Defaults to Stop.
    #[serde(default)]
    pub on_error: OnError,
    /// Optional per-step time bound, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Sequential step executor over a shared data bag.
///
/// The bag is seeded from the task input; each successful step's output is
/// merged back under `step_N_result` so later steps can reference earlier
/// results.
pub struct WorkflowAgent {
    core: AgentCore,
    steps: Vec<WorkflowStep>,
    retry: RetryPolicy,
}

impl WorkflowAgent {
    /// Builds a workflow agent, parsing the step list from config.
    ///
    /// # Errors
    /// Returns an error when `steps` is absent or not a valid step array.
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let steps_value = config.config.get("steps").ok_or_else(|| AgentError::MissingField {
            kind: config.kind.to_string(),
            field: "steps".to_string(),
        })?;

        let steps: Vec<WorkflowStep> =
            serde_json::from_value(steps_value.clone()).map_err(|e| AgentError::InvalidField {
                field: "steps".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            core: AgentCore::new(config, &CAPABILITIES),
            steps,
            retry: RetryPolicy::retry_once(),
        })
    }

    /// The number of configured steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    async fn run_step(
        &self,
        step: &WorkflowStep,
        data: &mut HashMap<String, Value>,
    ) -> Result<Value, String> {
        let step_future = self.dispatch_step(step, data);
        match step.timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), step_future)
                .await
                .map_err(|_| format!("step timed out after {ms}ms"))?,
            None => step_future.await,
        }
    }

    async fn dispatch_step(
        &self,
        step: &WorkflowStep,
        data: &mut HashMap<String, Value>,
    ) -> Result<Value, String> {
        match step.step_type {
            StepType::Log => self.step_log(step, data),
            StepType::Delay => Self::step_delay(step).await,
            StepType::Transform => Self::step_transform(step, data),
            StepType::Condition => Self::step_condition(step, data),
            StepType::HttpCall => Self::step_http_call(step),
            StepType::SetVariable => Self::step_set_variable(step, data),
        }
    }

    fn step_log(
        &self,
        step: &WorkflowStep,
        data: &HashMap<String, Value>,
    ) -> Result<Value, String> {
        let template = step
            .config
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Workflow step executed");
        let message = substitute_variables(template, data);

        info!(agent_id = %self.core.id(), message = %message, "Workflow log step");

        Ok(json!({
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }

    async fn step_delay(step: &WorkflowStep) -> Result<Value, String> {
        let delay_ms = step.config.get("delay_ms").and_then(Value::as_f64).unwrap_or(1000.0);
        tokio::time::sleep(Duration::from_millis(delay_ms.max(0.0) as u64)).await;

        Ok(json!({
            "delay_ms": delay_ms,
            "message": format!("Delayed for {delay_ms}ms"),
        }))
    }

    fn step_transform(
        step: &WorkflowStep,
        data: &HashMap<String, Value>,
    ) -> Result<Value, String> {
        let operation = step
            .config
            .get("operation")
            .and_then(Value::as_str)
            .ok_or("transform step requires 'operation' config")?;

        match operation {
            "normalize" => {
                let transformed: Map<String, Value> = data
                    .iter()
                    .map(|(k, v)| {
                        let value = match v.as_str() {
                            Some(s) => json!(s.trim().to_lowercase()),
                            None => v.clone(),
                        };
                        (k.clone(), value)
                    })
                    .collect();
                Ok(Value::Object(transformed))
            }
            "uppercase" => {
                let transformed: Map<String, Value> = data
                    .iter()
                    .map(|(k, v)| {
                        let value = match v.as_str() {
                            Some(s) => json!(s.to_uppercase()),
                            None => v.clone(),
                        };
                        (k.clone(), value)
                    })
                    .collect();
                Ok(Value::Object(transformed))
            }
            other => Err(format!("unsupported transform operation: {other}")),
        }
    }

    fn step_condition(
        step: &WorkflowStep,
        data: &HashMap<String, Value>,
    ) -> Result<Value, String> {
        let condition = step
            .config
            .get("condition")
            .and_then(Value::as_str)
            .ok_or("condition step requires 'condition' config")?;

        // TODO: wire the flow engine's trigger-expression evaluator in here
        let result = !data.is_empty();

        Ok(json!({
            "condition": condition,
            "result": result,
            "evaluated": true,
        }))
    }

    fn step_http_call(step: &WorkflowStep) -> Result<Value, String> {
        let url = step.config.get("url").and_then(Value::as_str).unwrap_or("");
        let method = step.config.get("method").and_then(Value::as_str).unwrap_or("GET");

        // Stubbed: real outbound calls belong to the http/adapter agents
        Ok(json!({
            "url": url,
            "method": method,
            "status_code": 200,
            "response": "Simulated HTTP response",
            "simulated": true,
        }))
    }

    fn step_set_variable(
        step: &WorkflowStep,
        data: &mut HashMap<String, Value>,
    ) -> Result<Value, String> {
        let name = step
            .config
            .get("name")
            .and_then(Value::as_str)
            .ok_or("set_variable step requires 'name' config")?;
        let value = step.config.get("value").cloned().unwrap_or(Value::Null);

        data.insert(name.to_string(), value.clone());

        Ok(json!({
            "variable": name,
            "value": value,
            "set": true,
        }))
    }
}

/// Replaces `{{key}}` placeholders with workflow data values.
fn substitute_variables(template: &str, data: &HashMap<String, Value>) -> String {
    let mut result = template.to_string();
    for (key, value) in data {
        let placeholder = format!("{{{{{key}}}}}");
        let replacement = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        result = result.replace(&placeholder, &replacement);
    }
    result
}

#[async_trait]
impl Agent for WorkflowAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    fn can_handle(&self, task_type: &str) -> bool {
        matches!(
            task_type,
            "workflow" | "sequence" | "orchestration" | "automation" | "pipeline" | "process"
        )
    }

    async fn execute(&self, task: Task) -> TaskResult {
        let start = Instant::now();
        self.core.begin_task(&task).await;

        info!(
            agent_id = %self.core.id(),
            task_id = %task.id,
            steps_count = self.steps.len(),
            "Workflow agent executing task"
        );

        let mut workflow_data: HashMap<String, Value> = task.input.clone();
        let mut records: Vec<Value> = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            let step_number = index + 1;
            let step_start = Instant::now();

            info!(
                agent_id = %self.core.id(),
                task_id = %task.id,
                step = step_number,
                step_type = ?step.step_type,
                "Executing workflow step"
            );

            let mut outcome = self.run_step(step, &mut workflow_data).await;
            let step_duration = step_start.elapsed();

            let mut fields = Map::new();
            fields.insert("step".to_string(), json!(step_number));
            fields.insert("type".to_string(), json!(step.step_type));
            fields.insert("description".to_string(), json!(step.description));
            fields.insert("duration_ms".to_string(), json!(step_duration.as_millis() as u64));
            fields.insert("success".to_string(), json!(outcome.is_ok()));

            if let Err(error) = &outcome {
                fields.insert("error".to_string(), json!(error));

                match step.on_error {
                    OnError::Continue => {
                        warn!(
                            agent_id = %self.core.id(),
                            step = step_number,
                            error = %error,
                            "Step failed but continuing"
                        );
                        fields.insert("action".to_string(), json!("continued"));
                    }
                    OnError::Retry => {
                        info!(agent_id = %self.core.id(), step = step_number, "Retrying failed step");

                        let mut attempt = 1;
                        while outcome.is_err() && self.retry.allows_retry(attempt) {
                            let delay = self.retry.delay_for(attempt);
                            if delay > Duration::ZERO {
                                tokio::time::sleep(delay).await;
                            }
                            outcome = self.run_step(step, &mut workflow_data).await;
                            attempt += 1;
                        }

                        match &outcome {
                            Ok(_) => {
                                fields.insert("action".to_string(), json!("retry_success"));
                                fields.insert("success".to_string(), json!(true));
                            }
                            Err(retry_error) => {
                                fields.insert("retry_error".to_string(), json!(retry_error));
                                fields.insert("action".to_string(), json!("retry_failed"));
                            }
                        }
                    }
                    OnError::Stop => {
                        fields.insert("action".to_string(), json!("stopped"));
                        records.push(Value::Object(fields));

                        let duration = start.elapsed();
                        self.core.finish_task(false, duration).await;

                        let mut output = HashMap::new();
                        output.insert("completed_steps".to_string(), json!(records));
                        output.insert("failed_at_step".to_string(), json!(step_number));
                        output.insert("workflow_data".to_string(), json!(workflow_data));

                        return TaskResult::failure(
                            &task.id,
                            format!("workflow stopped at step {step_number}: {error}"),
                        )
                        .with_output(output)
                        .with_duration(duration)
                        .with_metadata("agent_id", json!(self.core.id()))
                        .with_metadata("agent_type", json!(self.core.kind().as_str()))
                        .with_metadata("total_steps", json!(self.steps.len()))
                        .with_metadata("completed", json!(index));
                    }
                }
            }

            if let Ok(step_output) = &outcome {
                fields.insert("output".to_string(), step_output.clone());
                workflow_data.insert(format!("step_{step_number}_result"), step_output.clone());
            }

            records.push(Value::Object(fields));
        }

        let duration = start.elapsed();
        self.core.finish_task(true, duration).await;

        info!(
            agent_id = %self.core.id(),
            task_id = %task.id,
            duration_ms = duration.as_millis() as u64,
            steps_executed = records.len(),
            "Workflow completed successfully"
        );

        let mut output = HashMap::new();
        output.insert("steps_executed".to_string(), json!(records));
        output.insert("workflow_data".to_string(), json!(workflow_data));
        output.insert(
            "summary".to_string(),
            json!({
                "total_steps": self.steps.len(),
                "completed": records.len(),
                "total_duration_ms": duration.as_millis() as u64,
            }),
        );

        TaskResult::success(&task.id, output)
            .with_duration(duration)
            .with_metadata("agent_id", json!(self.core.id()))
            .with_metadata("agent_type", json!(self.core.kind().as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_abstraction::AgentKind;

    fn agent_with_steps(steps: Value) -> WorkflowAgent {
        let config =
            AgentConfig::new(AgentKind::Workflow, "flow").with_entry("steps", steps);
        WorkflowAgent::new(&config).unwrap()
    }

    #[test]
    fn test_requires_steps() {
        let config = AgentConfig::new(AgentKind::Workflow, "flow");
        assert!(WorkflowAgent::new(&config).is_err());
    }

    #[test]
    fn test_rejects_malformed_steps() {
        let config = AgentConfig::new(AgentKind::Workflow, "flow")
            .with_entry("steps", json!([{"type": "teleport"}]));
        assert!(WorkflowAgent::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let agent = agent_with_steps(json!([
            {"type": "set_variable", "config": {"name": "greeting", "value": "hello"}},
            {"type": "log", "config": {"message": "saying {{greeting}}"}},
        ]));

        let result = agent.execute(Task::new("workflow")).await;
        assert!(result.success);

        let records = result.output.get("steps_executed").and_then(Value::as_array).unwrap();
        assert_eq!(records.len(), 2);

        let logged = records[1]["output"]["message"].as_str().unwrap();
        assert_eq!(logged, "saying hello");
    }

    #[tokio::test]
    async fn test_step_outputs_feed_workflow_data() {
        let agent = agent_with_steps(json!([
            {"type": "condition", "config": {"condition": "has_data"}},
        ]));

        let task = Task::new("workflow").with_input("seed", json!("x"));
        let result = agent.execute(task).await;

        let data = result.output.get("workflow_data").and_then(Value::as_object).unwrap();
        assert!(data.contains_key("step_1_result"));
        assert_eq!(data["step_1_result"]["result"], json!(true));
    }

    #[tokio::test]
    async fn test_stop_policy_aborts_with_failed_step_index() {
        let agent = agent_with_steps(json!([
            {"type": "log", "config": {"message": "first"}},
            {"type": "transform", "config": {"operation": "reverse"}, "on_error": "stop"},
            {"type": "log", "config": {"message": "unreachable"}},
        ]));

        let result = agent.execute(Task::new("workflow")).await;
        assert!(!result.success);
        assert_eq!(result.output.get("failed_at_step"), Some(&json!(2)));

        let completed = result.output.get("completed_steps").and_then(Value::as_array).unwrap();
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[1]["action"], json!("stopped"));
    }

    #[tokio::test]
    async fn test_continue_policy_runs_remaining_steps() {
        let agent = agent_with_steps(json!([
            {"type": "transform", "config": {"operation": "reverse"}, "on_error": "continue"},
            {"type": "log", "config": {"message": "still here"}},
        ]));

        let result = agent.execute(Task::new("workflow")).await;
        assert!(result.success);

        let records = result.output.get("steps_executed").and_then(Value::as_array).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["action"], json!("continued"));
        assert_eq!(records[1]["success"], json!(true));
    }

    #[tokio::test]
    async fn test_retry_policy_records_retry_failure() {
        let agent = agent_with_steps(json!([
            {"type": "transform", "config": {"operation": "reverse"}, "on_error": "retry"},
        ]));

        let result = agent.execute(Task::new("workflow")).await;
        // The retry also fails, but the workflow proceeds past the step
        assert!(result.success);

        let records = result.output.get("steps_executed").and_then(Value::as_array).unwrap();
        assert_eq!(records[0]["action"], json!("retry_failed"));
        assert!(records[0]["retry_error"].is_string());
    }

    #[tokio::test]
    async fn test_transform_normalize() {
        let agent = agent_with_steps(json!([
            {"type": "transform", "config": {"operation": "normalize"}},
        ]));

        let task = Task::new("workflow").with_input("name", json!("  Alice  "));
        let result = agent.execute(task).await;
        assert!(result.success);

        let records = result.output.get("steps_executed").and_then(Value::as_array).unwrap();
        assert_eq!(records[0]["output"]["name"], json!("alice"));
    }

    #[tokio::test]
    async fn test_delay_step_honors_configuration() {
        let agent = agent_with_steps(json!([
            {"type": "delay", "config": {"delay_ms": 10}},
        ]));

        let start = Instant::now();
        let result = agent.execute(Task::new("workflow")).await;
        assert!(result.success);
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_variable_substitution() {
        let mut data = HashMap::new();
        data.insert("user".to_string(), json!("bob"));
        data.insert("count".to_string(), json!(3));

        let rendered = substitute_variables("{{user}} has {{count}} tasks", &data);
        assert_eq!(rendered, "bob has 3 tasks");
    }
}
