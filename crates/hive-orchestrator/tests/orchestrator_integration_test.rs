//! End-to-end tests for agent selection, execution, and context sharing.

use hive_abstraction::{AgentConfig, AgentKind, Task};
use hive_orchestrator::{Agent, Orchestrator, OrchestratorError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("hive_orchestrator=debug").try_init();
}

fn mock_config(name: &str, failure_rate: f64) -> AgentConfig {
    AgentConfig::new(AgentKind::Mock, name)
        .with_entry("min_processing_time_ms", json!(0))
        .with_entry("max_processing_time_ms", json!(1))
        .with_entry("failure_rate", json!(failure_rate))
}

/// Serves canned HTTP responses on a loopback socket until dropped.
async fn spawn_http_server(status_line: &'static str, body: &'static str) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { break };
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
        }
    });

    addr
}

#[tokio::test]
async fn test_result_identity_and_success_tracking() {
    init_tracing();
    let orchestrator = Orchestrator::new();
    orchestrator.instantiate(&mock_config("double", 0.0)).await.unwrap();

    let task = Task::new("anything").with_id("task-42");
    let result = orchestrator.execute_task(task).await.unwrap();

    assert_eq!(result.task_id, "task-42");
    assert!(result.success);
}

#[tokio::test]
async fn test_no_suitable_agent_is_an_error() {
    let orchestrator = Orchestrator::new();

    // An agent exists but cannot handle the type
    let config = AgentConfig::new(AgentKind::Http, "caller")
        .with_entry("base_url", json!("https://example.test"));
    orchestrator.instantiate(&config).await.unwrap();

    let result = orchestrator.execute_task(Task::new("text_generation")).await;
    match result {
        Err(OrchestratorError::NoSuitableAgent { task_type }) => {
            assert_eq!(task_type, "text_generation");
        }
        other => panic!("expected NoSuitableAgent, got {other:?}"),
    }
}

#[tokio::test]
async fn test_busy_agent_is_never_reselected() {
    let orchestrator = Arc::new(Orchestrator::new());
    let config = AgentConfig::new(AgentKind::Mock, "slow")
        .with_entry("min_processing_time_ms", json!(300))
        .with_entry("max_processing_time_ms", json!(300))
        .with_entry("failure_rate", json!(0.0));
    orchestrator.instantiate(&config).await.unwrap();

    let background = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.execute_task(Task::new("anything")).await })
    };

    // Give the first task time to mark the agent Busy, then try again
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = orchestrator.execute_task(Task::new("anything")).await;
    assert!(matches!(second, Err(OrchestratorError::NoSuitableAgent { .. })));

    let first = background.await.unwrap().unwrap();
    assert!(first.success);
}

#[tokio::test]
async fn test_mock_failure_rate_boundaries() {
    let orchestrator = Orchestrator::new();
    orchestrator.instantiate(&mock_config("always-fails", 1.0)).await.unwrap();

    for _ in 0..20 {
        let result = orchestrator.execute_task(Task::new("anything")).await.unwrap();
        assert!(!result.success);
    }

    let orchestrator = Orchestrator::new();
    orchestrator.instantiate(&mock_config("never-fails", 0.0)).await.unwrap();

    for _ in 0..20 {
        let result = orchestrator.execute_task(Task::new("anything")).await.unwrap();
        assert!(result.success);
    }
}

#[tokio::test]
async fn test_validate_and_instantiate_every_kind() -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new();

    let configs = vec![
        AgentConfig::new(AgentKind::Ai, "assistant").with_entry("api_key", json!("sk-test-key")),
        AgentConfig::new(AgentKind::Http, "caller")
            .with_entry("base_url", json!("https://example.test")),
        AgentConfig::new(AgentKind::Workflow, "flow")
            .with_entry("steps", json!([{"type": "log", "config": {"message": "hi"}}])),
        AgentConfig::new(AgentKind::Adapter, "bridge"),
        AgentConfig::new(AgentKind::Mock, "double"),
    ];

    for config in configs {
        let agent = orchestrator.instantiate(&config).await?;
        assert_eq!(agent.kind(), config.kind);
        assert!(agent.is_healthy().await);
    }

    assert_eq!(orchestrator.agent_count().await, 5);
    Ok(())
}

#[tokio::test]
async fn test_share_context_exact_projection() -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new();
    let from = orchestrator.instantiate(&mock_config("from", 0.0)).await?;
    let to = orchestrator.instantiate(&mock_config("to", 0.0)).await?;

    let mut from_ctx = HashMap::new();
    from_ctx.insert("lang".to_string(), json!("es"));
    from_ctx.insert("tz".to_string(), json!("UTC"));
    orchestrator.pass_context(from.id(), from_ctx).await?;

    let mut to_ctx = HashMap::new();
    to_ctx.insert("previous".to_string(), json!("value"));
    orchestrator.pass_context(to.id(), to_ctx).await?;

    orchestrator.share_context(from.id(), to.id(), &["lang".to_string()]).await?;

    let shared = to.context().await;
    let mut expected = HashMap::new();
    expected.insert("lang".to_string(), json!("es"));
    assert_eq!(shared, expected);

    let source = from.context().await;
    assert_eq!(source.len(), 2);
    assert_eq!(source.get("lang"), Some(&json!("es")));
    Ok(())
}

#[tokio::test]
async fn test_workflow_stop_at_second_step() -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new();
    let config = AgentConfig::new(AgentKind::Workflow, "flow").with_entry(
        "steps",
        json!([
            {"type": "log", "config": {"message": "first"}},
            {"type": "transform", "config": {"operation": "explode"}, "on_error": "stop"},
            {"type": "log", "config": {"message": "third"}},
        ]),
    );
    orchestrator.instantiate(&config).await?;

    let result = orchestrator.execute_task(Task::new("workflow")).await?;

    assert!(!result.success);
    assert_eq!(result.output.get("failed_at_step"), Some(&json!(2)));
    let completed = result.output.get("completed_steps").and_then(Value::as_array).unwrap();
    assert_eq!(completed.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_http_agent_end_to_end_success() -> anyhow::Result<()> {
    let addr = spawn_http_server("200 OK", r#"{"status":"ok"}"#).await;

    let orchestrator = Orchestrator::new();
    let config = AgentConfig::new(AgentKind::Http, "caller")
        .with_entry("base_url", json!(format!("http://{addr}")));
    orchestrator.instantiate(&config).await?;

    let task = Task::new("http_request")
        .with_input("endpoint", json!("/status"))
        .with_input("method", json!("GET"));
    let result = orchestrator.execute_task(task).await?;

    let status_code = result.output.get("status_code").and_then(Value::as_u64).unwrap();
    assert_eq!(status_code, 200);
    assert!(result.success);
    assert_eq!(result.output.get("body"), Some(&json!({"status": "ok"})));
    Ok(())
}

#[tokio::test]
async fn test_http_agent_end_to_end_failure_status() -> anyhow::Result<()> {
    let addr = spawn_http_server("404 Not Found", r#"{"error":"missing"}"#).await;

    let orchestrator = Orchestrator::new();
    let config = AgentConfig::new(AgentKind::Http, "caller")
        .with_entry("base_url", json!(format!("http://{addr}")));
    orchestrator.instantiate(&config).await?;

    let task = Task::new("http_request")
        .with_input("endpoint", json!("/status"))
        .with_input("method", json!("GET"));
    let result = orchestrator.execute_task(task).await?;

    let status_code = result.output.get("status_code").and_then(Value::as_u64).unwrap();
    assert_eq!(status_code, 404);
    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("404"));
    Ok(())
}

#[tokio::test]
async fn test_ai_agent_mock_mode_end_to_end() -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new();
    let config =
        AgentConfig::new(AgentKind::Ai, "assistant").with_entry("api_key", json!("sk-test-key"));
    orchestrator.instantiate(&config).await?;

    let task = Task::new("text_generation")
        .with_input("prompt", json!("Please write a summary of this quarter"));
    let result = orchestrator.execute_task(task).await?;

    assert!(result.success);
    let text = result.output.get("text").and_then(Value::as_str).unwrap();
    assert!(text.starts_with("Summary:"));
    assert_eq!(result.metadata.get("mode"), Some(&json!("mock")));
    Ok(())
}

#[tokio::test]
async fn test_task_timeout_bounds_execution() -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new();
    let config = AgentConfig::new(AgentKind::Mock, "sluggish")
        .with_entry("min_processing_time_ms", json!(500))
        .with_entry("max_processing_time_ms", json!(500))
        .with_entry("failure_rate", json!(0.0));
    orchestrator.instantiate(&config).await?;

    let task = Task::new("anything").with_timeout(Duration::from_millis(50));
    let result = orchestrator.execute_task(task).await?;

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("timed out"));
    Ok(())
}

#[tokio::test]
async fn test_adapter_agent_meta_operations() -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new();
    orchestrator.instantiate(&AgentConfig::new(AgentKind::Adapter, "bridge")).await?;

    let created = orchestrator
        .execute_task(
            Task::new("create_adapter")
                .with_input("adapter_type", json!("http"))
                .with_input("adapter_name", json!("integration-http")),
        )
        .await?;
    assert!(created.success);

    let listed = orchestrator.execute_task(Task::new("list_adapters")).await?;
    assert!(listed.success);
    assert_eq!(listed.output.get("count"), Some(&json!(1)));

    let health = orchestrator.execute_task(Task::new("adapter_health")).await?;
    assert!(health.success);
    assert_eq!(health.output.get("healthy_count"), Some(&json!(1)));
    Ok(())
}
