//! End-to-end tests for the bounded queue and worker pool.

use hive_abstraction::{AgentConfig, AgentKind, AsyncTask, AsyncTaskStatus, TaskFilters};
use hive_orchestrator::{Orchestrator, TaskManager, TaskManagerError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

async fn orchestrator_with_mock(name: &str, delay_ms: u64) -> Arc<Orchestrator> {
    let orchestrator = Arc::new(Orchestrator::new());
    let config = AgentConfig::new(AgentKind::Mock, name)
        .with_entry("min_processing_time_ms", json!(delay_ms))
        .with_entry("max_processing_time_ms", json!(delay_ms))
        .with_entry("failure_rate", json!(0.0));
    orchestrator.instantiate(&config).await.unwrap();
    orchestrator
}

async fn wait_for_terminal(manager: &TaskManager, task_id: &str) -> AsyncTask {
    for _ in 0..400 {
        let task = manager.get(task_id).await.unwrap();
        if task.status.is_terminal() {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {task_id} never reached a terminal state");
}

async fn wait_for_running(manager: &TaskManager, task_id: &str) {
    for _ in 0..400 {
        let task = manager.get(task_id).await.unwrap();
        if task.status != AsyncTaskStatus::Pending {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {task_id} never left the queue");
}

#[tokio::test]
async fn test_full_lifecycle() -> anyhow::Result<()> {
    let orchestrator = orchestrator_with_mock("double", 0).await;
    let manager = TaskManager::new(orchestrator, 2, 10);
    manager.start().await?;

    let task = AsyncTask::new("mock").with_user("user-1").with_bot("bot-1");
    let task_id = manager.submit(task).await?;

    let stored = manager.get(&task_id).await?;
    assert!(matches!(stored.status, AsyncTaskStatus::Pending | AsyncTaskStatus::Running));

    let finished = wait_for_terminal(&manager, &task_id).await;
    assert_eq!(finished.status, AsyncTaskStatus::Completed);
    assert_eq!(finished.result.get("success"), Some(&json!(true)));
    assert!(finished.result.contains_key("agent_id"));

    let stats = manager.stats().await;
    assert_eq!(stats.total_tasks, 1);
    assert_eq!(stats.completed_tasks, 1);
    assert_eq!(stats.running_tasks, 0);

    manager.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_queue_backpressure_fails_fast() -> anyhow::Result<()> {
    // One slow worker and a single queue slot
    let orchestrator = orchestrator_with_mock("slow", 500).await;
    let manager = TaskManager::new(orchestrator, 1, 1);
    manager.start().await?;

    // First task occupies the worker
    let running_id = manager.submit(AsyncTask::new("mock")).await?;
    wait_for_running(&manager, &running_id).await;

    // Second task fills the only queue slot
    let queued_id = manager.submit(AsyncTask::new("mock")).await?;

    // Third submission must fail immediately, and the record is auditable
    let rejected = manager.submit(AsyncTask::new("mock").with_id("rejected")).await;
    assert!(matches!(rejected, Err(TaskManagerError::QueueFull)));

    let stored = manager.get("rejected").await?;
    assert_eq!(stored.status, AsyncTaskStatus::Failed);
    assert_eq!(stored.error.as_deref(), Some("task queue is full"));
    assert!(stored.completed_at.is_some());

    // The queued task is untouched by the rejection
    let queued = manager.get(&queued_id).await?;
    assert!(!matches!(queued.status, AsyncTaskStatus::Failed));

    manager.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_cancel_terminal_task_leaves_record_unchanged() -> anyhow::Result<()> {
    let orchestrator = orchestrator_with_mock("double", 0).await;
    let manager = TaskManager::new(orchestrator, 1, 10);
    manager.start().await?;

    let task_id = manager.submit(AsyncTask::new("mock")).await?;
    let finished = wait_for_terminal(&manager, &task_id).await;
    assert_eq!(finished.status, AsyncTaskStatus::Completed);

    let result = manager.cancel(&task_id).await;
    assert!(matches!(
        result,
        Err(TaskManagerError::InvalidCancel { status: AsyncTaskStatus::Completed })
    ));

    let after = manager.get(&task_id).await?;
    assert_eq!(after.status, AsyncTaskStatus::Completed);
    assert_eq!(after.completed_at, finished.completed_at);

    manager.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_single_worker_preserves_fifo_order() -> anyhow::Result<()> {
    let orchestrator = orchestrator_with_mock("double", 10).await;
    let manager = TaskManager::new(orchestrator, 1, 10);
    manager.start().await?;

    let first = manager.submit(AsyncTask::new("mock")).await?;
    let second = manager.submit(AsyncTask::new("mock")).await?;

    let first_done = wait_for_terminal(&manager, &first).await;
    let second_done = wait_for_terminal(&manager, &second).await;

    assert!(first_done.completed_at.unwrap() <= second_done.completed_at.unwrap());

    manager.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_worker_stats_track_executions() -> anyhow::Result<()> {
    let orchestrator = orchestrator_with_mock("double", 0).await;
    let manager = TaskManager::new(orchestrator, 1, 10);
    manager.start().await?;

    let first = manager.submit(AsyncTask::new("mock")).await?;
    let second = manager.submit(AsyncTask::new("mock")).await?;
    wait_for_terminal(&manager, &first).await;
    wait_for_terminal(&manager, &second).await;

    let stats = manager.stats().await;
    let worker = stats.worker_stats.get("worker-1").unwrap();
    assert_eq!(worker.tasks_executed, 2);
    assert!(worker.last_task.is_some());

    manager.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_list_with_owner_filters_and_pagination() -> anyhow::Result<()> {
    let orchestrator = orchestrator_with_mock("double", 0).await;
    let manager = TaskManager::new(orchestrator, 1, 20);
    manager.start().await?;

    for index in 0..4 {
        let task = AsyncTask::new("mock").with_user(if index % 2 == 0 { "alice" } else { "bob" });
        manager.submit(task).await?;
    }

    let filters = TaskFilters { user_id: Some("alice".to_string()), ..TaskFilters::default() };
    assert_eq!(manager.list(&filters).await.len(), 2);

    let filters = TaskFilters {
        user_id: Some("alice".to_string()),
        limit: 1,
        ..TaskFilters::default()
    };
    assert_eq!(manager.list(&filters).await.len(), 1);

    let filters = TaskFilters {
        user_id: Some("alice".to_string()),
        offset: 5,
        ..TaskFilters::default()
    };
    assert!(manager.list(&filters).await.is_empty());

    manager.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_stop_then_submit_is_rejected() -> anyhow::Result<()> {
    let orchestrator = orchestrator_with_mock("double", 0).await;
    let manager = TaskManager::new(orchestrator, 1, 10);
    manager.start().await?;
    manager.stop().await?;

    let result = manager.submit(AsyncTask::new("mock")).await;
    assert!(matches!(result, Err(TaskManagerError::NotStarted)));
    Ok(())
}
