//! Asynchronous task execution on a bounded queue and fixed worker pool.
//!
//! Submitters are producers, workers are consumers: a classic bounded
//! buffer. Submission never blocks; a full queue is an immediate
//! backpressure error and the task is recorded as failed so callers can
//! audit it. Workers delegate every execution to the orchestrator.

use crate::error::TaskManagerError;
use crate::Orchestrator;
use chrono::Utc;
use hive_abstraction::{AsyncTask, AsyncTaskStatus, Task, TaskFilters, TaskStats, WorkerStats};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const DEFAULT_WORKER_COUNT: usize = 5;
const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;

/// Live queue state, present only while the manager is running.
struct QueueState {
    sender: mpsc::Sender<String>,
    cancel: CancellationToken,
}

/// Bounded-queue task manager backed by a fixed pool of workers.
pub struct TaskManager {
    orchestrator: Arc<Orchestrator>,
    tasks: Arc<RwLock<HashMap<String, AsyncTask>>>,
    stats: Arc<RwLock<TaskStats>>,
    queue: RwLock<Option<QueueState>>,
    worker_count: usize,
    max_queue_size: usize,
}

impl TaskManager {
    /// Creates a stopped task manager.
    ///
    /// A `worker_count` or `max_queue_size` of zero selects the defaults
    /// (5 workers, 1000 queue slots).
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>, worker_count: usize, max_queue_size: usize) -> Self {
        let worker_count = if worker_count == 0 { DEFAULT_WORKER_COUNT } else { worker_count };
        let max_queue_size =
            if max_queue_size == 0 { DEFAULT_MAX_QUEUE_SIZE } else { max_queue_size };

        Self {
            orchestrator,
            tasks: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(TaskStats::default())),
            queue: RwLock::new(None),
            worker_count,
            max_queue_size,
        }
    }

    /// Starts the worker pool.
    ///
    /// # Errors
    /// Returns `AlreadyStarted` when the manager is running.
    pub async fn start(&self) -> Result<(), TaskManagerError> {
        let mut queue = self.queue.write().await;
        if queue.is_some() {
            return Err(TaskManagerError::AlreadyStarted);
        }

        let (sender, receiver) = mpsc::channel::<String>(self.max_queue_size);
        let receiver = Arc::new(Mutex::new(receiver));
        let cancel = CancellationToken::new();

        {
            let mut stats = self.stats.write().await;
            for index in 1..=self.worker_count {
                let worker_id = format!("worker-{index}");
                stats.worker_stats.insert(worker_id.clone(), WorkerStats::new(worker_id));
            }
        }

        for index in 1..=self.worker_count {
            let worker = Worker {
                id: format!("worker-{index}"),
                orchestrator: Arc::clone(&self.orchestrator),
                tasks: Arc::clone(&self.tasks),
                stats: Arc::clone(&self.stats),
            };
            let receiver = Arc::clone(&receiver);
            let cancel = cancel.clone();

            tokio::spawn(async move { worker.run(receiver, cancel).await });
        }

        *queue = Some(QueueState { sender, cancel });

        info!(
            worker_count = self.worker_count,
            max_queue_size = self.max_queue_size,
            "Task manager started"
        );
        Ok(())
    }

    /// Stops the worker pool and closes the queue.
    ///
    /// Running workers finish their current task and exit.
    ///
    /// # Errors
    /// Returns `NotStarted` when the manager is not running.
    pub async fn stop(&self) -> Result<(), TaskManagerError> {
        let mut queue = self.queue.write().await;
        match queue.take() {
            Some(state) => {
                state.cancel.cancel();
                drop(state.sender);
                info!("Task manager stopped");
                Ok(())
            }
            None => Err(TaskManagerError::NotStarted),
        }
    }

    /// Whether the worker pool is running.
    pub async fn is_running(&self) -> bool {
        self.queue.read().await.is_some()
    }

    /// Submits a task for asynchronous execution and returns its ID.
    ///
    /// The task is stored first, then enqueued without blocking. When the
    /// queue is full the stored record flips straight to Failed and the
    /// caller gets a `QueueFull` error; submission never waits for queue
    /// space.
    ///
    /// # Errors
    /// Returns `NotStarted` before `start`, or `QueueFull` on saturation.
    pub async fn submit(&self, mut task: AsyncTask) -> Result<String, TaskManagerError> {
        let queue = self.queue.read().await;
        let Some(state) = queue.as_ref() else {
            return Err(TaskManagerError::NotStarted);
        };

        if task.id.is_empty() {
            task.id = format!("task-{}", uuid::Uuid::new_v4());
        }
        let task_id = task.id.clone();
        let task_type = task.task_type.clone();

        let now = Utc::now();
        task.created_at = now;
        task.updated_at = now;
        task.status = AsyncTaskStatus::Pending;

        {
            let mut tasks = self.tasks.write().await;
            tasks.insert(task_id.clone(), task);
        }
        {
            let mut stats = self.stats.write().await;
            stats.total_tasks += 1;
            stats.pending_tasks += 1;
            *stats.tasks_by_type.entry(task_type.clone()).or_insert(0) += 1;
        }

        match state.sender.try_send(task_id.clone()) {
            Ok(()) => {
                info!(task_id = %task_id, task_type = %task_type, "Task submitted");
                Ok(task_id)
            }
            Err(send_error) => {
                // Queue saturated (or closing): record the failure so the
                // submission stays auditable, then signal backpressure
                let reason = match send_error {
                    mpsc::error::TrySendError::Full(_) => "task queue is full",
                    mpsc::error::TrySendError::Closed(_) => "task queue is closed",
                };

                {
                    let mut tasks = self.tasks.write().await;
                    if let Some(stored) = tasks.get_mut(&task_id) {
                        stored.status = AsyncTaskStatus::Failed;
                        stored.error = Some(reason.to_string());
                        stored.updated_at = Utc::now();
                        stored.completed_at = Some(Utc::now());
                    }
                }
                {
                    let mut stats = self.stats.write().await;
                    stats.pending_tasks = stats.pending_tasks.saturating_sub(1);
                    stats.failed_tasks += 1;
                }

                warn!(task_id = %task_id, reason, "Task rejected at submission");
                Err(TaskManagerError::QueueFull)
            }
        }
    }

    /// Returns a copy of the task record.
    ///
    /// # Errors
    /// Returns `TaskNotFound` for unknown IDs.
    pub async fn get(&self, task_id: &str) -> Result<AsyncTask, TaskManagerError> {
        let tasks = self.tasks.read().await;
        tasks.get(task_id).cloned().ok_or_else(|| TaskManagerError::TaskNotFound(task_id.to_string()))
    }

    /// Lists task records matching the filters, paginated by
    /// offset/limit after filtering.
    pub async fn list(&self, filters: &TaskFilters) -> Vec<AsyncTask> {
        let tasks = self.tasks.read().await;
        let mut matched: Vec<AsyncTask> =
            tasks.values().filter(|task| filters.matches(task)).cloned().collect();

        if filters.offset > 0 {
            if filters.offset >= matched.len() {
                return Vec::new();
            }
            matched.drain(..filters.offset);
        }
        if filters.limit > 0 && filters.limit < matched.len() {
            matched.truncate(filters.limit);
        }

        matched
    }

    /// Cancels a pending or running task.
    ///
    /// Cancellation is cooperative bookkeeping only: a worker already
    /// executing the task is not interrupted, but a task still queued is
    /// skipped when dequeued.
    ///
    /// # Errors
    /// Returns `TaskNotFound` for unknown IDs and `InvalidCancel` when the
    /// task is already terminal.
    pub async fn cancel(&self, task_id: &str) -> Result<(), TaskManagerError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskManagerError::TaskNotFound(task_id.to_string()))?;

        if task.status.is_terminal() {
            return Err(TaskManagerError::InvalidCancel { status: task.status });
        }

        let previous = task.status;
        task.status = AsyncTaskStatus::Cancelled;
        task.error = Some("task cancelled by user".to_string());
        task.updated_at = Utc::now();
        task.completed_at = Some(Utc::now());
        drop(tasks);

        {
            let mut stats = self.stats.write().await;
            match previous {
                AsyncTaskStatus::Pending => {
                    stats.pending_tasks = stats.pending_tasks.saturating_sub(1);
                }
                AsyncTaskStatus::Running => {
                    stats.running_tasks = stats.running_tasks.saturating_sub(1);
                }
                _ => {}
            }
            stats.cancelled_tasks += 1;
        }

        info!(task_id = %task_id, "Task cancelled");
        Ok(())
    }

    /// Returns a deep copy of the aggregate and per-worker statistics.
    pub async fn stats(&self) -> TaskStats {
        let mut snapshot = self.stats.read().await.clone();
        snapshot.last_updated = Some(Utc::now());
        snapshot
    }
}

/// One worker in the pool.
struct Worker {
    id: String,
    orchestrator: Arc<Orchestrator>,
    tasks: Arc<RwLock<HashMap<String, AsyncTask>>>,
    stats: Arc<RwLock<TaskStats>>,
}

impl Worker {
    /// Pulls tasks until the queue closes or the manager shuts down.
    async fn run(self, receiver: Arc<Mutex<mpsc::Receiver<String>>>, cancel: CancellationToken) {
        info!(worker_id = %self.id, "Task worker started");

        loop {
            let task_id = tokio::select! {
                () = cancel.cancelled() => {
                    info!(worker_id = %self.id, "Task worker stopped");
                    return;
                }
                received = async { receiver.lock().await.recv().await } => {
                    match received {
                        Some(task_id) => task_id,
                        None => {
                            info!(worker_id = %self.id, "Task worker stopped - queue closed");
                            return;
                        }
                    }
                }
            };

            self.execute(&task_id).await;
        }
    }

    /// Executes one dequeued task end to end.
    async fn execute(&self, task_id: &str) {
        let start = Instant::now();

        // Snapshot the record; skip tasks cancelled while still queued
        let task = {
            let mut tasks = self.tasks.write().await;
            let Some(task) = tasks.get_mut(task_id) else {
                warn!(worker_id = %self.id, task_id = %task_id, "Dequeued unknown task");
                return;
            };
            if task.status.is_terminal() {
                debug!(
                    worker_id = %self.id,
                    task_id = %task_id,
                    status = %task.status,
                    "Skipping terminal task"
                );
                return;
            }

            task.status = AsyncTaskStatus::Running;
            task.started_at = Some(Utc::now());
            task.updated_at = Utc::now();
            task.clone()
        };

        {
            let mut stats = self.stats.write().await;
            stats.pending_tasks = stats.pending_tasks.saturating_sub(1);
            stats.running_tasks += 1;
            if let Some(worker) = stats.worker_stats.get_mut(&self.id) {
                worker.status = "busy".to_string();
                worker.last_task = Some(task_id.to_string());
                worker.last_activity = Utc::now();
            }
        }

        info!(
            worker_id = %self.id,
            task_id = %task_id,
            task_type = %task.task_type,
            "Executing task"
        );

        let orchestrator_task = Task {
            id: task.id.clone(),
            task_type: task.task_type.clone(),
            description: task.description.clone(),
            input: task.input.clone(),
            priority: task.priority,
            timeout: task.timeout,
            context: task.context.clone(),
            metadata: task.metadata.clone(),
            created_at: task.created_at,
        };

        let outcome = self.orchestrator.execute_task_tracked(orchestrator_task).await;
        let duration = start.elapsed();

        {
            let mut tasks = self.tasks.write().await;
            if let Some(stored) = tasks.get_mut(task_id) {
                // A cancel that landed mid-execution wins: terminal
                // records are never rewritten
                if !stored.status.is_terminal() {
                    stored.updated_at = Utc::now();
                    stored.completed_at = Some(Utc::now());
                    stored.execution_time = Some(duration);

                    match &outcome {
                        Ok(result) if result.success => {
                            stored.status = AsyncTaskStatus::Completed;
                            stored.result = HashMap::from([
                                ("success".to_string(), json!(true)),
                                ("output".to_string(), json!(result.output)),
                                ("agent_id".to_string(), json!(result.agent_id)),
                                (
                                    "execution_time_ms".to_string(),
                                    json!(result.execution_time.as_millis() as u64),
                                ),
                            ]);
                        }
                        Ok(result) => {
                            stored.status = AsyncTaskStatus::Failed;
                            stored.error = result.error.clone();
                            stored.result = HashMap::from([
                                ("success".to_string(), json!(false)),
                                ("error".to_string(), json!(result.error)),
                            ]);
                        }
                        Err(e) => {
                            stored.status = AsyncTaskStatus::Failed;
                            stored.error = Some(e.to_string());
                            stored.result = HashMap::from([
                                ("success".to_string(), json!(false)),
                                ("error".to_string(), json!(e.to_string())),
                            ]);
                        }
                    }
                }
            }
        }

        let failed = match &outcome {
            Ok(result) => !result.success,
            Err(_) => true,
        };

        {
            let mut stats = self.stats.write().await;
            stats.running_tasks = stats.running_tasks.saturating_sub(1);
            if failed {
                stats.failed_tasks += 1;
            } else {
                stats.completed_tasks += 1;
            }

            let finished = stats.completed_tasks + stats.failed_tasks;
            if finished == 1 {
                stats.average_time = duration;
            } else {
                stats.average_time = (stats.average_time + duration) / 2;
            }

            if let Some(worker) = stats.worker_stats.get_mut(&self.id) {
                worker.status = "idle".to_string();
                worker.last_activity = Utc::now();
                worker.record(duration);
            }
        }

        if failed {
            error!(
                worker_id = %self.id,
                task_id = %task_id,
                duration_ms = duration.as_millis() as u64,
                "Task execution failed"
            );
        } else {
            info!(
                worker_id = %self.id,
                task_id = %task_id,
                duration_ms = duration.as_millis() as u64,
                "Task execution completed"
            );
        }
    }
}
