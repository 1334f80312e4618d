use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(String),
    #[error("Task already exists: {0}")]
    AlreadyExists(String),
    #[error("Task group '{0}' is closed")]
    Closed(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskInfo {
    pub id: String,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub error: Option<String>,
}

struct TaskHandle {
    info: TaskInfo,
    starts_at: Instant,
    handle: Option<JoinHandle<()>>,
}

impl TaskHandle {
    async fn settle(&mut self) {
        let Some(handle) = &mut self.handle else {
            return;
        };

        if handle.is_finished() {
            let result = handle.await;
            self.handle = None;
            match result {
                Ok(()) => self.info.status = TaskStatus::Completed,
                Err(e) if e.is_cancelled() => self.info.status = TaskStatus::Cancelled,
                Err(e) => {
                    self.info.status = TaskStatus::Failed;
                    self.info.error = Some(e.to_string());
                }
            }
            self.info.updated_at = chrono::Utc::now().timestamp();
        } else if self.info.status == TaskStatus::Pending && Instant::now() >= self.starts_at {
            self.info.status = TaskStatus::Running;
            self.info.updated_at = chrono::Utc::now().timestamp();
        }
    }

    fn is_live(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[derive(Default)]
struct Registry {
    closed: bool,
    tasks: HashMap<String, TaskHandle>,
}

/// Background tasks that live and die together.
///
/// Once [`cancel_all`](TaskGroup::cancel_all) has run the group refuses new
/// work, so nothing scheduled by a stale caller can outlive the owner.
pub struct TaskGroup {
    name: String,
    registry: Mutex<Registry>,
}

impl TaskGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn spawn_task<F>(
        &self,
        id: impl Into<String>,
        description: impl Into<String>,
        task: F,
    ) -> Result<String, TaskError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.insert(id.into(), description.into(), Duration::ZERO, task)
            .await
    }

    /// Runs `task` once `delay` has elapsed, unless cancelled first.
    pub async fn spawn_after<F>(
        &self,
        id: impl Into<String>,
        description: impl Into<String>,
        delay: Duration,
        task: F,
    ) -> Result<String, TaskError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.insert(id.into(), description.into(), delay, task).await
    }

    async fn insert<F>(
        &self,
        id: String,
        description: String,
        delay: Duration,
        task: F,
    ) -> Result<String, TaskError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut registry = self.registry.lock().await;
        if registry.closed {
            return Err(TaskError::Closed(self.name.clone()));
        }
        if registry.tasks.contains_key(&id) {
            return Err(TaskError::AlreadyExists(id));
        }

        let now = chrono::Utc::now().timestamp();
        let status = if delay.is_zero() {
            TaskStatus::Running
        } else {
            TaskStatus::Pending
        };
        let info = TaskInfo {
            id: id.clone(),
            description,
            status,
            created_at: now,
            updated_at: now,
            error: None,
        };

        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task.await;
        });

        registry.tasks.insert(
            id.clone(),
            TaskHandle {
                info,
                starts_at: Instant::now() + delay,
                handle: Some(handle),
            },
        );

        tracing::debug!("[{}] Spawned task: {} (delay {:?})", self.name, id, delay);
        Ok(id)
    }

    pub async fn get_status(&self, id: &str) -> Result<TaskInfo, TaskError> {
        let mut registry = self.registry.lock().await;
        let task = registry
            .tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.settle().await;
        Ok(task.info.clone())
    }

    pub async fn cancel_task(&self, id: &str) -> Result<(), TaskError> {
        let mut registry = self.registry.lock().await;
        let task = registry
            .tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;

        if let Some(handle) = task.handle.take() {
            handle.abort();
            task.info.status = TaskStatus::Cancelled;
            task.info.updated_at = chrono::Utc::now().timestamp();
            tracing::debug!("[{}] Cancelled task: {}", self.name, id);
        }
        Ok(())
    }

    /// Aborts every unfinished task and closes the group. Returns how many
    /// tasks were still live.
    pub async fn cancel_all(&self) -> usize {
        let mut registry = self.registry.lock().await;
        registry.closed = true;

        let now = chrono::Utc::now().timestamp();
        let mut cancelled = 0;
        for task in registry.tasks.values_mut() {
            let live = task.is_live();
            if let Some(handle) = task.handle.take() {
                handle.abort();
            }
            if live {
                task.info.status = TaskStatus::Cancelled;
                task.info.updated_at = now;
                cancelled += 1;
            }
        }

        if cancelled > 0 {
            tracing::info!("[{}] Cancelled {} pending task(s)", self.name, cancelled);
        }
        cancelled
    }

    pub async fn is_closed(&self) -> bool {
        self.registry.lock().await.closed
    }

    /// Number of tasks that have not finished yet.
    pub async fn live_count(&self) -> usize {
        let registry = self.registry.lock().await;
        registry.tasks.values().filter(|t| t.is_live()).count()
    }

    pub async fn list_tasks(&self) -> Vec<TaskInfo> {
        let mut registry = self.registry.lock().await;
        let mut result = Vec::with_capacity(registry.tasks.len());
        for task in registry.tasks.values_mut() {
            task.settle().await;
            result.push(task.info.clone());
        }
        result
    }

    pub async fn cleanup_completed(&self) {
        let mut registry = self.registry.lock().await;
        for task in registry.tasks.values_mut() {
            task.settle().await;
        }
        registry.tasks.retain(|_, task| {
            !matches!(
                task.info.status,
                TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
            )
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_spawn_and_complete() {
        let group = TaskGroup::new("test");

        let task_id = group
            .spawn_task("test_task", "Test task", async {
                tokio::time::sleep(Duration::from_millis(10)).await;
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        let status = group.get_status(&task_id).await.unwrap();
        assert_eq!(status.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_task() {
        let group = TaskGroup::new("test");

        let task_id = group
            .spawn_task("long_task", "Long task", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
            })
            .await
            .unwrap();

        group.cancel_task(&task_id).await.unwrap();

        let status = group.get_status(&task_id).await.unwrap();
        assert_eq!(status.status, TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let group = TaskGroup::new("test");
        group
            .spawn_task("same", "first", async {})
            .await
            .unwrap();
        let second = group.spawn_task("same", "second", async {}).await;
        assert!(matches!(second, Err(TaskError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_delayed_task_runs_after_delay() {
        let group = TaskGroup::new("test");
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let id = group
            .spawn_after("later", "Delayed", Duration::from_millis(40), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(group.get_status(&id).await.unwrap().status, TaskStatus::Pending);
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(group.get_status(&id).await.unwrap().status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_all_stops_pending_and_closes() {
        let group = TaskGroup::new("test");
        let runs = Arc::new(AtomicUsize::new(0));

        for i in 0..3 {
            let counter = Arc::clone(&runs);
            group
                .spawn_after(format!("t{i}"), "Delayed", Duration::from_millis(50), async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
        }

        assert_eq!(group.live_count().await, 3);
        assert_eq!(group.cancel_all().await, 3);
        assert!(group.is_closed().await);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        let late = group.spawn_task("late", "After close", async {}).await;
        assert!(matches!(late, Err(TaskError::Closed(_))));
    }

    #[tokio::test]
    async fn test_cleanup_completed() {
        let group = TaskGroup::new("test");
        group.spawn_task("quick", "Quick", async {}).await.unwrap();
        group
            .spawn_task("slow", "Slow", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        group.cleanup_completed().await;

        let remaining = group.list_tasks().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "slow");
        group.cancel_all().await;
    }
}
