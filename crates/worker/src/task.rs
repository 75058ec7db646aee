//! 任务执行单元
//!
//! A [`Task`] is what the worker pool actually runs: a payload, the executor
//! that knows what to do with it and an optional completion callback through
//! which the outcome flows back to whoever submitted it.
//!
//! ## Cancellation contract
//!
//! Workers never abort an executor. When a task exceeds the pool's
//! `task_timeout`, the worker cancels the task's [`CancellationToken`], reports
//! [`SchedulerError::TaskTimeout`] and moves on; the executor keeps running
//! detached until it returns. Implementations of [`TaskExecutor`] are therefore
//! required to watch the token and return promptly once it fires.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use jobflow_core::models::DEFAULT_PRIORITY;
use jobflow_core::{SchedulerError, SchedulerResult};

pub type TaskId = String;

#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Runs the work for `payload`. Must return soon after `cancellation` fires.
    async fn execute(
        &self,
        payload: serde_json::Value,
        cancellation: CancellationToken,
    ) -> SchedulerResult<()>;

    fn name(&self) -> &str {
        "executor"
    }
}

/// Adapts an async closure into a [`TaskExecutor`].
///
/// ```rust
/// use jobflow_worker::task::FnExecutor;
///
/// let executor = FnExecutor::new(|payload, _cancel| async move {
///     println!("running {payload}");
///     Ok(())
/// });
/// # let _ = executor;
/// ```
pub struct FnExecutor<F, Fut> {
    name: String,
    func: F,
    _marker: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnExecutor<F, Fut> {
    pub fn new(func: F) -> Self
    where
        F: Fn(serde_json::Value, CancellationToken) -> Fut + Send + Sync,
        Fut: Future<Output = SchedulerResult<()>> + Send + 'static,
    {
        Self::named("fn", func)
    }

    pub fn named(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(serde_json::Value, CancellationToken) -> Fut + Send + Sync,
        Fut: Future<Output = SchedulerResult<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            func,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> TaskExecutor for FnExecutor<F, Fut>
where
    F: Fn(serde_json::Value, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = SchedulerResult<()>> + Send + 'static,
{
    async fn execute(
        &self,
        payload: serde_json::Value,
        cancellation: CancellationToken,
    ) -> SchedulerResult<()> {
        (self.func)(payload, cancellation).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Result of one task run, handed to the task's completion callback.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task_id: TaskId,
    pub result: SchedulerResult<()>,
    pub duration: Duration,
    /// `None` when the task never reached a worker (e.g. dropped at shutdown).
    pub worker_index: Option<usize>,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub(crate) fn rejected(task_id: TaskId, error: SchedulerError) -> Self {
        Self {
            task_id,
            result: Err(error),
            duration: Duration::ZERO,
            worker_index: None,
        }
    }
}

pub type CompletionCallback = Box<dyn FnOnce(TaskOutcome) -> BoxFuture<'static, ()> + Send>;

/// Executable unit handed to the worker pool.
pub struct Task {
    pub id: TaskId,
    pub payload: serde_json::Value,
    pub priority: u8,
    pub created_at: DateTime<Utc>,
    pub(crate) executor: Arc<dyn TaskExecutor>,
    pub(crate) on_complete: Option<CompletionCallback>,
}

impl Task {
    pub fn new(
        id: impl Into<TaskId>,
        payload: serde_json::Value,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        Self {
            id: id.into(),
            payload,
            priority: DEFAULT_PRIORITY,
            created_at: Utc::now(),
            executor,
            on_complete: None,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Registers the callback invoked exactly once with the task's outcome.
    pub fn on_complete<F, Fut>(mut self, callback: F) -> Self
    where
        F: FnOnce(TaskOutcome) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_complete = Some(Box::new(move |outcome| callback(outcome).boxed()));
        self
    }

    pub fn executor_name(&self) -> &str {
        self.executor.name()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("created_at", &self.created_at)
            .field("executor", &self.executor.name())
            .field("has_callback", &self.on_complete.is_some())
            .finish()
    }
}
