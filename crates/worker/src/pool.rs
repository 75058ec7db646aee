//! 自适应工作池
//!
//! A bounded `mpsc` channel is shared by every worker behind an async mutex,
//! which turns it into a multi-consumer queue. The number of live workers
//! follows a target that the scale monitor doubles or halves based on queue
//! utilization; workers whose index falls outside the target retire on their
//! own the next time they are idle.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use jobflow_core::{MetricsCollector, PoolConfig, SchedulerError, SchedulerResult, StructuredLogger};

use crate::task::{Task, TaskOutcome};

/// Upper bound on how long an idle worker waits before re-checking whether it
/// should retire.
const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Result of one scale check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleDecision {
    Hold { workers: usize, utilization: f64 },
    Up { from: usize, to: usize, utilization: f64 },
    Down { from: usize, to: usize, utilization: f64 },
}

impl ScaleDecision {
    /// Target worker count after the decision.
    pub fn target(&self) -> usize {
        match *self {
            ScaleDecision::Hold { workers, .. } => workers,
            ScaleDecision::Up { to, .. } | ScaleDecision::Down { to, .. } => to,
        }
    }

    pub fn is_scale_event(&self) -> bool {
        !matches!(self, ScaleDecision::Hold { .. })
    }
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolStats {
    pub current_workers: usize,
    pub target_workers: usize,
    pub busy_workers: usize,
    pub queue_len: usize,
    pub queue_capacity: usize,
    pub utilization: f64,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub timed_out_tasks: u64,
}

enum Dequeue {
    Task(Task),
    Idle,
    Closed,
}

struct WorkerSet {
    /// Indexed by worker index, sized to `max_workers`.
    alive: Vec<bool>,
    handles: Vec<JoinHandle<()>>,
    monitor: Option<JoinHandle<()>>,
}

struct PoolInner {
    config: PoolConfig,
    sender: mpsc::Sender<Task>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Task>>,
    workers: Mutex<WorkerSet>,
    // Written only while `workers` is locked.
    target: AtomicUsize,
    active: AtomicUsize,
    busy: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    closed: AtomicBool,
    cancel: CancellationToken,
    metrics: Arc<MetricsCollector>,
}

/// Adaptively sized pool of tokio worker tasks.
///
/// Cloning is cheap and every clone drives the same pool. Call
/// [`WorkerPool::shutdown`] to stop it; dropping the handles does not stop
/// the workers.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Creates the pool and spawns `min_workers` workers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: PoolConfig) -> SchedulerResult<Self> {
        Self::with_metrics(config, Arc::new(MetricsCollector::new()))
    }

    pub fn with_metrics(config: PoolConfig, metrics: Arc<MetricsCollector>) -> SchedulerResult<Self> {
        config.validate()?;
        tokio::runtime::Handle::try_current().map_err(|_| {
            SchedulerError::Internal("worker pool must be created inside a tokio runtime".to_string())
        })?;

        let (sender, receiver) = mpsc::channel(config.queue_size);
        let inner = Arc::new(PoolInner {
            sender,
            receiver: tokio::sync::Mutex::new(receiver),
            workers: Mutex::new(WorkerSet {
                alive: vec![false; config.max_workers],
                handles: Vec::with_capacity(config.max_workers),
                monitor: None,
            }),
            target: AtomicUsize::new(config.min_workers),
            active: AtomicUsize::new(0),
            busy: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            metrics,
            config,
        });

        {
            let mut set = inner.lock_workers();
            inner.spawn_missing(&mut set, inner.config.min_workers);
            if inner.config.adaptive_scaling {
                set.monitor = Some(tokio::spawn(Arc::clone(&inner).monitor_loop()));
            }
        }
        inner.refresh_gauges();

        info!(
            min_workers = inner.config.min_workers,
            max_workers = inner.config.max_workers,
            queue_size = inner.config.queue_size,
            adaptive_scaling = inner.config.adaptive_scaling,
            "worker pool started"
        );

        Ok(Self { inner })
    }

    /// Enqueues a task without waiting.
    ///
    /// A rejected task is dropped and its completion callback is never called;
    /// the error is the caller's only signal.
    pub fn submit(&self, task: Task) -> SchedulerResult<()> {
        if self.is_closed() {
            return Err(SchedulerError::PoolClosed);
        }

        match self.inner.sender.try_send(task) {
            Ok(()) => {
                self.inner.metrics.record_job_queued();
                self.inner.refresh_gauges();
                Ok(())
            }
            Err(TrySendError::Full(task)) => {
                warn!(
                    task.id = %task.id,
                    queue_capacity = self.queue_capacity(),
                    "task queue full, rejecting submission"
                );
                Err(SchedulerError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(SchedulerError::PoolClosed),
        }
    }

    /// Runs one scale check. The monitor calls this every
    /// `scale_check_interval` when adaptive scaling is enabled.
    pub fn check_and_scale(&self) -> ScaleDecision {
        self.inner.check_and_scale()
    }

    /// Stops accepting tasks, cancels every worker and waits up to `timeout`
    /// for them to exit.
    ///
    /// Tasks still queued are dropped and their callbacks receive
    /// [`SchedulerError::PoolClosed`]. In-flight tasks see their cancellation
    /// token fire. Calling this more than once is a no-op.
    pub async fn shutdown(&self, timeout_after: Duration) -> SchedulerResult<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            debug!("worker pool already shut down");
            return Ok(());
        }

        info!(
            workers = self.current_workers(),
            queued = self.queue_len(),
            "shutting down worker pool"
        );
        self.inner.cancel.cancel();
        self.inner.reject_queued().await;

        let (handles, monitor) = {
            let mut set = self.inner.lock_workers();
            (std::mem::take(&mut set.handles), set.monitor.take())
        };

        match timeout(timeout_after, join_all(handles.into_iter().chain(monitor))).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        if e.is_panic() {
                            error!(error = %e, "worker panicked");
                        }
                    }
                }
                self.inner.refresh_gauges();
                info!("worker pool stopped");
                Ok(())
            }
            Err(_) => {
                warn!(
                    abandoned_workers = self.current_workers(),
                    timeout = ?timeout_after,
                    "worker pool shutdown timed out, abandoning remaining workers"
                );
                Err(SchedulerError::ShutdownTimeout(timeout_after))
            }
        }
    }

    pub fn current_workers(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn target_workers(&self) -> usize {
        self.inner.target.load(Ordering::SeqCst)
    }

    pub fn queue_len(&self) -> usize {
        self.inner.queue_len()
    }

    pub fn queue_capacity(&self) -> usize {
        self.inner.config.queue_size
    }

    /// Queue fill ratio in `[0, 1]`.
    pub fn utilization(&self) -> f64 {
        self.inner.utilization()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            current_workers: self.current_workers(),
            target_workers: self.target_workers(),
            busy_workers: self.inner.busy.load(Ordering::SeqCst),
            queue_len: self.queue_len(),
            queue_capacity: self.queue_capacity(),
            utilization: self.utilization(),
            completed_tasks: self.inner.completed.load(Ordering::Relaxed),
            failed_tasks: self.inner.failed.load(Ordering::Relaxed),
            timed_out_tasks: self.inner.timed_out.load(Ordering::Relaxed),
        }
    }
}

impl PoolInner {
    fn lock_workers(&self) -> MutexGuard<'_, WorkerSet> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn queue_len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    fn utilization(&self) -> f64 {
        self.queue_len() as f64 / self.config.queue_size as f64
    }

    fn refresh_gauges(&self) {
        self.metrics
            .update_active_workers(self.active.load(Ordering::SeqCst));
        self.metrics.update_queue_size(self.queue_len());
        self.metrics.update_pool_utilization(self.utilization());
    }

    /// Spawns a worker for every index below `target` that has none.
    fn spawn_missing(self: &Arc<Self>, set: &mut WorkerSet, target: usize) {
        for index in 0..target {
            if set.alive[index] {
                continue;
            }
            set.alive[index] = true;
            self.active.fetch_add(1, Ordering::SeqCst);
            let inner = Arc::clone(self);
            set.handles.push(tokio::spawn(inner.worker_loop(index)));
            debug!(worker.index = index, "worker spawned");
        }
    }

    fn check_and_scale(self: &Arc<Self>) -> ScaleDecision {
        let utilization = self.utilization();
        let min = self.config.min_workers;
        let max = self.config.max_workers;

        let decision = {
            let mut set = self.lock_workers();
            let current = self.target.load(Ordering::SeqCst);
            if self.closed.load(Ordering::SeqCst) {
                return ScaleDecision::Hold {
                    workers: current,
                    utilization,
                };
            }

            let decision = if utilization > self.config.scale_up_threshold && current < max {
                ScaleDecision::Up {
                    from: current,
                    to: (current * 2).min(max),
                    utilization,
                }
            } else if utilization < self.config.scale_down_threshold && current > min {
                ScaleDecision::Down {
                    from: current,
                    to: (current / 2).max(min),
                    utilization,
                }
            } else {
                ScaleDecision::Hold {
                    workers: current,
                    utilization,
                }
            };

            self.target.store(decision.target(), Ordering::SeqCst);
            self.spawn_missing(&mut set, decision.target());
            set.handles.retain(|handle| !handle.is_finished());
            decision
        };

        if let ScaleDecision::Up { from, to, .. } | ScaleDecision::Down { from, to, .. } = decision {
            self.metrics.record_scale_event();
            StructuredLogger::log_scale_event(from, to, utilization);
        }
        self.refresh_gauges();
        decision
    }

    async fn monitor_loop(self: Arc<Self>) {
        let mut ticker = interval(self.config.scale_check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.check_and_scale();
                }
            }
        }
        debug!("scale monitor stopped");
    }

    /// Retires the worker if the target no longer covers its index.
    fn retire_if_surplus(&self, index: usize) -> bool {
        let mut set = self.lock_workers();
        if index < self.target.load(Ordering::SeqCst) {
            return false;
        }
        self.mark_exited(&mut set, index);
        true
    }

    fn mark_exited(&self, set: &mut WorkerSet, index: usize) {
        if set.alive[index] {
            set.alive[index] = false;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    async fn next_task(&self) -> Dequeue {
        let recv = async {
            let mut receiver = self.receiver.lock().await;
            receiver.recv().await
        };
        match timeout(IDLE_POLL_INTERVAL, recv).await {
            Ok(Some(task)) => Dequeue::Task(task),
            Ok(None) => Dequeue::Closed,
            Err(_) => Dequeue::Idle,
        }
    }

    async fn worker_loop(self: Arc<Self>, index: usize) {
        loop {
            if self.retire_if_surplus(index) {
                debug!(worker.index = index, "worker retired after scale down");
                self.refresh_gauges();
                return;
            }

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                next = self.next_task() => next,
            };

            match next {
                Dequeue::Task(task) => self.run_task(index, task).await,
                Dequeue::Idle => continue,
                Dequeue::Closed => break,
            }
        }

        {
            let mut set = self.lock_workers();
            self.mark_exited(&mut set, index);
        }
        debug!(worker.index = index, "worker stopped");
    }

    async fn run_task(&self, index: usize, mut task: Task) {
        self.busy.fetch_add(1, Ordering::SeqCst);
        self.refresh_gauges();

        let started = Instant::now();
        let token = self.cancel.child_token();
        let executor = Arc::clone(&task.executor);
        let payload = std::mem::take(&mut task.payload);
        let execution_token = token.clone();
        let mut handle =
            tokio::spawn(async move { executor.execute(payload, execution_token).await });

        let result = match timeout(self.config.task_timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                error!(
                    task.id = %task.id,
                    worker.index = index,
                    error = %join_error,
                    "task executor panicked"
                );
                Err(SchedulerError::execution(format!("task panicked: {join_error}")))
            }
            Err(_) => {
                // The executor keeps running detached; it is expected to
                // observe the token and return on its own.
                token.cancel();
                self.timed_out.fetch_add(1, Ordering::Relaxed);
                warn!(
                    task.id = %task.id,
                    worker.index = index,
                    timeout = ?self.config.task_timeout,
                    "task timed out"
                );
                Err(SchedulerError::TaskTimeout(self.config.task_timeout))
            }
        };

        let duration = started.elapsed();
        self.metrics.record_task_duration(duration);
        match &result {
            Ok(()) => self.completed.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.failed.fetch_add(1, Ordering::Relaxed),
        };
        debug!(
            task.id = %task.id,
            worker.index = index,
            duration_ms = duration.as_millis() as u64,
            success = result.is_ok(),
            "task finished"
        );

        if let Some(callback) = task.on_complete.take() {
            callback(TaskOutcome {
                task_id: task.id.clone(),
                result,
                duration,
                worker_index: Some(index),
            })
            .await;
        }

        self.busy.fetch_sub(1, Ordering::SeqCst);
        self.refresh_gauges();
    }

    /// Closes the queue and hands every still-queued task back to its owner.
    async fn reject_queued(&self) {
        let mut dropped = Vec::new();
        {
            let mut receiver = self.receiver.lock().await;
            receiver.close();
            while let Ok(task) = receiver.try_recv() {
                dropped.push(task);
            }
        }

        if !dropped.is_empty() {
            warn!(count = dropped.len(), "dropping queued tasks on shutdown");
        }
        for mut task in dropped {
            if let Some(callback) = task.on_complete.take() {
                callback(TaskOutcome::rejected(task.id.clone(), SchedulerError::PoolClosed)).await;
            }
        }
        self.refresh_gauges();
    }
}
