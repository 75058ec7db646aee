//! Test doubles for executors, hooks and cluster clients
//!
//! All doubles keep their state behind `Arc`s so a clone handed to the code
//! under test can be inspected from the test afterwards.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobflow_core::models::{Cluster, HookType, Job};
use jobflow_core::{ClusterClient, HookCallback, HookContext, SchedulerError, SchedulerResult};
use jobflow_worker::TaskExecutor;
use tokio_util::sync::CancellationToken;

pub use jobflow_core::MockClusterClient;

/// Executor that succeeds and records every payload it was given.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    payloads: Arc<Mutex<Vec<serde_json::Value>>>,
    delay: Option<Duration>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps for `delay` (or until cancelled) before succeeding.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            payloads: Arc::default(),
            delay: Some(delay),
        }
    }

    pub fn call_count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskExecutor for RecordingExecutor {
    async fn execute(
        &self,
        payload: serde_json::Value,
        cancellation: CancellationToken,
    ) -> SchedulerResult<()> {
        self.payloads.lock().unwrap().push(payload);
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancellation.cancelled() => {
                    return Err(SchedulerError::execution("cancelled"));
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Executor that fails its first `failures` calls, then succeeds.
#[derive(Clone)]
pub struct FlakyExecutor {
    failures: u32,
    error: String,
    calls: Arc<AtomicU32>,
}

impl FlakyExecutor {
    pub fn new(failures: u32, error: &str) -> Self {
        Self {
            failures,
            error: error.to_string(),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Never succeeds.
    pub fn always_failing(error: &str) -> Self {
        Self::new(u32::MAX, error)
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskExecutor for FlakyExecutor {
    async fn execute(
        &self,
        _payload: serde_json::Value,
        _cancellation: CancellationToken,
    ) -> SchedulerResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(SchedulerError::execution(self.error.clone()))
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Executor that blocks until its gate is opened.
///
/// A cooperative instance also returns as soon as its cancellation token
/// fires; a non-cooperative one ignores the token, which is how a misbehaving
/// executor looks to the pool.
#[derive(Clone)]
pub struct BlockingExecutor {
    gate: CancellationToken,
    cooperative: bool,
    started: Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
}

impl BlockingExecutor {
    pub fn new() -> Self {
        Self {
            gate: CancellationToken::new(),
            cooperative: true,
            started: Arc::new(AtomicUsize::new(0)),
            finished: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn non_cooperative() -> Self {
        Self {
            cooperative: false,
            ..Self::new()
        }
    }

    /// Releases every current and future execution.
    pub fn open(&self) {
        self.gate.cancel();
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Default for BlockingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskExecutor for BlockingExecutor {
    async fn execute(
        &self,
        _payload: serde_json::Value,
        cancellation: CancellationToken,
    ) -> SchedulerResult<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let result = if self.cooperative {
            tokio::select! {
                _ = self.gate.cancelled() => Ok(()),
                _ = cancellation.cancelled() => Err(SchedulerError::execution("cancelled")),
            }
        } else {
            self.gate.cancelled().await;
            Ok(())
        };
        self.finished.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &str {
        "blocking"
    }
}

/// One recorded hook call.
#[derive(Debug, Clone, PartialEq)]
pub struct HookInvocation {
    pub hook: String,
    pub job_id: String,
    pub hook_type: HookType,
    pub attempt: u32,
    pub error: Option<String>,
}

pub type HookLog = Arc<Mutex<Vec<HookInvocation>>>;

/// Hook that records each call into a (possibly shared) log.
pub struct RecordingHook {
    name: String,
    log: HookLog,
    failures_left: AtomicU32,
    delay: Option<Duration>,
}

impl RecordingHook {
    pub fn new(name: &str) -> Self {
        Self::with_log(name, HookLog::default())
    }

    /// Records into `log`, letting several hooks share one ordered history.
    pub fn with_log(name: &str, log: HookLog) -> Self {
        Self {
            name: name.to_string(),
            log,
            failures_left: AtomicU32::new(0),
            delay: None,
        }
    }

    /// Fails the next `failures` calls.
    pub fn failing(self, failures: u32) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    /// Sleeps before returning, ignoring cancellation, to trip hook timeouts.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn log(&self) -> HookLog {
        Arc::clone(&self.log)
    }

    pub fn calls(&self) -> Vec<HookInvocation> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl HookCallback for RecordingHook {
    async fn call(&self, ctx: &HookContext) -> SchedulerResult<()> {
        self.log.lock().unwrap().push(HookInvocation {
            hook: self.name.clone(),
            job_id: ctx.job_id.clone(),
            hook_type: ctx.hook_type,
            attempt: ctx.attempt,
            error: ctx.error.clone(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SchedulerError::execution(format!("{} failed", self.name)));
        }
        Ok(())
    }
}

/// In-memory cluster client recording `(cluster_id, job_id)` submissions.
#[derive(Clone, Default)]
pub struct RecordingClusterClient {
    submissions: Arc<Mutex<Vec<(String, String)>>>,
    fail_with: Option<SchedulerError>,
}

impl RecordingClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: SchedulerError) -> Self {
        Self {
            submissions: Arc::default(),
            fail_with: Some(error),
        }
    }

    pub fn submissions(&self) -> Vec<(String, String)> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterClient for RecordingClusterClient {
    async fn submit_job(&self, cluster: &Cluster, job: &Job) -> SchedulerResult<()> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        self.submissions
            .lock()
            .unwrap()
            .push((cluster.id.clone(), job.id.clone()));
        Ok(())
    }
}
