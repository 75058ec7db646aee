//! 作业调度器
//!
//! [`JobScheduler`] owns the job table, the dependency graph, priorities,
//! retry policies, hooks and the cluster registry, all behind one
//! `RwLock`. Ready jobs are wrapped as worker-pool tasks; completion flows
//! back through the task callback, which settles the job or schedules a
//! retry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use jobflow_core::models::{Cluster, HookType, Job, JobId, JobStatus, RetryPolicy};
use jobflow_core::{
    ClusterClient, ClusterSelection, HookContext, MetricsCollector, SchedulerError, SchedulerResult,
    StructuredLogger,
};
use jobflow_worker::{Task, TaskExecutor, TaskOutcome, WorkerPool};

use crate::dependency_checker::DependencyGraph;
use crate::hooks::{run_hooks, Hook, HookExecutor};
use crate::priority::{validate_priority, PriorityIndex};
use crate::retry_service::RetryPolicyEngine;
use crate::strategies::{strategy_for, ClusterSelectionStrategy};

#[derive(Default)]
struct SchedulerState {
    jobs: HashMap<JobId, Job>,
    dependencies: DependencyGraph,
    priorities: PriorityIndex,
    retry: RetryPolicyEngine,
    hooks: HookExecutor,
    executors: HashMap<String, Arc<dyn TaskExecutor>>,
    clusters: Vec<Cluster>,
}

impl SchedulerState {
    fn completed_ids(&self) -> HashSet<JobId> {
        self.jobs
            .values()
            .filter(|job| job.status == JobStatus::Completed)
            .map(|job| job.id.clone())
            .collect()
    }

    fn ready_jobs(&self, all_jobs: &[Job], completed: &HashSet<JobId>) -> Vec<Job> {
        let mut ready: Vec<Job> = all_jobs
            .iter()
            .filter(|job| job.is_pending())
            .filter(|job| self.dependencies.can_execute_job(&job.id, completed))
            .cloned()
            .collect();
        self.priorities.sort_jobs(&mut ready);
        ready
    }

    fn job_mut(&mut self, job_id: &str) -> SchedulerResult<&mut Job> {
        self.jobs
            .get_mut(job_id)
            .ok_or_else(|| SchedulerError::job_not_found(job_id))
    }

    fn release_cluster_slot(&mut self, cluster_id: &str) {
        if let Some(cluster) = self.clusters.iter_mut().find(|c| c.id == cluster_id) {
            cluster.active_jobs = cluster.active_jobs.saturating_sub(1);
        }
    }
}

struct SchedulerInner {
    state: RwLock<SchedulerState>,
    pool: WorkerPool,
    metrics: Arc<MetricsCollector>,
    cluster_client: Option<Arc<dyn ClusterClient>>,
    strategy: Arc<dyn ClusterSelectionStrategy>,
    /// Signalled whenever new work may have become ready.
    wakeup: Notify,
}

/// Builder for [`JobScheduler`].
pub struct JobSchedulerBuilder {
    pool: WorkerPool,
    cluster_client: Option<Arc<dyn ClusterClient>>,
    strategy: Arc<dyn ClusterSelectionStrategy>,
    default_retry_policy: Option<RetryPolicy>,
}

impl JobSchedulerBuilder {
    pub fn new(pool: WorkerPool) -> Self {
        Self {
            pool,
            cluster_client: None,
            strategy: strategy_for(ClusterSelection::default()),
            default_retry_policy: None,
        }
    }

    pub fn cluster_client(mut self, client: Arc<dyn ClusterClient>) -> Self {
        self.cluster_client = Some(client);
        self
    }

    pub fn cluster_selection(mut self, selection: ClusterSelection) -> Self {
        self.strategy = strategy_for(selection);
        self
    }

    pub fn selection_strategy(mut self, strategy: Arc<dyn ClusterSelectionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Policy applied to jobs with neither a job nor a job-type policy.
    pub fn default_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_retry_policy = Some(policy);
        self
    }

    pub fn build(self) -> SchedulerResult<JobScheduler> {
        let retry = match self.default_retry_policy {
            Some(policy) => RetryPolicyEngine::with_default_policy(policy)?,
            None => RetryPolicyEngine::new(),
        };

        info!(
            strategy = self.strategy.name(),
            remote_clusters = self.cluster_client.is_some(),
            "作业调度器已创建"
        );

        Ok(JobScheduler {
            inner: Arc::new(SchedulerInner {
                state: RwLock::new(SchedulerState {
                    retry,
                    ..SchedulerState::default()
                }),
                metrics: self.pool.metrics(),
                pool: self.pool,
                cluster_client: self.cluster_client,
                strategy: self.strategy,
                wakeup: Notify::new(),
            }),
        })
    }
}

/// Dependency-aware job scheduler feeding a [`WorkerPool`].
#[derive(Clone)]
pub struct JobScheduler {
    inner: Arc<SchedulerInner>,
}

impl JobScheduler {
    pub fn builder(pool: WorkerPool) -> JobSchedulerBuilder {
        JobSchedulerBuilder::new(pool)
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.inner.pool
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.inner.metrics)
    }

    // Clusters

    /// Adds `cluster`, replacing any cluster with the same id in place.
    pub async fn register_cluster(&self, cluster: Cluster) {
        let mut state = self.inner.state.write().await;
        info!("注册集群: {} ({})", cluster.id, cluster.endpoint);
        match state.clusters.iter_mut().find(|c| c.id == cluster.id) {
            Some(existing) => *existing = cluster,
            None => state.clusters.push(cluster),
        }
    }

    pub async fn set_cluster_health(&self, cluster_id: &str, healthy: bool) -> SchedulerResult<()> {
        let mut state = self.inner.state.write().await;
        let cluster = state
            .clusters
            .iter_mut()
            .find(|c| c.id == cluster_id)
            .ok_or_else(|| SchedulerError::ClusterNotFound {
                id: cluster_id.to_string(),
            })?;
        if cluster.healthy != healthy {
            info!("集群 {} 健康状态变更为 {}", cluster_id, healthy);
        }
        cluster.healthy = healthy;
        Ok(())
    }

    /// Registered clusters in registration order.
    pub async fn clusters(&self) -> Vec<Cluster> {
        self.inner.state.read().await.clusters.clone()
    }

    /// Sends `job` to a healthy remote cluster and tracks it as `Pending` until
    /// its status is reported through [`JobScheduler::update_job_status`].
    pub async fn submit_job(&self, mut job: Job) -> SchedulerResult<String> {
        let client = self.inner.cluster_client.clone().ok_or_else(|| {
            SchedulerError::config_error("no cluster client configured for remote submission")
        })?;
        validate_job(&job)?;

        let cluster = {
            let state = self.inner.state.read().await;
            if state.jobs.contains_key(&job.id) {
                return Err(duplicate_job(&job.id));
            }
            let healthy: Vec<&Cluster> = state.clusters.iter().filter(|c| c.is_healthy()).collect();
            let index = self
                .inner
                .strategy
                .select(&healthy)
                .ok_or(SchedulerError::NoHealthyCluster)?;
            healthy[index].clone()
        };

        client.submit_job(&cluster, &job).await?;

        let mut state = self.inner.state.write().await;
        if state.jobs.contains_key(&job.id) {
            return Err(duplicate_job(&job.id));
        }
        job.cluster_id = Some(cluster.id.clone());
        job.set_status(JobStatus::Pending);
        if let Some(tracked) = state.clusters.iter_mut().find(|c| c.id == cluster.id) {
            tracked.active_jobs += 1;
        }
        state.retry.register_job_type(&job.id, &job.job_type);
        StructuredLogger::log_job_submitted_to_cluster(&job.id, &cluster.id);
        self.inner.metrics.record_job_queued();
        state.jobs.insert(job.id.clone(), job);

        Ok(cluster.id)
    }

    // Jobs

    /// Adds a job for local execution on the worker pool.
    pub async fn add_job(&self, mut job: Job) -> SchedulerResult<()> {
        validate_job(&job)?;

        {
            let mut state = self.inner.state.write().await;
            if state.jobs.contains_key(&job.id) {
                return Err(duplicate_job(&job.id));
            }
            if let Some(priority) = state.priorities.explicit_priority(&job.id) {
                job.priority = priority;
            }
            state.retry.register_job_type(&job.id, &job.job_type);
            StructuredLogger::log_job_registered(&job.id, &job.job_type, job.priority);
            state.jobs.insert(job.id.clone(), job);
        }

        self.inner.wakeup.notify_one();
        Ok(())
    }

    /// Forgets a job and everything attached to it.
    pub async fn remove_job(&self, job_id: &str) -> SchedulerResult<Job> {
        let mut state = self.inner.state.write().await;
        let job = state
            .jobs
            .remove(job_id)
            .ok_or_else(|| SchedulerError::job_not_found(job_id))?;
        state.dependencies.remove_job(job_id);
        state.priorities.remove_job(job_id);
        state.retry.remove_job(job_id);
        state.hooks.remove_job(job_id);
        if let (Some(cluster_id), false) = (&job.cluster_id, job.is_finished()) {
            state.release_cluster_slot(cluster_id);
        }
        debug!("作业 {} 已移除", job_id);
        Ok(job)
    }

    pub async fn get_job(&self, job_id: &str) -> SchedulerResult<Job> {
        self.inner
            .state
            .read()
            .await
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| SchedulerError::job_not_found(job_id))
    }

    /// All jobs ordered by id.
    pub async fn list_jobs(&self) -> Vec<Job> {
        let state = self.inner.state.read().await;
        let mut jobs: Vec<Job> = state.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    pub async fn completed_job_ids(&self) -> HashSet<JobId> {
        self.inner.state.read().await.completed_ids()
    }

    pub async fn update_job_status(&self, job_id: &str, status: JobStatus) -> SchedulerResult<()> {
        {
            let mut state = self.inner.state.write().await;
            let job = state.job_mut(job_id)?;
            let was_finished = job.is_finished();
            let cluster_id = job.cluster_id.clone();
            job.set_status(status);
            debug!("作业 {} 状态更新为 {}", job_id, status);

            if let (Some(cluster_id), false, true) = (cluster_id, was_finished, status.is_terminal()) {
                state.release_cluster_slot(&cluster_id);
            }
        }

        if status == JobStatus::Completed || status == JobStatus::Pending {
            self.inner.wakeup.notify_one();
        }
        Ok(())
    }

    // Dependencies, priorities, retry policies, hooks, executors

    pub async fn set_job_dependencies<I>(&self, job_id: &str, dependencies: I) -> SchedulerResult<()>
    where
        I: IntoIterator<Item = JobId>,
    {
        let mut state = self.inner.state.write().await;
        state.dependencies.set_job_dependencies(job_id, dependencies)
    }

    pub async fn job_dependencies(&self, job_id: &str) -> Vec<JobId> {
        self.inner.state.read().await.dependencies.dependencies(job_id)
    }

    pub async fn transitive_dependencies(&self, job_id: &str) -> Vec<JobId> {
        self.inner
            .state
            .read()
            .await
            .dependencies
            .transitive_dependencies(job_id)
    }

    /// Whether every prerequisite of `job_id` has completed.
    pub async fn can_execute_job(&self, job_id: &str) -> bool {
        let state = self.inner.state.read().await;
        let completed = state.completed_ids();
        let blocking = state.dependencies.blocking_dependencies(job_id, &completed);
        let can_execute = blocking.is_empty();
        StructuredLogger::log_dependency_check(job_id, can_execute, &blocking);
        can_execute
    }

    pub async fn set_job_priority(&self, job_id: &str, priority: u8) -> SchedulerResult<()> {
        let mut state = self.inner.state.write().await;
        state.priorities.set_job_priority(job_id, priority)?;
        if let Some(job) = state.jobs.get_mut(job_id) {
            job.priority = priority;
        }
        Ok(())
    }

    pub async fn get_job_priority(&self, job_id: &str) -> u8 {
        let state = self.inner.state.read().await;
        match state.jobs.get(job_id) {
            Some(job) => state.priorities.effective_priority(job),
            None => state.priorities.get_priority(job_id),
        }
    }

    pub async fn set_job_retry_policy(&self, job_id: &str, policy: RetryPolicy) -> SchedulerResult<()> {
        let mut state = self.inner.state.write().await;
        state.retry.set_job_retry_policy(job_id, policy)
    }

    pub async fn set_type_retry_policy(&self, job_type: &str, policy: RetryPolicy) -> SchedulerResult<()> {
        let mut state = self.inner.state.write().await;
        state.retry.set_type_retry_policy(job_type, policy)
    }

    /// See [`RetryPolicyEngine::should_retry_job`].
    pub async fn should_retry_job(&self, job_id: &str, attempt: u32, last_error: &str) -> (bool, Duration) {
        self.inner
            .state
            .read()
            .await
            .retry
            .should_retry_job(job_id, attempt, last_error)
    }

    pub async fn register_hook(&self, job_id: &str, hook: Hook) {
        let mut state = self.inner.state.write().await;
        debug!("为作业 {} 注册 {} 钩子 {}", job_id, hook.hook_type, hook.name);
        state.hooks.register_hook(job_id, hook);
    }

    pub async fn register_executor(&self, job_type: &str, executor: Arc<dyn TaskExecutor>) {
        let mut state = self.inner.state.write().await;
        info!("注册作业执行器: {} -> {}", job_type, executor.name());
        state.executors.insert(job_type.to_string(), executor);
    }

    // Scheduling

    /// Pending jobs of `all_jobs` whose prerequisites are all in `completed`,
    /// ordered by priority, then creation time, then id.
    pub async fn get_jobs_ready_for_execution(
        &self,
        all_jobs: &[Job],
        completed: &HashSet<JobId>,
    ) -> Vec<Job> {
        self.inner.state.read().await.ready_jobs(all_jobs, completed)
    }

    /// Runs one scheduling pass and returns how many jobs were handed to the
    /// pool.
    ///
    /// A full queue ends the pass early; the remaining ready jobs stay
    /// `Pending` for the next pass.
    pub async fn schedule_ready_jobs(&self) -> SchedulerResult<usize> {
        self.inner.schedule_ready_jobs().await
    }

    /// Resolves once new work may be ready: a job was added, completed, or
    /// came back from a retry backoff.
    pub async fn wait_for_work(&self) {
        self.inner.wakeup.notified().await;
    }

    pub fn health(&self) -> HashMap<String, serde_json::Value> {
        self.inner.metrics.health()
    }
}

impl SchedulerInner {
    async fn schedule_ready_jobs(self: &Arc<Self>) -> SchedulerResult<usize> {
        let mut dispatch = Vec::new();
        let mut unroutable = Vec::new();

        {
            let mut state = self.state.write().await;
            let completed = state.completed_ids();
            let local: Vec<Job> = state
                .jobs
                .values()
                .filter(|job| job.cluster_id.is_none())
                .cloned()
                .collect();
            let ready = state.ready_jobs(&local, &completed);
            if ready.is_empty() {
                return Ok(0);
            }

            for job in ready {
                let executor = state.executors.get(&job.job_type).cloned();
                let Some(executor) = executor else {
                    let error = SchedulerError::validation(format!(
                        "no executor registered for job type {}",
                        job.job_type
                    ));
                    let tracked = state.job_mut(&job.id)?;
                    tracked.last_error = Some(error.to_string());
                    tracked.set_status(JobStatus::Failed);
                    let hooks = state.hooks.hooks_for(&job.id, HookType::OnFailure);
                    unroutable.push((job, error, hooks));
                    continue;
                };

                let hooks = JobHooks {
                    pre_exec: state.hooks.hooks_for(&job.id, HookType::PreExec),
                    post_exec: state.hooks.hooks_for(&job.id, HookType::PostExec),
                };
                state.job_mut(&job.id)?.set_status(JobStatus::Running);
                dispatch.push((job, executor, hooks));
            }
        }

        for (job, error, hooks) in unroutable {
            error!("作业 {} 无法执行: {}", job.id, error);
            self.metrics.record_job_failed(Duration::ZERO);
            StructuredLogger::log_job_complete(&job.id, false, Duration::ZERO, Some(error.to_string().as_str()));
            let ctx = HookContext::new(job.id.clone(), HookType::OnFailure)
                .with_attempt(job.attempts)
                .with_error(error.to_string());
            if let Err(e) = run_hooks(&hooks, &ctx).await {
                warn!("作业 {} 的失败钩子执行失败: {}", job.id, e);
            }
        }

        let mut dispatched = 0;
        let mut pending = dispatch.into_iter();
        while let Some((job, executor, hooks)) = pending.next() {
            let job_id = job.id.clone();
            let task = self.build_task(job, executor, hooks);
            match self.pool.submit(task) {
                Ok(()) => dispatched += 1,
                Err(error) => {
                    let mut undispatched = vec![job_id];
                    undispatched.extend(pending.by_ref().map(|(job, _, _)| job.id));
                    self.revert_to_pending(&undispatched).await;

                    if error == SchedulerError::QueueFull {
                        debug!(
                            "任务队列已满，{} 个作业留待下一轮调度",
                            undispatched.len()
                        );
                        break;
                    }
                    return Err(error);
                }
            }
        }

        if dispatched > 0 {
            debug!("本轮调度分发了 {} 个作业", dispatched);
        }
        Ok(dispatched)
    }

    fn build_task(self: &Arc<Self>, job: Job, executor: Arc<dyn TaskExecutor>, hooks: JobHooks) -> Task {
        StructuredLogger::log_job_dispatched(&job.id, job.priority, job.attempts);

        let runner = JobRunner {
            job_id: job.id.clone(),
            attempt: job.attempts,
            executor,
            hooks,
        };
        let inner = Arc::clone(self);
        let job_id = job.id.clone();

        Task::new(job.id, job.payload, Arc::new(runner))
            .with_priority(job.priority)
            .on_complete(move |outcome| async move {
                inner.handle_completion(job_id, outcome).await;
            })
    }

    async fn revert_to_pending(&self, job_ids: &[JobId]) {
        let mut state = self.state.write().await;
        for job_id in job_ids {
            if let Some(job) = state.jobs.get_mut(job_id) {
                if job.status == JobStatus::Running {
                    job.set_status(JobStatus::Pending);
                }
            }
        }
    }

    async fn handle_completion(self: Arc<Self>, job_id: JobId, outcome: TaskOutcome) {
        match outcome.result {
            Ok(()) => self.complete_job(&job_id, outcome.duration).await,
            Err(SchedulerError::PoolClosed) => {
                debug!("工作池已关闭，作业 {} 回到待执行状态", job_id);
                self.revert_to_pending(std::slice::from_ref(&job_id)).await;
            }
            // 关闭时被取消的执行不计入重试次数
            Err(error) if self.pool.is_closed() => {
                debug!("作业 {} 因工作池关闭被中断，回到待执行状态: {}", job_id, error);
                self.revert_to_pending(std::slice::from_ref(&job_id)).await;
            }
            Err(error) => self.fail_attempt(&job_id, error, outcome.duration).await,
        }
    }

    async fn complete_job(&self, job_id: &str, duration: Duration) {
        let (attempt, hooks) = {
            let mut state = self.state.write().await;
            let Some(job) = state.jobs.get_mut(job_id) else {
                debug!("已完成的作业 {} 不再被跟踪", job_id);
                return;
            };
            job.last_error = None;
            job.set_status(JobStatus::Completed);
            let attempt = job.attempts;
            (attempt, state.hooks.hooks_for(job_id, HookType::OnSuccess))
        };

        self.metrics.record_job_completed(duration);
        StructuredLogger::log_job_complete(job_id, true, duration, None);
        self.wakeup.notify_one();

        let ctx = HookContext::new(job_id, HookType::OnSuccess).with_attempt(attempt);
        if let Err(e) = run_hooks(&hooks, &ctx).await {
            warn!("作业 {} 的成功钩子执行失败: {}", job_id, e);
        }
    }

    async fn fail_attempt(self: &Arc<Self>, job_id: &str, error: SchedulerError, duration: Duration) {
        let reason = error.retry_key();

        let decision = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let Some(job) = state.jobs.get(job_id) else {
                debug!("失败的作业 {} 不再被跟踪", job_id);
                return;
            };
            let attempt = job.attempts;
            let (retry, delay) = state.retry.should_retry_job(job_id, attempt, &reason);
            let max_retries = state.retry.policy_for(job_id).map(|p| p.max_retries);

            let job = match state.jobs.get_mut(job_id) {
                Some(job) => job,
                None => return,
            };
            job.last_error = Some(reason.clone());
            if retry {
                job.attempts += 1;
                let hooks = state.hooks.hooks_for(job_id, HookType::OnRetry);
                FailureDecision::Retry {
                    attempt,
                    delay,
                    max_retries: max_retries.unwrap_or(0),
                    hooks,
                }
            } else {
                job.set_status(JobStatus::Failed);
                let exhausted = max_retries.is_some_and(|max| attempt >= max);
                let hooks = state.hooks.hooks_for(job_id, HookType::OnFailure);
                FailureDecision::Fail {
                    attempt,
                    exhausted,
                    hooks,
                }
            }
        };

        match decision {
            FailureDecision::Retry {
                attempt,
                delay,
                max_retries,
                hooks,
            } => {
                self.metrics.record_job_retried();
                StructuredLogger::log_job_retry(job_id, attempt + 1, max_retries, delay, &reason);

                let ctx = HookContext::new(job_id, HookType::OnRetry)
                    .with_attempt(attempt)
                    .with_error(reason.clone());
                if let Err(e) = run_hooks(&hooks, &ctx).await {
                    warn!("作业 {} 的重试钩子执行失败: {}", job_id, e);
                }

                let inner = Arc::clone(self);
                let job_id = job_id.to_string();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    inner.requeue(&job_id).await;
                });
            }
            FailureDecision::Fail {
                attempt,
                exhausted,
                hooks,
            } => {
                self.metrics.record_job_failed(duration);
                StructuredLogger::log_job_complete(job_id, false, duration, Some(reason.as_str()));
                if exhausted {
                    let exceeded = SchedulerError::MaxRetriesExceeded {
                        job_id: job_id.to_string(),
                        attempts: attempt,
                    };
                    warn!("{}, 最后错误: {}", exceeded, reason);
                }

                let ctx = HookContext::new(job_id, HookType::OnFailure)
                    .with_attempt(attempt)
                    .with_error(reason.clone());
                if let Err(e) = run_hooks(&hooks, &ctx).await {
                    warn!("作业 {} 的失败钩子执行失败: {}", job_id, e);
                }
            }
        }
    }

    /// Puts a job back to `Pending` once its retry backoff has elapsed.
    async fn requeue(&self, job_id: &str) {
        {
            let mut state = self.state.write().await;
            match state.jobs.get_mut(job_id) {
                Some(job) if job.status == JobStatus::Running => job.set_status(JobStatus::Pending),
                _ => return,
            }
        }
        debug!("作业 {} 退避结束，等待重新调度", job_id);
        self.wakeup.notify_one();
    }
}

enum FailureDecision {
    Retry {
        attempt: u32,
        delay: Duration,
        max_retries: u32,
        hooks: Vec<Hook>,
    },
    Fail {
        attempt: u32,
        exhausted: bool,
        hooks: Vec<Hook>,
    },
}

struct JobHooks {
    pre_exec: Vec<Hook>,
    post_exec: Vec<Hook>,
}

/// Runs one attempt of a job inside a worker: PreExec hooks, the job's
/// executor, then PostExec hooks.
struct JobRunner {
    job_id: JobId,
    attempt: u32,
    executor: Arc<dyn TaskExecutor>,
    hooks: JobHooks,
}

#[async_trait]
impl TaskExecutor for JobRunner {
    async fn execute(
        &self,
        payload: serde_json::Value,
        cancellation: CancellationToken,
    ) -> SchedulerResult<()> {
        let mut ctx = HookContext::new(self.job_id.clone(), HookType::PreExec).with_attempt(self.attempt);
        ctx.cancellation = cancellation.child_token();
        run_hooks(&self.hooks.pre_exec, &ctx).await?;

        let result = self.executor.execute(payload, cancellation).await;

        ctx.hook_type = HookType::PostExec;
        ctx.error = result.as_ref().err().map(|e| e.retry_key());
        let post = run_hooks(&self.hooks.post_exec, &ctx).await;
        result.and(post)
    }

    fn name(&self) -> &str {
        self.executor.name()
    }
}

fn validate_job(job: &Job) -> SchedulerResult<()> {
    if job.id.trim().is_empty() {
        return Err(SchedulerError::validation("job id must not be empty"));
    }
    if job.job_type.trim().is_empty() {
        return Err(SchedulerError::validation(format!(
            "job {} has an empty job type",
            job.id
        )));
    }
    validate_priority(job.priority)
}

fn duplicate_job(job_id: &str) -> SchedulerError {
    SchedulerError::validation(format!("job {job_id} already exists"))
}
