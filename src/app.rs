use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use jobflow_core::models::DEFAULT_PRIORITY;
use jobflow_core::{AppConfig, Job, MetricsCollector};
use jobflow_dispatcher::{JobScheduler, SchedulerController};
use jobflow_worker::{FnExecutor, TaskExecutor, WorkerPool};

/// Job type handled by the built-in executor that only logs its payload.
pub const LOG_JOB_TYPE: &str = "log";

/// One entry of a job definition file.
#[derive(Debug, Clone, Deserialize)]
pub struct JobDefinition {
    /// Left empty, the job gets a generated UUID.
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_job_type")]
    pub job_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

fn default_job_type() -> String {
    LOG_JOB_TYPE.to_string()
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    scheduler: JobScheduler,
    controller: SchedulerController,
}

impl Application {
    /// 创建新的应用实例，必须在tokio运行时内调用
    pub fn new(config: AppConfig) -> Result<Self> {
        info!("初始化应用程序");

        let metrics = Arc::new(MetricsCollector::new());
        let pool = WorkerPool::with_metrics(config.pool.clone(), metrics)
            .context("创建工作池失败")?;

        let mut builder = JobScheduler::builder(pool)
            .cluster_selection(config.scheduler.cluster_selection);
        if config.retry.enabled {
            builder = builder.default_retry_policy(config.retry.to_policy());
        }
        let scheduler = builder.build().context("创建作业调度器失败")?;

        let controller = SchedulerController::new(scheduler.clone(), config.scheduler.scan_interval);

        Ok(Self {
            config,
            scheduler,
            controller,
        })
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    /// Registers the executors shipped with the binary.
    pub async fn register_builtin_executors(&self) {
        let log_executor: Arc<dyn TaskExecutor> = Arc::new(FnExecutor::named(
            LOG_JOB_TYPE,
            |payload: serde_json::Value, _cancellation: CancellationToken| async move {
                info!(payload = %payload, "执行日志作业");
                Ok(())
            },
        ));
        self.scheduler
            .register_executor(LOG_JOB_TYPE, log_executor)
            .await;
    }

    /// Loads a JSON array of [`JobDefinition`]s and registers the jobs and
    /// their dependencies. Returns the number of jobs added.
    pub async fn load_jobs(&self, path: &Path) -> Result<usize> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("读取作业文件失败: {}", path.display()))?;
        let definitions: Vec<JobDefinition> =
            serde_json::from_str(&content).context("解析作业文件失败")?;
        self.add_definitions(definitions).await
    }

    pub async fn add_definitions(&self, definitions: Vec<JobDefinition>) -> Result<usize> {
        // Jobs first so that dependencies may point forward in the file.
        let mut added = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let mut job = if definition.id.trim().is_empty() {
                Job::with_generated_id(definition.job_type, definition.payload)
            } else {
                Job::new(definition.id, definition.job_type, definition.payload)
            };
            job.priority = definition.priority;
            let job_id = job.id.clone();
            self.scheduler
                .add_job(job)
                .await
                .with_context(|| format!("添加作业失败: {job_id}"))?;
            added.push((job_id, definition.depends_on));
        }

        for (job_id, depends_on) in &added {
            if depends_on.is_empty() {
                continue;
            }
            self.scheduler
                .set_job_dependencies(job_id, depends_on.iter().cloned())
                .await
                .with_context(|| format!("设置作业依赖失败: {job_id}"))?;
        }

        info!("已加载 {} 个作业", added.len());
        Ok(added.len())
    }

    /// 运行应用程序，直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        self.controller.start();

        let _ = shutdown_rx.recv().await;
        info!("应用程序收到关闭信号");

        self.shutdown().await
    }

    async fn shutdown(&self) -> Result<()> {
        self.controller.stop().await;

        let result = self
            .scheduler
            .pool()
            .shutdown(self.config.scheduler.shutdown_timeout)
            .await;

        if self.config.observability.metrics_enabled {
            let health = self.scheduler.health();
            info!(
                status = %health.get("status").cloned().unwrap_or_default(),
                total_jobs = %health.get("total_jobs").cloned().unwrap_or_default(),
                failed_jobs = %health.get("failed_jobs").cloned().unwrap_or_default(),
                "最终运行状态"
            );
        }

        if let Err(e) = &result {
            warn!("工作池未能在超时内关闭: {}", e);
        }
        result.context("关闭工作池失败")
    }
}
