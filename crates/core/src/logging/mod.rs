//! Structured logging utilities
//!
//! `init_logging` installs the global `tracing` subscriber used by the
//! binary; `StructuredLogger` emits the job lifecycle events with stable
//! field names so log pipelines can key on `event`.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(anyhow::anyhow!("unsupported log format: {other}")),
        }
    }
}

/// 初始化日志系统
///
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn init_logging(log_level: &str, format: LogFormat) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("failed to initialise json logging")?,
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
            .context("failed to initialise pretty logging")?,
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init()
            .context("failed to initialise compact logging")?,
    }

    Ok(())
}

/// Structured logging helpers for job lifecycle events
pub struct StructuredLogger;

impl StructuredLogger {
    pub fn log_job_registered(job_id: &str, job_type: &str, priority: u8) {
        info!(
            event = "job_registered",
            job.id = job_id,
            job.kind = job_type,
            job.priority = priority,
            "Job registered"
        );
    }

    pub fn log_job_dispatched(job_id: &str, priority: u8, attempt: u32) {
        debug!(
            event = "job_dispatched",
            job.id = job_id,
            job.priority = priority,
            job.attempt = attempt,
            "Job dispatched to worker pool"
        );
    }

    pub fn log_job_submitted_to_cluster(job_id: &str, cluster_id: &str) {
        info!(
            event = "job_submitted",
            job.id = job_id,
            cluster.id = cluster_id,
            "Job submitted to cluster"
        );
    }

    pub fn log_job_complete(job_id: &str, success: bool, duration: Duration, error: Option<&str>) {
        let duration_ms = duration.as_millis() as u64;
        if success {
            info!(
                event = "job_completed",
                job.id = job_id,
                job.duration_ms = duration_ms,
                "Job completed successfully"
            );
        } else {
            error!(
                event = "job_failed",
                job.id = job_id,
                job.duration_ms = duration_ms,
                job.error = error.unwrap_or("unknown error"),
                "Job failed"
            );
        }
    }

    pub fn log_job_retry(job_id: &str, attempt: u32, max_retries: u32, delay: Duration, reason: &str) {
        warn!(
            event = "job_retry",
            job.id = job_id,
            job.attempt = attempt,
            job.max_retries = max_retries,
            job.retry_delay_ms = delay.as_millis() as u64,
            job.retry_reason = reason,
            "Job retry scheduled"
        );
    }

    pub fn log_dependency_check(job_id: &str, dependencies_met: bool, blocking: &[String]) {
        if dependencies_met {
            debug!(
                event = "dependency_check_passed",
                job.id = job_id,
                "Job dependencies satisfied"
            );
        } else {
            debug!(
                event = "dependency_check_blocked",
                job.id = job_id,
                dependency.blocking = ?blocking,
                "Job waiting on dependencies"
            );
        }
    }

    pub fn log_scale_event(from: usize, to: usize, utilization: f64) {
        info!(
            event = "pool_scaled",
            pool.from = from,
            pool.to = to,
            pool.utilization = utilization,
            "Worker pool target changed"
        );
    }
}
