//! Metrics collector for the job scheduler and worker pool
//!
//! Every transition is emitted through the `metrics` facade so whichever
//! recorder the host process installs can scrape it. The collector also keeps
//! its own aggregates, which back the `health()` report.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use serde_json::{json, Value};

pub const JOBS_QUEUED_TOTAL: &str = "jobs_queued_total";
pub const JOBS_COMPLETED_TOTAL: &str = "jobs_completed_total";
pub const JOBS_FAILED_TOTAL: &str = "jobs_failed_total";
pub const JOBS_RETRIED_TOTAL: &str = "jobs_retried_total";
pub const JOB_LATENCY_SECONDS: &str = "job_latency_seconds";
pub const ACTIVE_WORKERS: &str = "active_workers";
pub const QUEUE_SIZE: &str = "queue_size";
pub const POOL_UTILIZATION: &str = "worker_pool_utilization";
pub const SCALE_EVENTS_TOTAL: &str = "worker_pool_scale_events_total";
pub const TASK_DURATION_SECONDS: &str = "worker_task_duration_seconds";

/// Success rate (percent) at or above which the scheduler reports `healthy`.
const HEALTHY_SUCCESS_RATE: f64 = 90.0;
/// Success rate (percent) at or above which the scheduler reports `degraded`.
const DEGRADED_SUCCESS_RATE: f64 = 50.0;

pub struct MetricsCollector {
    jobs_queued_total: Counter,
    jobs_completed_total: Counter,
    jobs_failed_total: Counter,
    jobs_retried_total: Counter,
    job_latency: Histogram,
    active_workers: Gauge,
    queue_size: Gauge,
    pool_utilization: Gauge,
    scale_events_total: Counter,
    task_duration: Histogram,

    queued: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
    latency_micros_total: AtomicU64,
    latency_samples: AtomicU64,
    started_at: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            jobs_queued_total: counter!(JOBS_QUEUED_TOTAL),
            jobs_completed_total: counter!(JOBS_COMPLETED_TOTAL),
            jobs_failed_total: counter!(JOBS_FAILED_TOTAL),
            jobs_retried_total: counter!(JOBS_RETRIED_TOTAL),
            job_latency: histogram!(JOB_LATENCY_SECONDS),
            active_workers: gauge!(ACTIVE_WORKERS),
            queue_size: gauge!(QUEUE_SIZE),
            pool_utilization: gauge!(POOL_UTILIZATION),
            scale_events_total: counter!(SCALE_EVENTS_TOTAL),
            task_duration: histogram!(TASK_DURATION_SECONDS),
            queued: AtomicU64::new(0),
            successful: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            latency_micros_total: AtomicU64::new(0),
            latency_samples: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    // Job metrics

    pub fn record_job_queued(&self) {
        self.jobs_queued_total.increment(1);
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_completed(&self, duration: Duration) {
        self.jobs_completed_total.increment(1);
        self.successful.fetch_add(1, Ordering::Relaxed);
        self.record_latency(duration);
    }

    /// Terminal failure only; attempts that will be retried go through `record_job_retried`.
    pub fn record_job_failed(&self, duration: Duration) {
        self.jobs_failed_total.increment(1);
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.record_latency(duration);
    }

    pub fn record_job_retried(&self) {
        self.jobs_retried_total.increment(1);
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, duration: Duration) {
        self.job_latency.record(duration.as_secs_f64());
        self.latency_micros_total
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    // Worker pool metrics

    pub fn update_active_workers(&self, count: usize) {
        self.active_workers.set(count as f64);
    }

    pub fn update_queue_size(&self, depth: usize) {
        self.queue_size.set(depth as f64);
    }

    pub fn update_pool_utilization(&self, utilization: f64) {
        self.pool_utilization.set(utilization);
    }

    pub fn record_scale_event(&self) {
        self.scale_events_total.increment(1);
    }

    /// Wall time a worker spent on one task, including timed out ones.
    pub fn record_task_duration(&self, duration: Duration) {
        self.task_duration.record(duration.as_secs_f64());
    }

    // Aggregates

    pub fn queued_jobs(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn successful_jobs(&self) -> u64 {
        self.successful.load(Ordering::Relaxed)
    }

    pub fn failed_jobs(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn retried_jobs(&self) -> u64 {
        self.retried.load(Ordering::Relaxed)
    }

    /// Finished jobs, successful or not.
    pub fn total_jobs(&self) -> u64 {
        self.successful_jobs() + self.failed_jobs()
    }

    /// Percentage of finished jobs that succeeded; 100 when nothing finished yet.
    pub fn success_rate_percent(&self) -> f64 {
        let total = self.total_jobs();
        if total == 0 {
            return 100.0;
        }
        self.successful_jobs() as f64 * 100.0 / total as f64
    }

    pub fn average_latency_ms(&self) -> f64 {
        let samples = self.latency_samples.load(Ordering::Relaxed);
        if samples == 0 {
            return 0.0;
        }
        let total_micros = self.latency_micros_total.load(Ordering::Relaxed);
        total_micros as f64 / samples as f64 / 1000.0
    }

    pub fn throughput_per_minute(&self) -> f64 {
        self.throughput_over(self.started_at.elapsed())
    }

    fn throughput_over(&self, elapsed: Duration) -> f64 {
        let minutes = elapsed.as_secs_f64() / 60.0;
        if minutes <= 0.0 {
            return 0.0;
        }
        self.total_jobs() as f64 / minutes
    }

    pub fn health_status(&self) -> &'static str {
        let rate = self.success_rate_percent();
        if rate >= HEALTHY_SUCCESS_RATE {
            "healthy"
        } else if rate >= DEGRADED_SUCCESS_RATE {
            "degraded"
        } else {
            "unhealthy"
        }
    }

    /// Health report consumed by external dashboards.
    pub fn health(&self) -> HashMap<String, Value> {
        let mut report = HashMap::new();
        report.insert("status".to_string(), json!(self.health_status()));
        report.insert("total_jobs".to_string(), json!(self.total_jobs()));
        report.insert("successful_jobs".to_string(), json!(self.successful_jobs()));
        report.insert("failed_jobs".to_string(), json!(self.failed_jobs()));
        report.insert(
            "success_rate_percent".to_string(),
            json!(self.success_rate_percent()),
        );
        report.insert(
            "average_latency_ms".to_string(),
            json!(self.average_latency_ms()),
        );
        report.insert(
            "throughput_per_minute".to_string(),
            json!(self.throughput_per_minute()),
        );
        report
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
