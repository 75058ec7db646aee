//! Test data builders with sensible defaults.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jobflow_core::models::{BackoffStrategy, Cluster, Job, JobStatus, RetryPolicy};

/// Builder for test [`Job`]s.
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new() -> Self {
        Self {
            job: Job::new("test-job", "test", serde_json::json!({})),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.job.id = id.to_string();
        self
    }

    pub fn with_type(mut self, job_type: &str) -> Self {
        self.job.job_type = job_type.to_string();
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.job.payload = payload;
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.job.status = status;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.job.priority = priority;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.job.attempts = attempts;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.job.created_at = created_at;
        self.job.updated_at = created_at;
        self
    }

    /// Shifts `created_at` by `offset_ms` relative to now.
    pub fn created_ms_ago(self, offset_ms: i64) -> Self {
        self.with_created_at(Utc::now() - chrono::Duration::milliseconds(offset_ms))
    }

    pub fn build(self) -> Job {
        self.job
    }
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for test [`RetryPolicy`]s. Defaults to millisecond delays so
/// retry tests stay fast.
pub struct RetryPolicyBuilder {
    policy: RetryPolicy,
}

impl RetryPolicyBuilder {
    pub fn new() -> Self {
        Self {
            policy: RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(200)),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.policy.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.policy.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.policy.max_delay = delay;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.policy.backoff_factor = factor;
        self
    }

    pub fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.policy.strategy = strategy;
        self
    }

    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.policy.jitter_factor = jitter_factor;
        self
    }

    pub fn with_retryable_errors(mut self, errors: &[&str]) -> Self {
        self.policy.retryable_errors = errors.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn build(self) -> RetryPolicy {
        self.policy
    }
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for test [`Cluster`]s.
pub struct ClusterBuilder {
    cluster: Cluster,
}

impl ClusterBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            cluster: Cluster::new(id, format!("cluster {id}"), format!("http://{id}.test")),
        }
    }

    pub fn unhealthy(mut self) -> Self {
        self.cluster.healthy = false;
        self
    }

    pub fn with_active_jobs(mut self, active_jobs: usize) -> Self {
        self.cluster.active_jobs = active_jobs;
        self
    }

    pub fn build(self) -> Cluster {
        self.cluster
    }
}
