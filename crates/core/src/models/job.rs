use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest priority value (runs first).
pub const HIGHEST_PRIORITY: u8 = 1;
/// Lowest priority value (runs last).
pub const LOWEST_PRIORITY: u8 = 10;
/// Priority assumed for jobs that never had one assigned.
pub const DEFAULT_PRIORITY: u8 = 5;

pub type JobId = String;

/// 作业定义
///
/// A unit of work tracked by the scheduler through
/// `Pending → Running → Completed | Failed`.
///
/// # Fields
///
/// - `id`: unique job identifier
/// - `job_type`: selects the executor registered for this kind of work
/// - `payload`: opaque JSON handed to the executor
/// - `priority`: 1 (highest) … 10 (lowest)
/// - `attempts`: number of failed attempts so far
/// - `last_error`: message of the most recent failure, kept on terminal failure
/// - `cluster_id`: cluster the job was submitted to, if any
///
/// # Example
///
/// ```rust
/// use jobflow_core::models::{Job, JobStatus};
/// use serde_json::json;
///
/// let job = Job::new("backup", "shell", json!({"command": "backup.sh"}));
/// assert_eq!(job.status, JobStatus::Pending);
/// assert_eq!(job.priority, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub priority: u8,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub cluster_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: impl Into<JobId>, job_type: impl Into<String>, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            job_type: job_type.into(),
            payload,
            status: JobStatus::Pending,
            priority: DEFAULT_PRIORITY,
            attempts: 0,
            last_error: None,
            cluster_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a job with a generated UUID v4 identifier.
    pub fn with_generated_id(job_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), job_type, payload)
    }

    pub fn is_pending(&self) -> bool {
        self.status == JobStatus::Pending
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// 作业状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
