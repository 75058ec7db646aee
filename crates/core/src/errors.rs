use std::time::Duration;

use thiserror::Error;

/// 调度器错误类型定义
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchedulerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no healthy cluster available")]
    NoHealthyCluster,

    #[error("circular dependency detected while registering job {job_id}")]
    CircularDependency { job_id: String },

    #[error("task queue is full")]
    QueueFull,

    #[error("worker pool is closed")]
    PoolClosed,

    #[error("task timed out after {0:?}")]
    TaskTimeout(Duration),

    #[error("{hook_type} hook failed for job {job_id}: {message}")]
    HookExecution {
        job_id: String,
        hook_type: String,
        message: String,
    },

    #[error("job {job_id} exhausted retries after {attempts} attempts")]
    MaxRetriesExceeded { job_id: String, attempts: u32 },

    #[error("job not found: {id}")]
    JobNotFound { id: String },

    #[error("cluster not found: {id}")]
    ClusterNotFound { id: String },

    #[error("task execution failed: {0}")]
    TaskExecution(String),

    #[error("worker pool shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// 统一的Result类型
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub fn job_not_found<S: Into<String>>(id: S) -> Self {
        Self::JobNotFound { id: id.into() }
    }

    pub fn execution<S: Into<String>>(msg: S) -> Self {
        Self::TaskExecution(msg.into())
    }

    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Errors a caller may reasonably retry later without changing input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SchedulerError::QueueFull
                | SchedulerError::NoHealthyCluster
                | SchedulerError::TaskTimeout(_)
                | SchedulerError::TaskExecution(_)
        )
    }

    /// The string matched against `RetryPolicy::retryable_errors`.
    ///
    /// Task execution errors carry the executor's own message verbatim so that
    /// policies can list the exact failure strings they tolerate.
    pub fn retry_key(&self) -> String {
        match self {
            SchedulerError::TaskExecution(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Validation(err.to_string())
    }
}
