//! 作业生命周期钩子接口

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::models::{HookType, JobId};
use crate::SchedulerResult;

/// What a hook sees when it fires.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub job_id: JobId,
    pub hook_type: HookType,
    /// Attempt number of the execution that triggered the hook, starting at 0.
    pub attempt: u32,
    /// Error of the failed attempt for `OnFailure` and `OnRetry` hooks.
    pub error: Option<String>,
    /// Fires when the hook's timeout elapses.
    pub cancellation: CancellationToken,
}

impl HookContext {
    pub fn new(job_id: impl Into<JobId>, hook_type: HookType) -> Self {
        Self {
            job_id: job_id.into(),
            hook_type,
            attempt: 0,
            error: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[async_trait]
pub trait HookCallback: Send + Sync {
    /// Runs the hook. Like task executors, implementations must return once
    /// `ctx.cancellation` fires.
    async fn call(&self, ctx: &HookContext) -> SchedulerResult<()>;
}
