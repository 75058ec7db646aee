//! 作业生命周期钩子
//!
//! Hooks fire at five points of a job's life: before and after each execution
//! attempt, and once the attempt is known to have succeeded, failed for good,
//! or been scheduled for a retry. Several hooks of the same type run in
//! registration order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use jobflow_core::models::{HookErrorPolicy, HookType, JobId};
use jobflow_core::{HookCallback, HookContext, SchedulerError, SchedulerResult};

pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct Hook {
    pub name: String,
    pub hook_type: HookType,
    pub callback: Arc<dyn HookCallback>,
    pub timeout: Duration,
    pub on_error: HookErrorPolicy,
}

impl Hook {
    pub fn new(name: impl Into<String>, hook_type: HookType, callback: Arc<dyn HookCallback>) -> Self {
        Self {
            name: name.into(),
            hook_type,
            callback,
            timeout: DEFAULT_HOOK_TIMEOUT,
            on_error: HookErrorPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_error_policy(mut self, on_error: HookErrorPolicy) -> Self {
        self.on_error = on_error;
        self
    }

    /// One bounded invocation. The callback gets a child token of
    /// `ctx.cancellation` that fires when the timeout elapses.
    async fn invoke(&self, ctx: &HookContext) -> SchedulerResult<()> {
        let token = ctx.cancellation.child_token();
        let hook_ctx = HookContext {
            cancellation: token.clone(),
            ..ctx.clone()
        };

        match timeout(self.timeout, self.callback.call(&hook_ctx)).await {
            Ok(result) => result,
            Err(_) => {
                token.cancel();
                Err(SchedulerError::TaskTimeout(self.timeout))
            }
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("hook_type", &self.hook_type)
            .field("timeout", &self.timeout)
            .field("on_error", &self.on_error)
            .finish()
    }
}

/// Per-job hook registry.
#[derive(Debug, Clone, Default)]
pub struct HookExecutor {
    hooks: HashMap<JobId, Vec<Hook>>,
}

impl HookExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_hook(&mut self, job_id: &str, hook: Hook) {
        self.hooks.entry(job_id.to_string()).or_default().push(hook);
    }

    /// Hooks of `hook_type` for `job_id`, in registration order.
    pub fn hooks_for(&self, job_id: &str, hook_type: HookType) -> Vec<Hook> {
        self.hooks
            .get(job_id)
            .map(|hooks| {
                hooks
                    .iter()
                    .filter(|hook| hook.hook_type == hook_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn remove_job(&mut self, job_id: &str) {
        self.hooks.remove(job_id);
    }

    pub async fn execute_hooks(
        &self,
        job_id: &str,
        hook_type: HookType,
        ctx: &HookContext,
    ) -> SchedulerResult<()> {
        run_hooks(&self.hooks_for(job_id, hook_type), ctx).await
    }
}

/// Runs `hooks` in order, applying each hook's error policy.
///
/// Takes a snapshot so callers can release their locks before awaiting.
pub async fn run_hooks(hooks: &[Hook], ctx: &HookContext) -> SchedulerResult<()> {
    for hook in hooks {
        let result = match hook.invoke(ctx).await {
            Err(first) if hook.on_error == HookErrorPolicy::Retry => {
                warn!(
                    job.id = %ctx.job_id,
                    hook = %hook.name,
                    hook_type = %hook.hook_type,
                    error = %first,
                    "钩子执行失败，重试一次"
                );
                hook.invoke(ctx).await
            }
            other => other,
        };

        let Err(error) = result else {
            continue;
        };

        let wrapped = SchedulerError::HookExecution {
            job_id: ctx.job_id.clone(),
            hook_type: hook.hook_type.to_string(),
            message: error.to_string(),
        };

        match hook.on_error {
            HookErrorPolicy::Ignore => {
                warn!(
                    job.id = %ctx.job_id,
                    hook = %hook.name,
                    error = %wrapped,
                    "钩子执行失败，已忽略"
                );
            }
            HookErrorPolicy::Retry | HookErrorPolicy::Fail => return Err(wrapped),
        }
    }
    Ok(())
}
