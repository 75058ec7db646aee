use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use jobflow_core::models::{JobId, RetryPolicy};
use jobflow_core::SchedulerResult;

/// 重试策略引擎
///
/// Resolves the retry policy for a job (job-level first, then its job type,
/// then the engine default) and decides whether a failed attempt gets
/// another try.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicyEngine {
    job_policies: HashMap<JobId, RetryPolicy>,
    type_policies: HashMap<String, RetryPolicy>,
    job_types: HashMap<JobId, String>,
    default_policy: Option<RetryPolicy>,
}

impl RetryPolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose jobs fall back to `policy` when nothing more specific is set.
    pub fn with_default_policy(policy: RetryPolicy) -> SchedulerResult<Self> {
        policy.validate()?;
        Ok(Self {
            default_policy: Some(policy),
            ..Self::default()
        })
    }

    pub fn set_job_retry_policy(&mut self, job_id: &str, policy: RetryPolicy) -> SchedulerResult<()> {
        policy.validate()?;
        self.job_policies.insert(job_id.to_string(), policy);
        Ok(())
    }

    pub fn set_type_retry_policy(&mut self, job_type: &str, policy: RetryPolicy) -> SchedulerResult<()> {
        policy.validate()?;
        self.type_policies.insert(job_type.to_string(), policy);
        Ok(())
    }

    /// Records the job type used for type-level policy lookup.
    pub fn register_job_type(&mut self, job_id: &str, job_type: &str) {
        self.job_types
            .insert(job_id.to_string(), job_type.to_string());
    }

    pub fn policy_for(&self, job_id: &str) -> Option<&RetryPolicy> {
        self.job_policies
            .get(job_id)
            .or_else(|| {
                self.job_types
                    .get(job_id)
                    .and_then(|job_type| self.type_policies.get(job_type))
            })
            .or(self.default_policy.as_ref())
    }

    /// Decides whether `job_id` gets another try.
    ///
    /// `attempt` is the number of retries already made and feeds the backoff
    /// curve unchanged, so a linear policy waits nothing before the first
    /// retry. Returns `(false, 0)` when no policy applies, the retries are
    /// exhausted or `last_error` is filtered out.
    pub fn should_retry_job(&self, job_id: &str, attempt: u32, last_error: &str) -> (bool, Duration) {
        let Some(policy) = self.policy_for(job_id) else {
            debug!("作业 {} 没有重试策略", job_id);
            return (false, Duration::ZERO);
        };

        if attempt >= policy.max_retries {
            debug!(
                "作业 {} 已重试 {} 次，达到上限 {}",
                job_id, attempt, policy.max_retries
            );
            return (false, Duration::ZERO);
        }

        if !policy.is_retryable_error(last_error) {
            debug!("作业 {} 的错误不可重试: {}", job_id, last_error);
            return (false, Duration::ZERO);
        }

        (true, backoff_delay(policy, attempt))
    }

    pub fn remove_job(&mut self, job_id: &str) {
        self.job_policies.remove(job_id);
        self.job_types.remove(job_id);
    }
}

/// Delay for `attempt` under `policy`, where `attempt` counts the retries
/// already made.
///
/// Jitter of `±jitter_factor` is applied before capping at `max_delay`; the
/// result is never negative.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let raw = policy
        .strategy
        .raw_delay_secs(policy.initial_delay, policy.backoff_factor, attempt);

    let jittered = if policy.jitter_factor > 0.0 {
        let jitter = raw * policy.jitter_factor * (rand::random::<f64>() - 0.5) * 2.0;
        raw + jitter
    } else {
        raw
    };

    if !jittered.is_finite() || jittered >= policy.max_delay.as_secs_f64() {
        return policy.max_delay;
    }
    Duration::from_secs_f64(jittered.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobflow_core::models::BackoffStrategy;

    fn policy(strategy: BackoffStrategy) -> RetryPolicy {
        RetryPolicy::new(5, Duration::from_secs(1), Duration::from_secs(30))
            .with_backoff_factor(2.0)
            .with_strategy(strategy)
    }

    #[test]
    fn test_linear_is_the_default_shape() {
        let policy = RetryPolicy::new(5, Duration::from_secs(1), Duration::from_secs(30))
            .with_backoff_factor(2.0);
        assert_eq!(backoff_delay(&policy, 0), Duration::ZERO);
        assert_eq!(backoff_delay(&policy, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(&policy, 3), Duration::from_secs(6));
    }

    #[test]
    fn test_exponential_and_constant() {
        let exponential = policy(BackoffStrategy::Exponential);
        assert_eq!(backoff_delay(&exponential, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(&exponential, 4), Duration::from_secs(16));

        let constant = policy(BackoffStrategy::Constant);
        assert_eq!(backoff_delay(&constant, 4), Duration::from_secs(1));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let exponential = policy(BackoffStrategy::Exponential);
        assert_eq!(backoff_delay(&exponential, 10), Duration::from_secs(30));
        assert_eq!(backoff_delay(&exponential, 500), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let jittered = policy(BackoffStrategy::Linear).with_jitter(0.5);
        for _ in 0..100 {
            let delay = backoff_delay(&jittered, 2).as_secs_f64();
            assert!((2.0..=6.0).contains(&delay), "delay {delay} outside jitter band");
        }
    }

    #[test]
    fn test_no_policy_means_no_retry() {
        let engine = RetryPolicyEngine::new();
        assert_eq!(engine.should_retry_job("job", 0, "boom"), (false, Duration::ZERO));
    }
}
