use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::serde_helpers::duration_ms;
use crate::models::{BackoffStrategy, RetryPolicy};
use crate::SchedulerResult;

/// Default retry policy applied to job types without an explicit one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Install this policy as the fallback for every job type.
    pub enabled: bool,
    pub max_retries: u32,
    #[serde(rename = "initial_delay_ms", with = "duration_ms")]
    pub initial_delay: Duration,
    #[serde(rename = "max_delay_ms", with = "duration_ms")]
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub backoff_strategy: BackoffStrategy,
    pub jitter_factor: f64,
    pub retryable_errors: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            enabled: false,
            max_retries: policy.max_retries,
            initial_delay: policy.initial_delay,
            max_delay: policy.max_delay,
            backoff_factor: policy.backoff_factor,
            backoff_strategy: policy.strategy,
            jitter_factor: policy.jitter_factor,
            retryable_errors: Vec::new(),
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.initial_delay, self.max_delay)
            .with_backoff_factor(self.backoff_factor)
            .with_strategy(self.backoff_strategy)
            .with_jitter(self.jitter_factor)
            .with_retryable_errors(self.retryable_errors.iter().cloned())
    }

    pub fn validate(&self) -> SchedulerResult<()> {
        self.to_policy().validate()
    }
}
