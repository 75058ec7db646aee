use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{SchedulerError, SchedulerResult};

/// Shape of the delay curve between retries.
///
/// `Linear` is the default: `initial * factor * attempt`. `Exponential`
/// grows as `initial * factor^attempt` and `Constant` always waits `initial`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    #[default]
    Linear,
    Exponential,
    Constant,
}

impl BackoffStrategy {
    /// Uncapped delay in seconds for the given attempt.
    pub fn raw_delay_secs(&self, initial: Duration, factor: f64, attempt: u32) -> f64 {
        let base = initial.as_secs_f64();
        match self {
            BackoffStrategy::Linear => base * factor * attempt as f64,
            BackoffStrategy::Exponential => base * factor.powi(attempt as i32),
            BackoffStrategy::Constant => base,
        }
    }
}

impl std::str::FromStr for BackoffStrategy {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(BackoffStrategy::Linear),
            "exponential" => Ok(BackoffStrategy::Exponential),
            "constant" => Ok(BackoffStrategy::Constant),
            other => Err(SchedulerError::validation(format!(
                "unknown backoff strategy: {other}"
            ))),
        }
    }
}

/// 重试策略配置
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// When non-empty, only errors whose message matches an entry exactly are retried.
    pub retryable_errors: HashSet<String>,
    pub strategy: BackoffStrategy,
    /// Random spread of ±`jitter_factor` applied to the computed delay (0.0-1.0).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            retryable_errors: HashSet::new(),
            strategy: BackoffStrategy::Linear,
            jitter_factor: 0.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            ..Default::default()
        }
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor;
        self
    }

    pub fn with_retryable_errors<I, S>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retryable_errors = errors.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `error` is eligible for a retry under this policy's filter.
    pub fn is_retryable_error(&self, error: &str) -> bool {
        self.retryable_errors.is_empty() || self.retryable_errors.contains(error)
    }

    pub fn validate(&self) -> SchedulerResult<()> {
        if self.max_delay < self.initial_delay {
            return Err(SchedulerError::validation(format!(
                "max_delay {:?} is smaller than initial_delay {:?}",
                self.max_delay, self.initial_delay
            )));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 0.0 {
            return Err(SchedulerError::validation(format!(
                "backoff_factor must be a non-negative number, got {}",
                self.backoff_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(SchedulerError::validation(format!(
                "jitter_factor must be within [0, 1], got {}",
                self.jitter_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_shapes() {
        let initial = Duration::from_secs(2);
        assert_eq!(BackoffStrategy::Linear.raw_delay_secs(initial, 3.0, 2), 12.0);
        assert_eq!(BackoffStrategy::Exponential.raw_delay_secs(initial, 3.0, 2), 18.0);
        assert_eq!(BackoffStrategy::Constant.raw_delay_secs(initial, 3.0, 2), 2.0);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("Exponential".parse::<BackoffStrategy>().unwrap(), BackoffStrategy::Exponential);
        assert!("fibonacci".parse::<BackoffStrategy>().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_delays() {
        let policy = RetryPolicy::new(3, Duration::from_secs(10), Duration::from_secs(1));
        assert!(matches!(policy.validate(), Err(SchedulerError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_bad_jitter() {
        let policy = RetryPolicy::default().with_jitter(1.5);
        assert!(policy.validate().is_err());
        assert!(RetryPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_retryable_error_filter() {
        let open = RetryPolicy::default();
        assert!(open.is_retryable_error("anything"));

        let filtered = RetryPolicy::default().with_retryable_errors(["timeout"]);
        assert!(filtered.is_retryable_error("timeout"));
        assert!(!filtered.is_retryable_error("timeout "));
    }
}
