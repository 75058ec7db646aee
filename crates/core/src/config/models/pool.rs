use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::serde_helpers::duration_ms;
use crate::{SchedulerError, SchedulerResult};

/// Worker pool sizing and scaling configuration.
///
/// Invariant enforced by the pool: `min_workers <= current <= max_workers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    pub queue_size: usize,
    #[serde(rename = "task_timeout_ms", with = "duration_ms")]
    pub task_timeout: Duration,
    /// Queue utilization (0.0-1.0) above which the pool doubles.
    pub scale_up_threshold: f64,
    /// Queue utilization (0.0-1.0) below which the pool halves.
    pub scale_down_threshold: f64,
    #[serde(rename = "scale_check_interval_ms", with = "duration_ms")]
    pub scale_check_interval: Duration,
    pub adaptive_scaling: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_workers: 2,
            max_workers: 16,
            queue_size: 100,
            task_timeout: Duration::from_secs(30),
            scale_up_threshold: 0.8,
            scale_down_threshold: 0.2,
            scale_check_interval: Duration::from_secs(5),
            adaptive_scaling: true,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.min_workers == 0 {
            return Err(SchedulerError::config_error("min_workers must be greater than 0"));
        }
        if self.max_workers < self.min_workers {
            return Err(SchedulerError::config_error(format!(
                "max_workers ({}) must be >= min_workers ({})",
                self.max_workers, self.min_workers
            )));
        }
        if self.queue_size == 0 {
            return Err(SchedulerError::config_error("queue_size must be greater than 0"));
        }
        if self.task_timeout.is_zero() {
            return Err(SchedulerError::config_error("task_timeout must be greater than 0"));
        }
        if self.scale_check_interval.is_zero() {
            return Err(SchedulerError::config_error(
                "scale_check_interval must be greater than 0",
            ));
        }
        let thresholds_valid = (0.0..=1.0).contains(&self.scale_down_threshold)
            && (0.0..=1.0).contains(&self.scale_up_threshold)
            && self.scale_down_threshold < self.scale_up_threshold;
        if !thresholds_valid {
            return Err(SchedulerError::config_error(format!(
                "scale thresholds must satisfy 0 <= down ({}) < up ({}) <= 1",
                self.scale_down_threshold, self.scale_up_threshold
            )));
        }
        Ok(())
    }
}
