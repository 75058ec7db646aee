use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::serde_helpers::duration_ms;
use crate::{SchedulerError, SchedulerResult};

/// How a healthy cluster is chosen for `submit_job`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClusterSelection {
    #[default]
    RoundRobin,
    LeastLoaded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Interval between scheduling passes of the controller loop.
    #[serde(rename = "scan_interval_ms", with = "duration_ms")]
    pub scan_interval: Duration,
    pub cluster_selection: ClusterSelection,
    /// How long shutdown waits for workers to drain.
    #[serde(rename = "shutdown_timeout_ms", with = "duration_ms")]
    pub shutdown_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_millis(500),
            cluster_selection: ClusterSelection::RoundRobin,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.scan_interval.is_zero() {
            return Err(SchedulerError::config_error("scan_interval must be greater than 0"));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(SchedulerError::config_error(
                "shutdown_timeout must be greater than 0",
            ));
        }
        Ok(())
    }
}
