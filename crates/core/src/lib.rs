pub mod config;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod traits;

pub use config::{AppConfig, ClusterSelection, ObservabilityConfig, PoolConfig, RetryConfig, SchedulerConfig};
pub use errors::*;
pub use logging::{init_logging, LogFormat, StructuredLogger};
pub use metrics::MetricsCollector;
pub use models::{
    BackoffStrategy, Cluster, HookErrorPolicy, HookType, Job, JobId, JobStatus, RetryPolicy,
};
pub use traits::{ClusterClient, HookCallback, HookContext};

#[cfg(feature = "mocks")]
pub use traits::MockClusterClient;
