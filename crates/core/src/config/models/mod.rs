pub mod app_config;
pub mod observability;
pub mod pool;
pub mod retry;
pub mod scheduler;

pub use app_config::AppConfig;
pub use observability::ObservabilityConfig;
pub use pool::PoolConfig;
pub use retry::RetryConfig;
pub use scheduler::{ClusterSelection, SchedulerConfig};
