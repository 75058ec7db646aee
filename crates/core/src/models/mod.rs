pub mod cluster;
pub mod hook;
pub mod job;
pub mod retry;

pub use cluster::Cluster;
pub use hook::{HookErrorPolicy, HookType};
pub use job::{Job, JobId, JobStatus, DEFAULT_PRIORITY, HIGHEST_PRIORITY, LOWEST_PRIORITY};
pub use retry::{BackoffStrategy, RetryPolicy};
