//! Adaptive worker pool for jobflow.

pub mod pool;
pub mod task;

pub use pool::{PoolStats, ScaleDecision, WorkerPool};
pub use task::{CompletionCallback, FnExecutor, Task, TaskExecutor, TaskId, TaskOutcome};
