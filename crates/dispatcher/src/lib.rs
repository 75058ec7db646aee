//! 作业调度
//!
//! Dependency-aware job scheduling on top of `jobflow-worker`:
//!
//! - [`dependency_checker`]: prerequisite graph with cycle rejection
//! - [`priority`]: priority assignment and dispatch ordering
//! - [`retry_service`]: retry policies and backoff
//! - [`hooks`]: lifecycle hooks with timeouts and error policies
//! - [`strategies`]: remote cluster selection
//! - [`scheduler`]: the [`JobScheduler`] facade tying them together
//! - [`controller`]: background loop driving scheduling passes

pub mod controller;
pub mod dependency_checker;
pub mod hooks;
pub mod priority;
pub mod retry_service;
pub mod scheduler;
pub mod strategies;

pub use controller::{run_scheduler_loop, SchedulerController};
pub use dependency_checker::DependencyGraph;
pub use hooks::{run_hooks, Hook, HookExecutor, DEFAULT_HOOK_TIMEOUT};
pub use priority::{validate_priority, PriorityIndex};
pub use retry_service::{backoff_delay, RetryPolicyEngine};
pub use scheduler::{JobScheduler, JobSchedulerBuilder};
pub use strategies::{strategy_for, ClusterSelectionStrategy, LeastLoadedStrategy, RoundRobinStrategy};
