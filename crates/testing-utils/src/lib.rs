//! # jobflow testing utils
//!
//! Shared test doubles and builders for the jobflow crates.
//!
//! ## Features
//!
//! - **Builders**: `JobBuilder`, `RetryPolicyBuilder`, `ClusterBuilder`
//! - **Executors**: recording, flaky, always-failing and gate-blocked task executors
//! - **Hooks**: `RecordingHook` that records every invocation
//! - **Cluster client**: in-memory `RecordingClusterClient`, plus mockall's
//!   `MockClusterClient`
//! - **Helpers**: `TestEnv::wait_for` polling and logging setup
//!
//! ## Usage
//!
//! ```toml
//! [dev-dependencies]
//! jobflow-testing-utils = { path = "../testing-utils" }
//! ```
//!
//! ```rust
//! use jobflow_testing_utils::{JobBuilder, RecordingExecutor};
//!
//! let job = JobBuilder::new().with_id("job-1").with_priority(1).build();
//! let executor = RecordingExecutor::new();
//! assert_eq!(job.priority, 1);
//! assert_eq!(executor.call_count(), 0);
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
