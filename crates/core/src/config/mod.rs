//! 配置管理
//!
//! Typed configuration for the pool, retry defaults, scheduler loop and
//! observability. Loading order: built-in defaults, optional TOML file,
//! then `JOBFLOW_`-prefixed environment variables (`__` between sections,
//! e.g. `JOBFLOW_POOL__MAX_WORKERS=16`).

pub mod models;
pub mod serde_helpers;

pub use models::*;
