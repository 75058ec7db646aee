//! jobflow
//!
//! Application wiring for the `jobflow` binary: configuration, the worker
//! pool, the job scheduler and its controller loop, and graceful shutdown.

pub mod app;
pub mod shutdown;
