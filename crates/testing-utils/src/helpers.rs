//! Test helper utilities

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Test environment setup utilities
pub struct TestEnv;

impl TestEnv {
    /// Polls an async condition until it holds or `timeout` elapses.
    pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if condition().await {
                return true;
            }
            sleep(POLL_INTERVAL).await;
        }
        condition().await
    }

    /// Synchronous variant of [`TestEnv::wait_for`].
    pub async fn wait_until<F>(mut condition: F, timeout: Duration) -> bool
    where
        F: FnMut() -> bool,
    {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if condition() {
                return true;
            }
            sleep(POLL_INTERVAL).await;
        }
        condition()
    }
}

/// Integration test setup helpers
pub struct IntegrationTestSetup;

impl IntegrationTestSetup {
    /// Set up logging for tests (call once per test binary)
    pub fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("debug")
            .try_init();
    }
}
