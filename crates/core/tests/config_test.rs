use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use jobflow_core::{AppConfig, BackoffStrategy, ClusterSelection, LogFormat};
use tempfile::TempDir;

const SAMPLE: &str = r#"
[pool]
min_workers = 4
max_workers = 32
queue_size = 500
task_timeout_ms = 120000
scale_up_threshold = 0.75
scale_down_threshold = 0.1
scale_check_interval_ms = 2000
adaptive_scaling = true

[retry]
enabled = true
max_retries = 5
initial_delay_ms = 500
max_delay_ms = 30000
backoff_factor = 2.0
backoff_strategy = "exponential"
jitter_factor = 0.1
retryable_errors = ["timeout", "connection reset"]

[scheduler]
scan_interval_ms = 250
cluster_selection = "least_loaded"
shutdown_timeout_ms = 10000

[observability]
log_level = "debug"
log_format = "json"
metrics_enabled = false
"#;

fn write_config(dir: &TempDir, content: &str) -> String {
    let path = dir.path().join("jobflow.toml");
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());

    // 验证默认值
    assert_eq!(config.pool.min_workers, 2);
    assert_eq!(config.pool.max_workers, 16);
    assert_eq!(config.pool.task_timeout, Duration::from_secs(30));
    assert!(!config.retry.enabled);
    assert_eq!(config.retry.backoff_strategy, BackoffStrategy::Linear);
    assert_eq!(config.scheduler.cluster_selection, ClusterSelection::RoundRobin);
    assert_eq!(config.observability.log_format, LogFormat::Pretty);
}

#[test]
fn test_full_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, SAMPLE);

    let config = AppConfig::load_with_env(Some(&path), Some(HashMap::new())).unwrap();

    assert_eq!(config.pool.min_workers, 4);
    assert_eq!(config.pool.queue_size, 500);
    assert_eq!(config.pool.task_timeout, Duration::from_secs(120));
    assert_eq!(config.pool.scale_check_interval, Duration::from_secs(2));
    assert_eq!(config.scheduler.scan_interval, Duration::from_millis(250));
    assert_eq!(config.scheduler.cluster_selection, ClusterSelection::LeastLoaded);
    assert_eq!(config.observability.log_level, "debug");
    assert_eq!(config.observability.log_format, LogFormat::Json);
    assert!(!config.observability.metrics_enabled);

    let policy = config.retry.to_policy();
    assert_eq!(policy.max_retries, 5);
    assert_eq!(policy.initial_delay, Duration::from_millis(500));
    assert_eq!(policy.strategy, BackoffStrategy::Exponential);
    assert!(policy.is_retryable_error("connection reset"));
    assert!(!policy.is_retryable_error("disk full"));
}

#[test]
fn test_env_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, SAMPLE);

    let mut env = HashMap::new();
    env.insert("JOBFLOW_SCHEDULER__CLUSTER_SELECTION".to_string(), "round_robin".to_string());
    env.insert("JOBFLOW_OBSERVABILITY__LOG_LEVEL".to_string(), "warn".to_string());
    env.insert("JOBFLOW_POOL__ADAPTIVE_SCALING".to_string(), "false".to_string());

    let config = AppConfig::load_with_env(Some(&path), Some(env)).unwrap();
    assert_eq!(config.scheduler.cluster_selection, ClusterSelection::RoundRobin);
    assert_eq!(config.observability.log_level, "warn");
    assert!(!config.pool.adaptive_scaling);
    assert_eq!(config.pool.max_workers, 32);
}

#[test]
fn test_invalid_values_rejected() {
    let dir = TempDir::new().unwrap();

    let cases = [
        "[pool]\nqueue_size = 0\n",
        "[pool]\nscale_up_threshold = 0.1\nscale_down_threshold = 0.5\n",
        "[retry]\ninitial_delay_ms = 5000\nmax_delay_ms = 1000\n",
        "[retry]\njitter_factor = 2.0\n",
        "[scheduler]\nscan_interval_ms = 0\n",
        "[observability]\nlog_level = \"loud\"\n",
    ];
    for content in cases {
        let path = write_config(&dir, content);
        let result = AppConfig::load_with_env(Some(&path), Some(HashMap::new()));
        assert!(result.is_err(), "accepted invalid config:\n{content}");
    }
}

#[test]
fn test_log_format_parsing() {
    assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
    assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
    assert!("xml".parse::<LogFormat>().is_err());
}
