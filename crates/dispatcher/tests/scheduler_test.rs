use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use jobflow_core::{
    ClusterSelection, HookType, JobStatus, MockClusterClient, PoolConfig, SchedulerError,
};
use jobflow_dispatcher::{Hook, JobScheduler, SchedulerController};
use jobflow_testing_utils::{
    BlockingExecutor, ClusterBuilder, FlakyExecutor, IntegrationTestSetup, JobBuilder,
    RecordingClusterClient, RecordingExecutor, RecordingHook, RetryPolicyBuilder, TestEnv,
};
use jobflow_worker::{TaskExecutor, WorkerPool};
use serde_json::json;

const WAIT: Duration = Duration::from_secs(5);

fn pool(min: usize, max: usize, queue: usize) -> WorkerPool {
    let config = PoolConfig {
        min_workers: min,
        max_workers: max,
        queue_size: queue,
        adaptive_scaling: false,
        ..PoolConfig::default()
    };
    WorkerPool::new(config).unwrap()
}

fn local_scheduler() -> JobScheduler {
    IntegrationTestSetup::init_logging();
    JobScheduler::builder(pool(2, 4, 16)).build().unwrap()
}

async fn wait_for_status(scheduler: &JobScheduler, job_id: &str, status: JobStatus) -> bool {
    TestEnv::wait_for(
        || async move {
            scheduler
                .get_job(job_id)
                .await
                .map(|job| job.status == status)
                .unwrap_or(false)
        },
        WAIT,
    )
    .await
}

#[tokio::test]
async fn test_ready_jobs_ordered_by_priority_then_age() {
    let scheduler = local_scheduler();
    let x = JobBuilder::new().with_id("X").with_priority(1).created_ms_ago(10).build();
    let y = JobBuilder::new().with_id("Y").with_priority(3).created_ms_ago(20).build();
    let z = JobBuilder::new().with_id("Z").with_priority(1).created_ms_ago(20).build();
    for job in [x, y, z] {
        scheduler.add_job(job).await.unwrap();
    }

    let jobs = scheduler.list_jobs().await;
    let ready = scheduler
        .get_jobs_ready_for_execution(&jobs, &HashSet::new())
        .await;
    let order: Vec<_> = ready.iter().map(|job| job.id.as_str()).collect();
    assert_eq!(order, vec!["Z", "X", "Y"]);

    scheduler.set_job_priority("Y", 1).await.unwrap();
    assert_eq!(scheduler.get_job_priority("Y").await, 1);
    let jobs = scheduler.list_jobs().await;
    let ready = scheduler
        .get_jobs_ready_for_execution(&jobs, &HashSet::new())
        .await;
    let order: Vec<_> = ready.iter().map(|job| job.id.as_str()).collect();
    assert_eq!(order, vec!["Y", "Z", "X"]);

    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_add_job_validation() {
    let scheduler = local_scheduler();

    let result = scheduler.add_job(JobBuilder::new().with_id("").build()).await;
    assert!(matches!(result, Err(SchedulerError::Validation(_))));

    for priority in [0, 11] {
        let job = JobBuilder::new().with_id("bad").with_priority(priority).build();
        assert!(matches!(
            scheduler.add_job(job).await,
            Err(SchedulerError::Validation(_))
        ));
    }

    scheduler.add_job(JobBuilder::new().with_id("dup").build()).await.unwrap();
    let result = scheduler.add_job(JobBuilder::new().with_id("dup").build()).await;
    assert!(matches!(result, Err(SchedulerError::Validation(_))));

    assert!(matches!(
        scheduler.set_job_priority("dup", 0).await,
        Err(SchedulerError::Validation(_))
    ));
    assert!(matches!(
        scheduler.get_job("missing").await,
        Err(SchedulerError::JobNotFound { .. })
    ));
    assert!(matches!(
        scheduler.update_job_status("missing", JobStatus::Completed).await,
        Err(SchedulerError::JobNotFound { .. })
    ));

    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_priority_set_before_add_is_applied() {
    let scheduler = local_scheduler();
    scheduler.set_job_priority("later", 2).await.unwrap();
    scheduler.add_job(JobBuilder::new().with_id("later").build()).await.unwrap();

    assert_eq!(scheduler.get_job("later").await.unwrap().priority, 2);
    assert_eq!(scheduler.get_job_priority("unknown").await, 5);
    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_failing_job_retries_then_fails() {
    let scheduler = local_scheduler();
    let executor = FlakyExecutor::always_failing("boom");
    scheduler
        .register_executor("test", Arc::new(executor.clone()))
        .await;

    let retry_hook = Arc::new(RecordingHook::new("on-retry"));
    let failure_hook = Arc::new(RecordingHook::new("on-failure"));

    scheduler.add_job(JobBuilder::new().with_id("J").build()).await.unwrap();
    scheduler
        .set_job_retry_policy("J", RetryPolicyBuilder::new().with_max_retries(3).build())
        .await
        .unwrap();
    scheduler
        .register_hook("J", Hook::new("on-retry", HookType::OnRetry, retry_hook.clone()))
        .await;
    scheduler
        .register_hook("J", Hook::new("on-failure", HookType::OnFailure, failure_hook.clone()))
        .await;

    let controller = SchedulerController::new(scheduler.clone(), Duration::from_millis(20));
    controller.start();

    assert!(wait_for_status(&scheduler, "J", JobStatus::Failed).await);
    assert!(TestEnv::wait_until(|| failure_hook.calls().len() == 1, WAIT).await);
    controller.stop().await;

    let job = scheduler.get_job("J").await.unwrap();
    assert_eq!(executor.call_count(), 4);
    assert_eq!(job.attempts, 3);
    assert_eq!(job.last_error.as_deref(), Some("boom"));

    let retries = retry_hook.calls();
    assert_eq!(retries.len(), 3);
    assert_eq!(
        retries.iter().map(|call| call.attempt).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(failure_hook.calls()[0].error.as_deref(), Some("boom"));

    let metrics = scheduler.metrics();
    assert_eq!(metrics.failed_jobs(), 1);
    assert_eq!(metrics.retried_jobs(), 3);

    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_flaky_job_recovers_within_retry_budget() {
    let scheduler = local_scheduler();
    let executor = FlakyExecutor::new(2, "connection reset");
    scheduler
        .register_executor("test", Arc::new(executor.clone()))
        .await;
    scheduler
        .set_type_retry_policy(
            "test",
            RetryPolicyBuilder::new()
                .with_max_retries(3)
                .with_retryable_errors(&["connection reset"])
                .build(),
        )
        .await
        .unwrap();
    scheduler.add_job(JobBuilder::new().with_id("flaky").build()).await.unwrap();

    let controller = SchedulerController::new(scheduler.clone(), Duration::from_millis(20));
    controller.start();
    assert!(wait_for_status(&scheduler, "flaky", JobStatus::Completed).await);
    controller.stop().await;

    let job = scheduler.get_job("flaky").await.unwrap();
    assert_eq!(job.attempts, 2);
    assert_eq!(job.last_error, None);
    assert_eq!(executor.call_count(), 3);
    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_non_retryable_error_fails_immediately() {
    let scheduler = local_scheduler();
    let executor = FlakyExecutor::always_failing("permission denied");
    scheduler
        .register_executor("test", Arc::new(executor.clone()))
        .await;
    scheduler.add_job(JobBuilder::new().with_id("denied").build()).await.unwrap();
    scheduler
        .set_job_retry_policy(
            "denied",
            RetryPolicyBuilder::new()
                .with_retryable_errors(&["timeout"])
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(scheduler.schedule_ready_jobs().await.unwrap(), 1);
    assert!(wait_for_status(&scheduler, "denied", JobStatus::Failed).await);
    assert_eq!(executor.call_count(), 1);
    assert_eq!(scheduler.get_job("denied").await.unwrap().attempts, 0);
    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_dependency_chain_runs_in_order() {
    let scheduler = JobScheduler::builder(pool(1, 1, 8)).build().unwrap();
    let recorder = RecordingExecutor::new();
    scheduler
        .register_executor("test", Arc::new(recorder.clone()))
        .await;

    // Lower priority values would run first without the dependencies.
    for (id, priority) in [("load", 1), ("transform", 2), ("extract", 3)] {
        let job = JobBuilder::new()
            .with_id(id)
            .with_priority(priority)
            .with_payload(json!({ "step": id }))
            .build();
        scheduler.add_job(job).await.unwrap();
    }
    scheduler
        .set_job_dependencies("transform", vec!["extract".to_string()])
        .await
        .unwrap();
    scheduler
        .set_job_dependencies("load", vec!["transform".to_string()])
        .await
        .unwrap();

    let controller = SchedulerController::new(scheduler.clone(), Duration::from_millis(20));
    controller.start();
    assert!(controller.is_running());
    assert!(wait_for_status(&scheduler, "load", JobStatus::Completed).await);
    controller.stop().await;
    assert!(!controller.is_running());

    assert_eq!(
        recorder.payloads(),
        vec![
            json!({ "step": "extract" }),
            json!({ "step": "transform" }),
            json!({ "step": "load" }),
        ]
    );
    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_missing_executor_fails_job() {
    let scheduler = local_scheduler();
    let failure_hook = Arc::new(RecordingHook::new("on-failure"));
    scheduler
        .add_job(JobBuilder::new().with_id("orphan").with_type("unknown").build())
        .await
        .unwrap();
    scheduler
        .register_hook("orphan", Hook::new("on-failure", HookType::OnFailure, failure_hook.clone()))
        .await;

    assert_eq!(scheduler.schedule_ready_jobs().await.unwrap(), 0);

    let job = scheduler.get_job("orphan").await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.last_error.unwrap().contains("no executor"));
    assert_eq!(failure_hook.calls().len(), 1);
    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_full_queue_leaves_jobs_pending() {
    let scheduler = JobScheduler::builder(pool(1, 1, 1)).build().unwrap();
    let blocker = BlockingExecutor::new();
    scheduler
        .register_executor("test", Arc::new(blocker.clone()))
        .await;

    scheduler.add_job(JobBuilder::new().with_id("first").build()).await.unwrap();
    assert_eq!(scheduler.schedule_ready_jobs().await.unwrap(), 1);
    assert!(TestEnv::wait_until(|| blocker.started() == 1, WAIT).await);

    for id in ["j1", "j2", "j3"] {
        scheduler.add_job(JobBuilder::new().with_id(id).build()).await.unwrap();
    }
    assert_eq!(scheduler.schedule_ready_jobs().await.unwrap(), 1);

    let jobs = scheduler.list_jobs().await;
    let count = |status: JobStatus| jobs.iter().filter(|job| job.status == status).count();
    assert_eq!(count(JobStatus::Running), 2);
    assert_eq!(count(JobStatus::Pending), 2);

    blocker.open();
    for id in ["first", "j1"] {
        assert!(wait_for_status(&scheduler, id, JobStatus::Completed).await);
    }
    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_schedule_after_pool_shutdown_reverts_jobs() {
    let scheduler = local_scheduler();
    let executor: Arc<dyn TaskExecutor> = Arc::new(RecordingExecutor::new());
    scheduler.register_executor("test", executor).await;
    scheduler.pool().shutdown(WAIT).await.unwrap();

    scheduler.add_job(JobBuilder::new().with_id("late").build()).await.unwrap();
    let result = scheduler.schedule_ready_jobs().await;
    assert_eq!(result, Err(SchedulerError::PoolClosed));
    assert_eq!(
        scheduler.get_job("late").await.unwrap().status,
        JobStatus::Pending
    );
}

#[tokio::test]
async fn test_job_interrupted_by_shutdown_returns_to_pending() {
    let scheduler = local_scheduler();
    let blocker = BlockingExecutor::new();
    scheduler
        .register_executor("test", Arc::new(blocker.clone()))
        .await;

    let retry_hook = Arc::new(RecordingHook::new("on-retry"));
    let failure_hook = Arc::new(RecordingHook::new("on-failure"));
    scheduler.add_job(JobBuilder::new().with_id("long").build()).await.unwrap();
    scheduler
        .set_job_retry_policy("long", RetryPolicyBuilder::new().with_max_retries(3).build())
        .await
        .unwrap();
    scheduler
        .register_hook("long", Hook::new("on-retry", HookType::OnRetry, retry_hook.clone()))
        .await;
    scheduler
        .register_hook("long", Hook::new("on-failure", HookType::OnFailure, failure_hook.clone()))
        .await;

    assert_eq!(scheduler.schedule_ready_jobs().await.unwrap(), 1);
    assert!(TestEnv::wait_until(|| blocker.started() == 1, WAIT).await);

    scheduler.pool().shutdown(WAIT).await.unwrap();
    assert_eq!(blocker.finished(), 1);

    let job = scheduler.get_job("long").await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 0);
    assert!(retry_hook.calls().is_empty());
    assert!(failure_hook.calls().is_empty());

    let metrics = scheduler.metrics();
    assert_eq!(metrics.failed_jobs(), 0);
    assert_eq!(metrics.retried_jobs(), 0);
}

#[tokio::test]
async fn test_round_robin_cluster_submission() {
    let client = RecordingClusterClient::new();
    let scheduler = JobScheduler::builder(pool(1, 2, 8))
        .cluster_client(Arc::new(client.clone()))
        .cluster_selection(ClusterSelection::RoundRobin)
        .build()
        .unwrap();

    scheduler.register_cluster(ClusterBuilder::new("c1").build()).await;
    scheduler
        .register_cluster(ClusterBuilder::new("c2").unhealthy().build())
        .await;
    scheduler.register_cluster(ClusterBuilder::new("c3").build()).await;

    let mut targets = Vec::new();
    for i in 0..4 {
        let job = JobBuilder::new().with_id(&format!("remote-{i}")).build();
        targets.push(scheduler.submit_job(job).await.unwrap());
    }
    assert_eq!(targets, vec!["c1", "c3", "c1", "c3"]);
    assert_eq!(client.submissions().len(), 4);

    let job = scheduler.get_job("remote-0").await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.cluster_id.as_deref(), Some("c1"));

    // Remote jobs are never dispatched to the local pool.
    assert_eq!(scheduler.schedule_ready_jobs().await.unwrap(), 0);

    let active = |clusters: &[jobflow_core::Cluster], id: &str| {
        clusters.iter().find(|c| c.id == id).map(|c| c.active_jobs)
    };
    assert_eq!(active(&scheduler.clusters().await, "c1"), Some(2));
    scheduler
        .update_job_status("remote-0", JobStatus::Completed)
        .await
        .unwrap();
    assert_eq!(active(&scheduler.clusters().await, "c1"), Some(1));

    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_least_loaded_cluster_submission() {
    let scheduler = JobScheduler::builder(pool(1, 2, 8))
        .cluster_client(Arc::new(RecordingClusterClient::new()))
        .cluster_selection(ClusterSelection::LeastLoaded)
        .build()
        .unwrap();
    scheduler
        .register_cluster(ClusterBuilder::new("busy").with_active_jobs(2).build())
        .await;
    scheduler.register_cluster(ClusterBuilder::new("idle").build()).await;

    let mut targets = Vec::new();
    for i in 0..3 {
        let job = JobBuilder::new().with_id(&format!("job-{i}")).build();
        targets.push(scheduler.submit_job(job).await.unwrap());
    }
    assert_eq!(targets, vec!["idle", "idle", "busy"]);
    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_submit_with_mock_cluster_client() {
    let mut client = MockClusterClient::new();
    client
        .expect_submit_job()
        .withf(|cluster, job| cluster.id == "east" && job.id == "nightly")
        .times(1)
        .returning(|_, _| Ok(()));

    let scheduler = JobScheduler::builder(pool(1, 2, 8))
        .cluster_client(Arc::new(client))
        .build()
        .unwrap();
    scheduler.register_cluster(ClusterBuilder::new("east").build()).await;

    let cluster = scheduler
        .submit_job(JobBuilder::new().with_id("nightly").build())
        .await
        .unwrap();
    assert_eq!(cluster, "east");
    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_submit_without_healthy_cluster() {
    let scheduler = JobScheduler::builder(pool(1, 2, 8))
        .cluster_client(Arc::new(RecordingClusterClient::new()))
        .build()
        .unwrap();
    scheduler
        .register_cluster(ClusterBuilder::new("c1").unhealthy().build())
        .await;

    let result = scheduler
        .submit_job(JobBuilder::new().with_id("stranded").build())
        .await;
    assert_eq!(result, Err(SchedulerError::NoHealthyCluster));
    assert!(matches!(
        scheduler.get_job("stranded").await,
        Err(SchedulerError::JobNotFound { .. })
    ));

    scheduler.set_cluster_health("c1", true).await.unwrap();
    assert!(scheduler
        .submit_job(JobBuilder::new().with_id("stranded").build())
        .await
        .is_ok());
    assert!(matches!(
        scheduler.set_cluster_health("nope", true).await,
        Err(SchedulerError::ClusterNotFound { .. })
    ));
    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_failed_cluster_submission_is_not_tracked() {
    let scheduler = JobScheduler::builder(pool(1, 2, 8))
        .cluster_client(Arc::new(RecordingClusterClient::failing(
            SchedulerError::execution("cluster unreachable"),
        )))
        .build()
        .unwrap();
    scheduler.register_cluster(ClusterBuilder::new("c1").build()).await;

    let result = scheduler
        .submit_job(JobBuilder::new().with_id("lost").build())
        .await;
    assert_eq!(result, Err(SchedulerError::execution("cluster unreachable")));
    assert!(scheduler.list_jobs().await.is_empty());
    assert_eq!(scheduler.clusters().await[0].active_jobs, 0);
    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_submit_requires_cluster_client() {
    let scheduler = local_scheduler();
    scheduler.register_cluster(ClusterBuilder::new("c1").build()).await;
    let result = scheduler
        .submit_job(JobBuilder::new().with_id("remote").build())
        .await;
    assert!(matches!(result, Err(SchedulerError::Configuration(_))));
    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_health_reflects_completed_jobs() {
    let scheduler = local_scheduler();
    scheduler
        .register_executor("test", Arc::new(RecordingExecutor::new()))
        .await;
    scheduler.add_job(JobBuilder::new().with_id("ok").build()).await.unwrap();
    scheduler.schedule_ready_jobs().await.unwrap();
    assert!(wait_for_status(&scheduler, "ok", JobStatus::Completed).await);

    let health = scheduler.health();
    assert_eq!(health["status"], json!("healthy"));
    assert_eq!(health["successful_jobs"], json!(1));
    assert_eq!(health["failed_jobs"], json!(0));
    scheduler.pool().shutdown(WAIT).await.unwrap();
}

#[tokio::test]
async fn test_remove_job_forgets_everything() {
    let scheduler = local_scheduler();
    scheduler.add_job(JobBuilder::new().with_id("a").build()).await.unwrap();
    scheduler.add_job(JobBuilder::new().with_id("b").build()).await.unwrap();
    scheduler
        .set_job_dependencies("b", vec!["a".to_string()])
        .await
        .unwrap();

    let removed = scheduler.remove_job("b").await.unwrap();
    assert_eq!(removed.id, "b");
    assert!(scheduler.job_dependencies("b").await.is_empty());
    assert!(matches!(
        scheduler.remove_job("b").await,
        Err(SchedulerError::JobNotFound { .. })
    ));
    assert_eq!(scheduler.list_jobs().await.len(), 1);
    scheduler.pool().shutdown(WAIT).await.unwrap();
}
