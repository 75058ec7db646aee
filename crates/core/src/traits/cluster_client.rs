//! 远程集群提交接口
//!
//! The scheduler only needs one thing from a remote cluster: accepting a job.
//! Transport, authentication and result collection live behind this trait.

use async_trait::async_trait;

use crate::models::{Cluster, Job};
use crate::SchedulerResult;

#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Hands `job` to `cluster`. An error leaves the job unregistered.
    async fn submit_job(&self, cluster: &Cluster, job: &Job) -> SchedulerResult<()>;
}
