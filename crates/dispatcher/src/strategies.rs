use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use jobflow_core::models::Cluster;
use jobflow_core::ClusterSelection;

/// Picks the cluster a remote job is sent to.
///
/// Implementations only see healthy clusters and must be deterministic for a
/// given call sequence.
pub trait ClusterSelectionStrategy: Send + Sync {
    /// Index into `healthy`, or `None` when it is empty.
    fn select(&self, healthy: &[&Cluster]) -> Option<usize>;

    fn name(&self) -> &str;
}

pub struct RoundRobinStrategy {
    counter: AtomicUsize,
}

impl RoundRobinStrategy {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobinStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterSelectionStrategy for RoundRobinStrategy {
    fn select(&self, healthy: &[&Cluster]) -> Option<usize> {
        if healthy.is_empty() {
            debug!("没有健康的集群");
            return None;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % healthy.len();
        debug!(
            "轮询策略选择集群: {} (索引: {}/{})",
            healthy[index].id,
            index,
            healthy.len()
        );
        Some(index)
    }

    fn name(&self) -> &str {
        "RoundRobin"
    }
}

/// Fewest active jobs wins; ties go to the earliest registered cluster.
pub struct LeastLoadedStrategy;

impl LeastLoadedStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LeastLoadedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterSelectionStrategy for LeastLoadedStrategy {
    fn select(&self, healthy: &[&Cluster]) -> Option<usize> {
        let (index, cluster) = healthy
            .iter()
            .enumerate()
            .min_by_key(|(_, cluster)| cluster.active_jobs)?;
        debug!(
            "负载均衡策略选择集群: {} (活跃作业: {})",
            cluster.id, cluster.active_jobs
        );
        Some(index)
    }

    fn name(&self) -> &str {
        "LeastLoaded"
    }
}

pub fn strategy_for(selection: ClusterSelection) -> Arc<dyn ClusterSelectionStrategy> {
    match selection {
        ClusterSelection::RoundRobin => Arc::new(RoundRobinStrategy::new()),
        ClusterSelection::LeastLoaded => Arc::new(LeastLoadedStrategy::new()),
    }
}
