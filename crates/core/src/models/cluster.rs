use serde::{Deserialize, Serialize};

/// 执行集群信息
///
/// A remote execution target jobs may be submitted to. Selection only
/// considers clusters flagged `healthy`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub healthy: bool,
    pub active_jobs: usize,
}

impl Cluster {
    pub fn new(id: impl Into<String>, name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            endpoint: endpoint.into(),
            healthy: true,
            active_jobs: 0,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy
    }
}
