use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tracing::{debug, warn};

use jobflow_core::models::JobId;
use jobflow_core::{SchedulerError, SchedulerResult};

/// 作业依赖图
///
/// Maps each job to the set of jobs that must complete before it may run.
/// The graph is kept acyclic: edges that would close a cycle are rejected
/// when they are set.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: HashMap<JobId, BTreeSet<JobId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the prerequisites of `job_id`. An empty set clears them.
    ///
    /// On `CircularDependency` the previous edges are left untouched.
    pub fn set_job_dependencies<I>(&mut self, job_id: &str, dependencies: I) -> SchedulerResult<()>
    where
        I: IntoIterator<Item = JobId>,
    {
        let dependencies: BTreeSet<JobId> = dependencies.into_iter().collect();

        if dependencies.is_empty() {
            self.edges.remove(job_id);
            debug!("清除作业 {} 的依赖", job_id);
            return Ok(());
        }

        if dependencies.contains(job_id) {
            warn!("作业 {} 依赖自身，拒绝设置", job_id);
            return Err(SchedulerError::CircularDependency {
                job_id: job_id.to_string(),
            });
        }

        let mut candidate = self.edges.clone();
        candidate.insert(job_id.to_string(), dependencies);
        if has_cycle(&candidate) {
            warn!("作业 {} 的依赖会形成循环，拒绝设置", job_id);
            return Err(SchedulerError::CircularDependency {
                job_id: job_id.to_string(),
            });
        }

        self.edges = candidate;
        debug!("作业 {} 的依赖已更新", job_id);
        Ok(())
    }

    pub fn dependencies(&self, job_id: &str) -> Vec<JobId> {
        self.edges
            .get(job_id)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// True when every prerequisite of `job_id` is in `completed`.
    pub fn can_execute_job(&self, job_id: &str, completed: &HashSet<JobId>) -> bool {
        match self.edges.get(job_id) {
            Some(deps) => deps.iter().all(|dep| completed.contains(dep)),
            None => true,
        }
    }

    /// Prerequisites of `job_id` that have not completed yet, in id order.
    pub fn blocking_dependencies(&self, job_id: &str, completed: &HashSet<JobId>) -> Vec<JobId> {
        self.edges
            .get(job_id)
            .map(|deps| {
                deps.iter()
                    .filter(|dep| !completed.contains(*dep))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every job `job_id` depends on, directly or not, in breadth-first order.
    pub fn transitive_dependencies(&self, job_id: &str) -> Vec<JobId> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut result = Vec::new();

        if let Some(deps) = self.edges.get(job_id) {
            for dep in deps {
                visited.insert(dep.clone());
                queue.push_back(dep.clone());
            }
        }

        while let Some(current) = queue.pop_front() {
            if let Some(deps) = self.edges.get(&current) {
                for dep in deps {
                    if visited.insert(dep.clone()) {
                        queue.push_back(dep.clone());
                    }
                }
            }
            result.push(current);
        }

        result
    }

    /// Drops the prerequisites of `job_id`. Jobs that depend on it keep their
    /// edge and stay blocked until it is marked completed.
    pub fn remove_job(&mut self, job_id: &str) {
        self.edges.remove(job_id);
    }

    /// Number of jobs with at least one prerequisite.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Kahn's algorithm: the graph has a cycle iff some node is never freed.
fn has_cycle(graph: &HashMap<JobId, BTreeSet<JobId>>) -> bool {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for (node, deps) in graph {
        in_degree.entry(node.as_str()).or_insert(0);
        for dep in deps {
            *in_degree.entry(dep.as_str()).or_insert(0) += 1;
        }
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| *node)
        .collect();

    let mut processed = 0;
    while let Some(node) = queue.pop_front() {
        processed += 1;
        if let Some(deps) = graph.get(node) {
            for dep in deps {
                if let Some(degree) = in_degree.get_mut(dep.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dep.as_str());
                    }
                }
            }
        }
    }

    processed < in_degree.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<JobId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_detects_long_cycle() {
        let mut graph = DependencyGraph::new();
        graph.set_job_dependencies("a", ids(&["b"])).unwrap();
        graph.set_job_dependencies("b", ids(&["c"])).unwrap();
        let result = graph.set_job_dependencies("c", ids(&["a"]));
        assert_eq!(
            result,
            Err(SchedulerError::CircularDependency {
                job_id: "c".to_string()
            })
        );
        assert!(graph.dependencies("c").is_empty());
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph.set_job_dependencies("d", ids(&["b", "c"])).unwrap();
        graph.set_job_dependencies("b", ids(&["a"])).unwrap();
        graph.set_job_dependencies("c", ids(&["a"])).unwrap();
        assert_eq!(graph.transitive_dependencies("d"), ids(&["b", "c", "a"]));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let mut graph = DependencyGraph::new();
        assert!(graph.set_job_dependencies("a", ids(&["a"])).is_err());
        assert!(graph.is_empty());
    }
}
