use std::cmp::Ordering;
use std::collections::HashMap;

use jobflow_core::models::{Job, JobId, DEFAULT_PRIORITY, HIGHEST_PRIORITY, LOWEST_PRIORITY};
use jobflow_core::{SchedulerError, SchedulerResult};

/// 作业优先级表
///
/// Explicit priorities set through [`PriorityIndex::set_job_priority`] win
/// over the priority carried on the job itself. Lower values run first.
#[derive(Debug, Clone, Default)]
pub struct PriorityIndex {
    priorities: HashMap<JobId, u8>,
}

impl PriorityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_job_priority(&mut self, job_id: &str, priority: u8) -> SchedulerResult<()> {
        validate_priority(priority)?;
        self.priorities.insert(job_id.to_string(), priority);
        Ok(())
    }

    /// Explicit priority of `job_id`, or the default when none was set.
    pub fn get_priority(&self, job_id: &str) -> u8 {
        self.priorities
            .get(job_id)
            .copied()
            .unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn explicit_priority(&self, job_id: &str) -> Option<u8> {
        self.priorities.get(job_id).copied()
    }

    /// Priority used for ordering `job`.
    pub fn effective_priority(&self, job: &Job) -> u8 {
        self.explicit_priority(&job.id).unwrap_or(job.priority)
    }

    /// Priority ascending, then `created_at` ascending, then id.
    pub fn compare(&self, a: &Job, b: &Job) -> Ordering {
        self.effective_priority(a)
            .cmp(&self.effective_priority(b))
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }

    pub fn sort_jobs(&self, jobs: &mut [Job]) {
        jobs.sort_by(|a, b| self.compare(a, b));
    }

    pub fn remove_job(&mut self, job_id: &str) {
        self.priorities.remove(job_id);
    }
}

pub fn validate_priority(priority: u8) -> SchedulerResult<()> {
    if (HIGHEST_PRIORITY..=LOWEST_PRIORITY).contains(&priority) {
        Ok(())
    } else {
        Err(SchedulerError::validation(format!(
            "priority must be between {HIGHEST_PRIORITY} and {LOWEST_PRIORITY}, got {priority}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn job(id: &str, priority: u8, age_ms: i64) -> Job {
        let mut job = Job::new(id, "test", json!({}));
        job.priority = priority;
        job.created_at = Utc::now() - Duration::milliseconds(age_ms);
        job
    }

    #[test]
    fn test_default_priority() {
        let index = PriorityIndex::new();
        assert_eq!(index.get_priority("unknown"), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut index = PriorityIndex::new();
        assert!(index.set_job_priority("a", 0).is_err());
        assert!(index.set_job_priority("a", 11).is_err());
        assert!(index.set_job_priority("a", 10).is_ok());
    }

    #[test]
    fn test_ordering_priority_then_age_then_id() {
        let mut index = PriorityIndex::new();
        let created = Utc::now();
        let mut jobs = vec![
            job("young-high", 2, 0),
            job("low", 9, 1_000),
            job("old-high", 2, 500),
            job("override", 7, 0),
        ];
        index.set_job_priority("override", 1).unwrap();
        let mut tie_b = job("tie-b", 5, 0);
        let mut tie_a = job("tie-a", 5, 0);
        tie_a.created_at = created;
        tie_b.created_at = created;
        jobs.push(tie_b);
        jobs.push(tie_a);

        index.sort_jobs(&mut jobs);
        let order: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(
            order,
            vec!["override", "old-high", "young-high", "tie-a", "tie-b", "low"]
        );
    }
}
