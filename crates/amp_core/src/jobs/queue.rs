//! In-memory FIFO job queue.

use super::types::{JobId, QueuedJob};

/// Ordered list of pending jobs. The front job is the one running or next
/// to run.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Vec<QueuedJob>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job to the back of the queue.
    pub fn push(&mut self, job: QueuedJob) {
        self.jobs.push(job);
    }

    /// The next job to run (cloned so no lock is held while it runs).
    pub fn front(&self) -> Option<QueuedJob> {
        self.jobs.first().cloned()
    }

    /// Pop the front job only if it is still `id`.
    pub fn pop_front_if(&mut self, id: &JobId) -> Option<QueuedJob> {
        if self.jobs.first().is_some_and(|j| &j.id == id) {
            Some(self.jobs.remove(0))
        } else {
            None
        }
    }

    /// Remove a job by id.
    pub fn remove(&mut self, id: &JobId) -> Option<QueuedJob> {
        let index = self.jobs.iter().position(|j| &j.id == id)?;
        Some(self.jobs.remove(index))
    }

    /// Remove every job, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.jobs.len();
        self.jobs.clear();
        count
    }

    pub fn get(&self, id: &JobId) -> Option<&QueuedJob> {
        self.jobs.iter().find(|j| &j.id == id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Ids in queue order.
    pub fn ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|j| j.id.clone()).collect()
    }

    pub fn jobs(&self) -> &[QueuedJob] {
        &self.jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobParams, SourceLocator};

    fn job(name: &str) -> QueuedJob {
        QueuedJob::new(JobParams::new(
            SourceLocator::parse(&format!("/media/{}.mp4", name)),
            "/out",
        ))
    }

    #[test]
    fn fifo_order() {
        let mut queue = JobQueue::new();
        let (a, b, c) = (job("a"), job("b"), job("c"));
        let ids = vec![a.id.clone(), b.id.clone(), c.id.clone()];
        queue.push(a);
        queue.push(b);
        queue.push(c);

        assert_eq!(queue.ids(), ids);
        assert_eq!(queue.front().map(|j| j.id), Some(ids[0].clone()));
    }

    #[test]
    fn pop_front_only_matches_front() {
        let mut queue = JobQueue::new();
        let (a, b) = (job("a"), job("b"));
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        queue.push(a);
        queue.push(b);

        assert!(queue.pop_front_if(&b_id).is_none());
        assert_eq!(queue.len(), 2);
        assert!(queue.pop_front_if(&a_id).is_some());
        assert_eq!(queue.ids(), vec![b_id]);
    }

    #[test]
    fn remove_and_clear() {
        let mut queue = JobQueue::new();
        let (a, b, c) = (job("a"), job("b"), job("c"));
        let b_id = b.id.clone();
        queue.push(a);
        queue.push(b);
        queue.push(c);

        assert!(queue.remove(&b_id).is_some());
        assert!(queue.remove(&b_id).is_none());
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert!(queue.front().is_none());
    }
}
