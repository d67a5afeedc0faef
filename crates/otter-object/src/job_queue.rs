//! FIFO job queue driving promise reactions and generator continuations

use parking_lot::Mutex;
use std::collections::VecDeque;

use crate::error::VmResult;
use crate::realm::Realm;

/// A queued continuation
pub type Job = Box<dyn FnOnce(&Realm) -> VmResult<()> + Send>;

/// Pending jobs of one realm
///
/// A job that fails is logged and recorded; the queue keeps draining.
#[derive(Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
    failures: Mutex<Vec<String>>,
}

impl JobQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job
    pub fn enqueue(&self, job: Job) {
        self.jobs.lock().push_back(job);
    }

    /// Number of pending jobs
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Check if no jobs are pending
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Run jobs until the queue is empty, including jobs enqueued while
    /// running. Returns the number of jobs run.
    pub fn drain(&self, realm: &Realm) -> usize {
        let mut ran = 0;
        loop {
            // The lock is released before the job runs so it can enqueue more.
            let Some(job) = self.jobs.lock().pop_front() else {
                break;
            };
            ran += 1;
            if let Err(err) = job(realm) {
                tracing::warn!(target: "otter::jobs", error = %err, "job failed");
                self.failures.lock().push(err.to_string());
            }
        }
        tracing::trace!(target: "otter::jobs", ran, "job queue drained");
        ran
    }

    /// Messages of jobs that failed so far
    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }

    /// Remove and return the recorded failure messages
    pub fn take_failures(&self) -> Vec<String> {
        std::mem::take(&mut *self.failures.lock())
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("pending", &self.len())
            .field("failures", &self.failures.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VmError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_jobs_run_in_fifo_order() {
        let realm = Realm::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            realm.enqueue_job(Box::new(move |_: &Realm| {
                order.lock().push(i);
                Ok(())
            }));
        }
        assert_eq!(realm.run_jobs(), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_jobs_enqueued_while_draining_run() {
        let realm = Realm::new();
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        realm.enqueue_job(Box::new(move |realm: &Realm| {
            let inner = inner.clone();
            realm.enqueue_job(Box::new(move |_: &Realm| {
                inner.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
            Ok(())
        }));
        assert_eq!(realm.run_jobs(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_job_is_recorded() {
        let realm = Realm::new();
        realm.enqueue_job(Box::new(|_: &Realm| Err(VmError::type_error("boom"))));
        realm.enqueue_job(Box::new(|_: &Realm| Ok(())));
        assert_eq!(realm.run_jobs(), 2);
        assert_eq!(realm.job_failures(), vec!["TypeError: boom".to_string()]);
    }

    #[test]
    fn test_take_failures_drains() {
        let realm = Realm::new();
        realm.enqueue_job(Box::new(|_: &Realm| Err(VmError::range_error("first"))));
        realm.run_jobs();
        assert_eq!(realm.take_job_failures(), vec!["RangeError: first".to_string()]);
        assert!(realm.job_failures().is_empty());

        realm.enqueue_job(Box::new(|_: &Realm| Err(VmError::type_error("second"))));
        realm.run_jobs();
        assert_eq!(realm.take_job_failures(), vec!["TypeError: second".to_string()]);
    }
}
