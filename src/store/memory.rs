use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{JobStore, StoreError, newest_first};
use crate::state_machine::{Job, JobPatch, StateMachine};

/// Process-local store, used by tests and one-shot CLI runs.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock();
        if jobs.contains_key(&job.request_id) {
            return Err(StoreError::AlreadyExists(job.request_id));
        }
        jobs.insert(job.request_id.clone(), job);
        Ok(())
    }

    async fn get(&self, request_id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.lock().get(request_id).cloned())
    }

    async fn update(&self, request_id: &str, patch: JobPatch) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(request_id)
            .ok_or_else(|| StoreError::NotFound(request_id.to_string()))?;
        // Apply to a copy so a rejected patch leaves the record untouched.
        let mut next = job.clone();
        StateMachine::apply(&mut next, patch)?;
        *job = next.clone();
        Ok(next)
    }

    async fn list(&self) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self.jobs.lock().values().cloned().collect();
        newest_first(&mut jobs);
        Ok(jobs)
    }
}
