//! Durable job records.
//!
//! A [`JobStore`] persists [`Job`]s keyed by request id. Every mutation goes
//! through [`StateMachine::apply`](crate::state_machine::StateMachine::apply)
//! inside a single-record atomic update, so lifecycle rules hold no matter
//! which backend is in use.

pub mod memory;
pub mod persistent;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::state_machine::{Job, JobPatch, TransitionError};

pub use memory::MemoryJobStore;
pub use persistent::SledJobStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} already exists")]
    AlreadyExists(String),

    #[error("job {0} not found")]
    NotFound(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("stored record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job. Fails with [`StoreError::AlreadyExists`] if the
    /// request id is taken.
    async fn create(&self, job: Job) -> Result<(), StoreError>;

    async fn get(&self, request_id: &str) -> Result<Option<Job>, StoreError>;

    /// Apply `patch` atomically and return the updated record.
    async fn update(&self, request_id: &str, patch: JobPatch) -> Result<Job, StoreError>;

    /// Every stored job, newest first.
    async fn list(&self) -> Result<Vec<Job>, StoreError>;

    async fn list_for(&self, submitter_id: &str) -> Result<Vec<Job>, StoreError> {
        let mut jobs = self.list().await?;
        jobs.retain(|j| j.submitter_id == submitter_id);
        Ok(jobs)
    }

    async fn count_active(&self, submitter_id: &str) -> Result<usize, StoreError> {
        Ok(self
            .list_for(submitter_id)
            .await?
            .iter()
            .filter(|j| j.status.is_active())
            .count())
    }

    /// Non-terminal jobs created before `cutoff`.
    async fn list_stale(&self, cutoff: DateTime<Utc>) -> Result<Vec<Job>, StoreError> {
        let mut jobs = self.list().await?;
        jobs.retain(|j| j.status.is_active() && j.created_at < cutoff);
        Ok(jobs)
    }
}

fn newest_first(jobs: &mut [Job]) {
    jobs.sort_by_key(|j| std::cmp::Reverse(j.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ResumeDocument;
    use crate::state_machine::{JobStatus, Mode};

    fn job(request_id: &str, submitter: &str) -> Job {
        Job::new(
            request_id.into(),
            submitter.into(),
            Mode::LightEdit,
            ResumeDocument::default(),
            "target".into(),
        )
    }

    #[tokio::test]
    async fn count_active_ignores_terminal_and_other_submitters() {
        let store = MemoryJobStore::new();
        store.create(job("a", "ana")).await.unwrap();
        store.create(job("b", "ana")).await.unwrap();
        store.create(job("c", "bia")).await.unwrap();
        store
            .update("b", JobPatch::Fail { detail: "x".into() })
            .await
            .unwrap();

        assert_eq!(store.count_active("ana").await.unwrap(), 1);
        assert_eq!(store.count_active("bia").await.unwrap(), 1);
        assert_eq!(store.count_active("nobody").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_stale_uses_creation_time() {
        let store = MemoryJobStore::new();
        let mut old = job("old", "ana");
        old.created_at = Utc::now() - chrono::Duration::minutes(30);
        store.create(old).await.unwrap();
        store.create(job("fresh", "ana")).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::minutes(10);
        let stale = store.list_stale(cutoff).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].request_id, "old");
        assert_eq!(stale[0].status, JobStatus::Pending);
    }
}
