//! Progress tracking for running jobs.
//!
//! [`ProgressTracker`] owns both halves of a job's observable progress: an
//! in-process map with the freshest percent and message, and write-through
//! to the durable [`JobStore`]. The in-process entry is always written
//! first; durable progress writes are best-effort and only logged on failure.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use crate::document::ResumeDocument;
use crate::error::{Result, TailorError};
use crate::state_machine::{Job, JobPatch, JobStatus};
use crate::store::{JobStore, StoreError};

/// Highest percent reachable through [`ProgressTracker::report`]; 100 is
/// only written together with the result.
pub const MAX_REPORTED_PERCENT: u8 = 99;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub percent: u8,
    pub message: String,
}

/// Answer to a status poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatusView {
    pub request_id: String,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

pub struct ProgressTracker {
    entries: RwLock<HashMap<String, ProgressEntry>>,
    store: Arc<dyn JobStore>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Record progress for a running job.
    ///
    /// The percent is capped at [`MAX_REPORTED_PERCENT`] and never goes
    /// below what was already reported.
    pub async fn report(&self, request_id: &str, percent: u8, message: &str) {
        let percent = {
            let mut entries = self.entries.write();
            let entry = entries
                .entry(request_id.to_string())
                .or_insert_with(|| ProgressEntry {
                    percent: 0,
                    message: String::new(),
                });
            entry.percent = entry.percent.max(percent.min(MAX_REPORTED_PERCENT));
            entry.message = message.to_string();
            entry.percent
        };
        debug!(request_id, percent, message, "progress");

        if let Err(e) = self
            .store
            .update(request_id, JobPatch::Progress { percent })
            .await
        {
            warn!(request_id, percent, error = %e, "progress write-through failed");
        }
    }

    /// Finalize a job with its result: 100%, `Completed` and the document
    /// land in the store in one update.
    pub async fn complete(&self, request_id: &str, result: ResumeDocument) -> Result<Job> {
        self.finish(request_id, JobPatch::complete(result)).await
    }

    pub async fn fail(&self, request_id: &str, detail: &str) -> Result<Job> {
        self.finish(
            request_id,
            JobPatch::Fail {
                detail: detail.to_string(),
            },
        )
        .await
    }

    /// Merge the durable status with the fresher in-process progress.
    pub async fn status(&self, request_id: &str) -> Result<JobStatusView> {
        let job = self
            .store
            .get(request_id)
            .await?
            .ok_or_else(|| TailorError::JobNotFound(request_id.to_string()))?;
        Ok(self.view(&job))
    }

    /// Status view for an already loaded record.
    pub fn view(&self, job: &Job) -> JobStatusView {
        let cached = self
            .entry(&job.request_id)
            .filter(|_| !job.status.is_terminal());
        let (progress_percent, message) = match cached {
            Some(entry) => (entry.percent.max(job.progress_percent), entry.message),
            None => (job.progress_percent, default_message(job.status).to_string()),
        };
        JobStatusView {
            request_id: job.request_id.clone(),
            status: job.status,
            progress_percent,
            message,
            error_detail: job.error_detail.clone(),
        }
    }

    pub fn entry(&self, request_id: &str) -> Option<ProgressEntry> {
        self.entries.read().get(request_id).cloned()
    }

    /// Terminal writes are not best-effort: the caller must know whether
    /// the job actually reached its final state. The cache entry is dropped
    /// once the store holds a terminal record.
    async fn finish(&self, request_id: &str, patch: JobPatch) -> Result<Job> {
        match self.store.update(request_id, patch).await {
            Ok(job) => {
                self.entries.write().remove(request_id);
                Ok(job)
            }
            Err(e @ StoreError::InvalidTransition(_)) => {
                self.entries.write().remove(request_id);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn default_message(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "Queued",
        JobStatus::Processing => "Processing",
        JobStatus::Completed => "Completed",
        JobStatus::Failed => "Failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::Mode;
    use crate::store::MemoryJobStore;
    use async_trait::async_trait;

    fn job(request_id: &str) -> Job {
        Job::new(
            request_id.into(),
            "ana".into(),
            Mode::LightEdit,
            ResumeDocument::default(),
            "target".into(),
        )
    }

    async fn tracker_with(request_id: &str) -> ProgressTracker {
        let store = Arc::new(MemoryJobStore::new());
        store.create(job(request_id)).await.unwrap();
        ProgressTracker::new(store)
    }

    /// Reads from an inner store, but every update fails.
    struct ReadOnlyStore(MemoryJobStore);

    #[async_trait]
    impl JobStore for ReadOnlyStore {
        async fn create(&self, job: Job) -> std::result::Result<(), StoreError> {
            self.0.create(job).await
        }
        async fn get(&self, request_id: &str) -> std::result::Result<Option<Job>, StoreError> {
            self.0.get(request_id).await
        }
        async fn update(
            &self,
            request_id: &str,
            _patch: JobPatch,
        ) -> std::result::Result<Job, StoreError> {
            Err(StoreError::NotFound(request_id.to_string()))
        }
        async fn list(&self) -> std::result::Result<Vec<Job>, StoreError> {
            self.0.list().await
        }
    }

    #[tokio::test]
    async fn report_writes_cache_and_store() {
        let tracker = tracker_with("r1").await;
        tracker.report("r1", 25, "Generating").await;

        let status = tracker.status("r1").await.unwrap();
        assert_eq!(status.status, JobStatus::Processing);
        assert_eq!(status.progress_percent, 25);
        assert_eq!(status.message, "Generating");

        let stored = tracker.store().get("r1").await.unwrap().unwrap();
        assert_eq!(stored.progress_percent, 25);
    }

    #[tokio::test]
    async fn report_is_monotonic_and_capped() {
        let tracker = tracker_with("r1").await;
        tracker.report("r1", 60, "a").await;
        tracker.report("r1", 30, "b").await;
        assert_eq!(tracker.entry("r1").unwrap().percent, 60);
        assert_eq!(tracker.entry("r1").unwrap().message, "b");

        tracker.report("r1", 100, "c").await;
        assert_eq!(tracker.entry("r1").unwrap().percent, MAX_REPORTED_PERCENT);
        let stored = tracker.store().get("r1").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn complete_sets_result_and_clears_entry() {
        let tracker = tracker_with("r1").await;
        tracker.report("r1", 90, "Assembling").await;

        let mut doc = ResumeDocument::default();
        doc.summary = "done".into();
        let job = tracker.complete("r1", doc).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress_percent, 100);
        assert!(tracker.entry("r1").is_none());

        let status = tracker.status("r1").await.unwrap();
        assert_eq!(status.progress_percent, 100);
        assert_eq!(status.message, "Completed");
    }

    #[tokio::test]
    async fn fail_keeps_last_percent() {
        let tracker = tracker_with("r1").await;
        tracker.report("r1", 10, "Preprocessing").await;
        tracker.fail("r1", "preprocessing failed: empty").await.unwrap();

        let status = tracker.status("r1").await.unwrap();
        assert_eq!(status.status, JobStatus::Failed);
        assert_eq!(status.progress_percent, 10);
        assert_eq!(
            status.error_detail.as_deref(),
            Some("preprocessing failed: empty")
        );
    }

    #[tokio::test]
    async fn store_failure_does_not_abort_reporting() {
        let inner = MemoryJobStore::new();
        inner.create(job("r1")).await.unwrap();
        let tracker = ProgressTracker::new(Arc::new(ReadOnlyStore(inner)));

        tracker.report("r1", 40, "Generating").await;

        let status = tracker.status("r1").await.unwrap();
        // Durable status lags, the cache supplies fresh progress.
        assert_eq!(status.status, JobStatus::Pending);
        assert_eq!(status.progress_percent, 40);
        assert_eq!(status.message, "Generating");
    }

    #[tokio::test]
    async fn terminal_failure_is_reported_to_caller() {
        let inner = MemoryJobStore::new();
        inner.create(job("r1")).await.unwrap();
        let tracker = ProgressTracker::new(Arc::new(ReadOnlyStore(inner)));

        assert!(tracker.complete("r1", ResumeDocument::default()).await.is_err());
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let tracker = ProgressTracker::new(Arc::new(MemoryJobStore::new()));
        assert!(matches!(
            tracker.status("nope").await.unwrap_err(),
            TailorError::JobNotFound(_)
        ));
    }
}
