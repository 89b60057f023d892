//! Caller-facing surface of the engine: submit, poll, fetch, list.
//!
//! [`JobService`] wires the store, progress tracker, pipeline and admission
//! controller together. Reads are scoped to the submitter that created the
//! job; someone else's job looks exactly like a missing one.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::admission::{AdmissionController, SubmitReceipt, Submission};
use crate::anthropic::AnthropicClient;
use crate::config::TailorConfig;
use crate::document::ResumeDocument;
use crate::error::{Result, TailorError};
use crate::generator::{ContentGenerator, GenerationError};
use crate::pipeline::{PipelineOrchestrator, PipelineTimeouts};
use crate::preprocess::{LlmPreprocessor, Preprocessor};
use crate::progress::{JobStatusView, ProgressTracker};
use crate::state_machine::{Job, JobStatus, JobSummary};
use crate::store::{JobStore, SledJobStore, StoreError};

pub const STALE_JOB_DETAIL: &str = "job timed out - exceeded maximum processing time";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceSettings {
    pub max_concurrent_jobs: usize,
    pub timeouts: PipelineTimeouts,
    pub stale_after: chrono::Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            timeouts: PipelineTimeouts::default(),
            stale_after: chrono::Duration::minutes(10),
        }
    }
}

impl From<&TailorConfig> for ServiceSettings {
    fn from(config: &TailorConfig) -> Self {
        Self {
            max_concurrent_jobs: config.max_concurrent_jobs,
            timeouts: config.timeouts(),
            stale_after: config.stale_after(),
        }
    }
}

/// Per-submitter usage numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitterStats {
    pub submitter_id: String,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub cap: usize,
    pub remaining: usize,
}

pub struct JobService {
    store: Arc<dyn JobStore>,
    tracker: Arc<ProgressTracker>,
    admission: AdmissionController,
    settings: ServiceSettings,
}

impl JobService {
    pub fn new(
        store: Arc<dyn JobStore>,
        generator: Arc<dyn ContentGenerator>,
        preprocessor: Arc<dyn Preprocessor>,
        settings: ServiceSettings,
    ) -> Self {
        let tracker = Arc::new(ProgressTracker::new(store.clone()));
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            preprocessor,
            generator,
            tracker.clone(),
            settings.timeouts,
        ));
        let admission =
            AdmissionController::new(store.clone(), orchestrator, settings.max_concurrent_jobs);
        Self {
            store,
            tracker,
            admission,
            settings,
        }
    }

    /// Build the production service: sled store at `store_path`, Anthropic
    /// client for generation and preprocessing.
    pub fn from_config(config: &TailorConfig) -> Result<Self> {
        let store = Arc::new(SledJobStore::open(&config.store_path)?);
        let client = AnthropicClient::new(
            config.api_key.clone(),
            config.model.clone(),
            config.max_tokens,
        )
        .map_err(GenerationError::from)?;
        debug!(model = client.model(), store = %config.store_path.display(), "service configured");
        let generator: Arc<dyn ContentGenerator> = Arc::new(client);
        let settings = ServiceSettings::from(config);
        let preprocessor = Arc::new(LlmPreprocessor::new(
            generator.clone(),
            settings.timeouts.preprocess,
        ));
        Ok(Self::new(store, generator, preprocessor, settings))
    }

    /// [`from_config`](Self::from_config), then fail the jobs a previous
    /// process left running.
    pub async fn start(config: &TailorConfig) -> Result<Self> {
        let service = Self::from_config(config)?;
        let reaped = service.reap_stale().await?;
        if reaped > 0 {
            info!(reaped, "failed jobs left over from a previous run");
        }
        Ok(service)
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub async fn submit(&self, submission: Submission) -> Result<SubmitReceipt> {
        self.admission.submit(submission).await
    }

    pub async fn status(&self, request_id: &str, submitter_id: &str) -> Result<JobStatusView> {
        let job = self.owned_job(request_id, submitter_id).await?;
        Ok(self.tracker.view(&job))
    }

    /// The tailored document of a completed job.
    pub async fn result(&self, request_id: &str, submitter_id: &str) -> Result<ResumeDocument> {
        let job = self.owned_job(request_id, submitter_id).await?;
        match (job.status, job.result_document) {
            (JobStatus::Completed, Some(document)) => Ok(document),
            (status, _) => Err(TailorError::NotCompleted { status }),
        }
    }

    /// The submitter's jobs, newest first.
    pub async fn jobs(
        &self,
        submitter_id: &str,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<JobSummary>> {
        Ok(self
            .store
            .list_for(submitter_id)
            .await?
            .iter()
            .filter(|job| status.is_none_or(|s| job.status == s))
            .take(limit)
            .map(JobSummary::from_job)
            .collect())
    }

    pub async fn stats(&self, submitter_id: &str) -> Result<SubmitterStats> {
        let jobs = self.store.list_for(submitter_id).await?;
        let count = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count();
        let active = jobs.iter().filter(|j| j.status.is_active()).count();
        let cap = self.admission.cap();
        Ok(SubmitterStats {
            submitter_id: submitter_id.to_string(),
            active,
            completed: count(JobStatus::Completed),
            failed: count(JobStatus::Failed),
            cap,
            remaining: cap.saturating_sub(active),
        })
    }

    /// Fail every non-terminal job older than the stale threshold. Returns
    /// how many jobs were failed.
    #[instrument(skip(self))]
    pub async fn reap_stale(&self) -> Result<usize> {
        let cutoff = Utc::now() - self.settings.stale_after;
        let mut reaped = 0;
        for job in self.store.list_stale(cutoff).await? {
            match self.tracker.fail(&job.request_id, STALE_JOB_DETAIL).await {
                Ok(_) => {
                    warn!(request_id = %job.request_id, created_at = %job.created_at, "stale job failed");
                    reaped += 1;
                }
                Err(TailorError::Store(StoreError::InvalidTransition(e))) => {
                    debug!(request_id = %job.request_id, error = %e, "job finished before it was reaped");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(reaped)
    }

    /// Wait until every admitted job has reached a terminal state.
    pub async fn wait_idle(&self) {
        self.admission.wait_idle().await;
    }

    async fn owned_job(&self, request_id: &str, submitter_id: &str) -> Result<Job> {
        self.store
            .get(request_id)
            .await?
            .filter(|job| job.submitter_id == submitter_id)
            .ok_or_else(|| TailorError::JobNotFound(request_id.to_string()))
    }
}
