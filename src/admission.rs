//! Job admission: per-submitter concurrency cap and background hand-off.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::document::ResumeDocument;
use crate::error::{Result, TailorError};
use crate::pipeline::PipelineOrchestrator;
use crate::state_machine::{Job, JobStatus, Mode};
use crate::store::{JobStore, StoreError};

/// A tailoring request as received from a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub submitter_id: String,
    pub request_id: String,
    pub mode: Mode,
    pub source_document: ResumeDocument,
    pub target_spec_text: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitReceipt {
    pub request_id: String,
    pub job_id: String,
    pub status: JobStatus,
}

pub struct AdmissionController {
    store: Arc<dyn JobStore>,
    orchestrator: Arc<PipelineOrchestrator>,
    cap: usize,
    /// Serializes count-then-create so two racing submissions can't both
    /// pass the cap check.
    gate: Mutex<()>,
    in_flight: Mutex<JoinSet<()>>,
}

impl AdmissionController {
    pub fn new(
        store: Arc<dyn JobStore>,
        orchestrator: Arc<PipelineOrchestrator>,
        cap: usize,
    ) -> Self {
        Self {
            store,
            orchestrator,
            cap,
            gate: Mutex::new(()),
            in_flight: Mutex::new(JoinSet::new()),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Create the job and start its pipeline in the background. Returns as
    /// soon as the job is stored as `Pending`.
    #[instrument(skip_all, fields(request_id = %submission.request_id, submitter = %submission.submitter_id))]
    pub async fn submit(&self, submission: Submission) -> Result<SubmitReceipt> {
        let job = {
            let _admit = self.gate.lock().await;

            if self.store.get(&submission.request_id).await?.is_some() {
                return Err(TailorError::DuplicateRequest(submission.request_id));
            }

            let active = self.store.count_active(&submission.submitter_id).await?;
            if active >= self.cap {
                warn!(active, cap = self.cap, "admission denied");
                return Err(TailorError::AdmissionDenied {
                    submitter: submission.submitter_id,
                    active,
                    cap: self.cap,
                });
            }

            let job = Job::new(
                submission.request_id,
                submission.submitter_id,
                submission.mode,
                submission.source_document,
                submission.target_spec_text,
            )
            .with_posting(submission.job_title, submission.company_name);

            match self.store.create(job.clone()).await {
                Ok(()) => job,
                Err(StoreError::AlreadyExists(id)) => return Err(TailorError::DuplicateRequest(id)),
                Err(e) => return Err(e.into()),
            }
        };

        let receipt = SubmitReceipt {
            request_id: job.request_id.clone(),
            job_id: job.job_id.clone(),
            status: job.status,
        };

        let orchestrator = self.orchestrator.clone();
        let mut in_flight = self.in_flight.lock().await;
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(async move {
            orchestrator.run(&job).await;
        });

        info!(job_id = %receipt.job_id, "job admitted");
        Ok(receipt)
    }

    /// Wait for every pipeline started by this controller.
    pub async fn wait_idle(&self) {
        loop {
            // Joined outside the lock so concurrent submissions can spawn.
            let mut running = std::mem::take(&mut *self.in_flight.lock().await);
            if running.is_empty() {
                return;
            }
            while let Some(joined) = running.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "pipeline task ended abnormally");
                }
            }
        }
    }
}
