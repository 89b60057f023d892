use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::job::{Job, JobPatch};

/// Lifecycle status of a tailoring job.
///
/// Each job flows through: PENDING → PROCESSING → {COMPLETED | FAILED}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// `Completed` and `Failed` are terminal; nothing moves a job out of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Jobs that count against a submitter's concurrency cap.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Why a patch could not be applied to a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("job already reached terminal status {status}")]
    AlreadyTerminal { status: JobStatus },

    #[error("progress {0}% is reserved for completion")]
    ProgressOutOfRange(u8),
}

/// What applying a patch did to the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First progress update: PENDING → PROCESSING.
    Started,
    /// Further progress while PROCESSING.
    Advanced,
    Completed,
    Failed,
}

/// Applies [`JobPatch`]es to a [`Job`], enforcing the lifecycle rules.
pub struct StateMachine;

impl StateMachine {
    /// Apply `patch` to `job` in place.
    ///
    /// - Progress moves a non-terminal job to `Processing`; the stored
    ///   percentage never decreases and never reaches 100 this way.
    /// - Completion sets the result, 100% and `completed_at` together.
    /// - Failure sets the error detail and `completed_at`.
    /// - Terminal jobs reject every patch, so exactly one terminal
    ///   transition happens per job.
    pub fn apply(job: &mut Job, patch: JobPatch) -> Result<Transition, TransitionError> {
        if job.status.is_terminal() {
            return Err(TransitionError::AlreadyTerminal { status: job.status });
        }

        let transition = match patch {
            JobPatch::Progress { percent } => {
                if percent >= 100 {
                    return Err(TransitionError::ProgressOutOfRange(percent));
                }
                let started = job.status == JobStatus::Pending;
                job.status = JobStatus::Processing;
                job.progress_percent = job.progress_percent.max(percent);
                if started {
                    Transition::Started
                } else {
                    Transition::Advanced
                }
            }
            JobPatch::Complete { result } => {
                job.status = JobStatus::Completed;
                job.progress_percent = 100;
                job.result_document = Some(*result);
                job.completed_at = Some(chrono::Utc::now());
                Transition::Completed
            }
            JobPatch::Fail { detail } => {
                job.status = JobStatus::Failed;
                job.error_detail = Some(detail);
                job.completed_at = Some(chrono::Utc::now());
                Transition::Failed
            }
        };

        job.updated_at = chrono::Utc::now();
        Ok(transition)
    }
}
