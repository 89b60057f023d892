use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::JobStatus;
use crate::document::ResumeDocument;

/// Submission-time flag selecting regeneration or preservation semantics.
///
/// The legacy names `complete_jd` / `resume_jd` are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Write new content saturated with the target's keywords.
    #[serde(alias = "complete_jd")]
    GenerateFresh,
    /// Keep the source content, only lightly editing the experience list.
    #[serde(alias = "resume_jd")]
    LightEdit,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::GenerateFresh => write!(f, "generate_fresh"),
            Mode::LightEdit => write!(f, "light_edit"),
        }
    }
}

/// A partial update applied atomically to a single stored job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobPatch {
    Progress { percent: u8 },
    Complete { result: Box<ResumeDocument> },
    Fail { detail: String },
}

impl JobPatch {
    pub fn complete(result: ResumeDocument) -> Self {
        JobPatch::Complete {
            result: Box::new(result),
        }
    }
}

/// Durable record of one tailoring request.
///
/// Inputs (`source_document`, `target_spec_text`, `mode`) are snapshots taken
/// at submission and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub request_id: String,
    pub submitter_id: String,
    pub mode: Mode,
    pub source_document: ResumeDocument,
    pub target_spec_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub result_document: Option<ResumeDocument>,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(
        request_id: String,
        submitter_id: String,
        mode: Mode,
        source_document: ResumeDocument,
        target_spec_text: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4().to_string(),
            request_id,
            submitter_id,
            mode,
            source_document,
            target_spec_text,
            job_title: None,
            company_name: None,
            status: JobStatus::Pending,
            progress_percent: 0,
            result_document: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Attach the posting's title and company, used as preprocessing context.
    pub fn with_posting(mut self, job_title: Option<String>, company_name: Option<String>) -> Self {
        self.job_title = job_title.filter(|t| !t.trim().is_empty());
        self.company_name = company_name.filter(|c| !c.trim().is_empty());
        self
    }
}

/// Listing row produced from a stored job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub request_id: String,
    pub mode: Mode,
    pub status: JobStatus,
    pub progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall time from submission to the terminal transition, if reached.
    pub duration_ms: Option<i64>,
}

impl JobSummary {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.job_id.clone(),
            request_id: job.request_id.clone(),
            mode: job.mode,
            status: job.status,
            progress_percent: job.progress_percent,
            job_title: job.job_title.clone(),
            company_name: job.company_name.clone(),
            error_detail: job.error_detail.clone(),
            created_at: job.created_at,
            completed_at: job.completed_at,
            duration_ms: job
                .completed_at
                .map(|done| (done - job.created_at).num_milliseconds()),
        }
    }
}
