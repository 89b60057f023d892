//! Drives one job from preprocessing to its terminal state.
//!
//! Stages: preprocess the target description (single attempt, bounded),
//! fan the three branches out on a [`JoinSet`], wait for all of them,
//! assemble the result and finalize. Only a preprocessing, assembly or
//! completion-write failure fails the job; branch trouble is absorbed by
//! branch fallbacks.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::branches::skills::SkillMap;
use crate::branches::{
    experience, skills, summary, BranchError, BranchExecutor, BranchKind, BranchOutcome,
};
use crate::document::{ExperienceEntry, GeneratedSections, ResumeDocument};
use crate::error::TailorError;
use crate::generator::ContentGenerator;
use crate::preprocess::{PreprocessContext, Preprocessor, TargetHints};
use crate::progress::ProgressTracker;
use crate::state_machine::Job;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTimeouts {
    pub preprocess: Duration,
    pub summary: Duration,
    pub experience: Duration,
    pub skills: Duration,
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self {
            preprocess: Duration::from_secs(90),
            summary: Duration::from_secs(60),
            experience: Duration::from_secs(90),
            skills: Duration::from_secs(60),
        }
    }
}

/// How a pipeline run ended. The same state is already in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(Box<ResumeDocument>),
    Failed(String),
}

enum BranchOutput {
    Summary(BranchOutcome<String>),
    Experience(BranchOutcome<Vec<ExperienceEntry>>),
    Skills(BranchOutcome<SkillMap>),
}

impl BranchOutput {
    fn kind(&self) -> BranchKind {
        match self {
            BranchOutput::Summary(_) => BranchKind::Summary,
            BranchOutput::Experience(_) => BranchKind::Experience,
            BranchOutput::Skills(_) => BranchKind::Skills,
        }
    }
}

pub struct PipelineOrchestrator {
    preprocessor: Arc<dyn Preprocessor>,
    generator: Arc<dyn ContentGenerator>,
    tracker: Arc<ProgressTracker>,
    timeouts: PipelineTimeouts,
}

impl PipelineOrchestrator {
    pub fn new(
        preprocessor: Arc<dyn Preprocessor>,
        generator: Arc<dyn ContentGenerator>,
        tracker: Arc<ProgressTracker>,
        timeouts: PipelineTimeouts,
    ) -> Self {
        Self {
            preprocessor,
            generator,
            tracker,
            timeouts,
        }
    }

    pub fn tracker(&self) -> &Arc<ProgressTracker> {
        &self.tracker
    }

    /// Run `job` to completion. Always ends with a terminal write.
    #[instrument(skip_all, fields(request_id = %job.request_id, mode = %job.mode))]
    pub async fn run(&self, job: &Job) -> JobOutcome {
        let id = job.request_id.as_str();
        self.tracker.report(id, 5, "Starting").await;
        self.tracker
            .report(id, 10, "Analyzing target description")
            .await;

        let hints = match self.preprocess(job).await {
            Ok(hints) => Arc::new(hints),
            Err(e) => return self.fail(id, e).await,
        };
        self.tracker
            .report(id, 15, "Target description analyzed")
            .await;

        self.tracker
            .report(id, 25, "Generating summary, experience and skills")
            .await;
        let sections = self.fan_out(job, hints).await;
        self.tracker.report(id, 90, "Assembling resume").await;

        let document = match ResumeDocument::assemble(&job.source_document, sections) {
            Ok(document) => document,
            Err(e) => return self.fail(id, TailorError::Assembly(e.to_string())).await,
        };

        match self.tracker.complete(id, document.clone()).await {
            Ok(_) => {
                info!("job completed");
                JobOutcome::Completed(Box::new(document))
            }
            Err(e) => {
                error!(error = %e, "could not record job completion");
                self.fail(id, e).await
            }
        }
    }

    async fn preprocess(&self, job: &Job) -> Result<TargetHints, TailorError> {
        let ctx = PreprocessContext {
            job_title: job.job_title.clone(),
            company_name: job.company_name.clone(),
        };
        let normalize = self.preprocessor.normalize(&job.target_spec_text, &ctx);
        match tokio::time::timeout(self.timeouts.preprocess, normalize).await {
            Ok(Ok(hints)) => Ok(hints),
            Ok(Err(e)) => Err(TailorError::PreprocessingFailed(e.to_string())),
            Err(_) => Err(TailorError::PreprocessingFailed(format!(
                "timed out after {:?}",
                self.timeouts.preprocess
            ))),
        }
    }

    /// Run the three branches concurrently and collect their fields. A
    /// branch whose task dies yields its source field.
    async fn fan_out(&self, job: &Job, hints: Arc<TargetHints>) -> GeneratedSections {
        let source = &job.source_document;
        let mut set = JoinSet::new();

        let exec = BranchExecutor::new(
            BranchKind::Summary,
            self.timeouts.summary,
            summary::strategy(job.mode, self.generator.clone()),
        );
        let (h, field) = (hints.clone(), source.summary.clone());
        set.spawn(async move { BranchOutput::Summary(exec.execute(h, &field).await) });

        let exec = BranchExecutor::new(
            BranchKind::Experience,
            self.timeouts.experience,
            experience::strategy(job.mode, self.generator.clone()),
        );
        let (h, field) = (hints.clone(), source.experience.clone());
        set.spawn(async move { BranchOutput::Experience(exec.execute(h, &field).await) });

        let exec = BranchExecutor::new(
            BranchKind::Skills,
            self.timeouts.skills,
            skills::strategy(job.mode, self.generator.clone()),
        );
        let (h, field) = (hints, source.technical_skills.clone());
        set.spawn(async move { BranchOutput::Skills(exec.execute(h, &field).await) });

        let mut summary = None;
        let mut experience = None;
        let mut skills = None;
        let mut lost = None;
        let mut done = 0u8;

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(output) => {
                    done += 1;
                    let kind = output.kind();
                    match output {
                        BranchOutput::Summary(o) => summary = Some(o.value),
                        BranchOutput::Experience(o) => experience = Some(o.value),
                        BranchOutput::Skills(o) => skills = Some(o.value),
                    }
                    self.tracker
                        .report(&job.request_id, 25 + 20 * done, &format!("{kind} ready"))
                        .await;
                }
                Err(e) => {
                    error!(error = %e, "branch task died");
                    lost = Some(e.to_string());
                }
            }
        }

        let lost = BranchError::Panicked(lost.unwrap_or_else(|| "branch did not report".into()));
        GeneratedSections {
            summary: or_source(BranchKind::Summary, summary, &source.summary, &lost),
            experience: or_source(BranchKind::Experience, experience, &source.experience, &lost),
            technical_skills: or_source(BranchKind::Skills, skills, &source.technical_skills, &lost),
        }
    }

    async fn fail(&self, request_id: &str, err: TailorError) -> JobOutcome {
        let detail = err.to_string();
        warn!(error = %detail, "job failed");
        if let Err(e) = self.tracker.fail(request_id, &detail).await {
            error!(error = %e, "could not record job failure");
        }
        JobOutcome::Failed(detail)
    }
}

fn or_source<T: Clone>(kind: BranchKind, value: Option<T>, source: &T, lost: &BranchError) -> T {
    value.unwrap_or_else(|| {
        warn!(branch = %kind, fallback = true, error = %lost, "using source field");
        source.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ResumeDocument;
    use crate::generator::{Completion, GenerationError, OutputContract};
    use crate::preprocess::PreprocessError;
    use crate::state_machine::{JobStatus, Mode};
    use crate::state_machine::JobPatch;
    use crate::store::{JobStore, MemoryJobStore, StoreError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    struct StaticPreprocessor(Result<TargetHints, PreprocessError>);

    #[async_trait]
    impl Preprocessor for StaticPreprocessor {
        async fn normalize(
            &self,
            _text: &str,
            _ctx: &PreprocessContext,
        ) -> Result<TargetHints, PreprocessError> {
            self.0.clone()
        }
    }

    struct SlowPreprocessor;

    #[async_trait]
    impl Preprocessor for SlowPreprocessor {
        async fn normalize(
            &self,
            _text: &str,
            _ctx: &PreprocessContext,
        ) -> Result<TargetHints, PreprocessError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(TargetHints::default())
        }
    }

    /// Answers by contract name; counts every call.
    struct ContractGenerator {
        calls: Mutex<Vec<Option<&'static str>>>,
    }

    #[async_trait]
    impl ContentGenerator for ContractGenerator {
        async fn complete(
            &self,
            _prompt: &str,
            contract: Option<&OutputContract>,
            _deadline: Duration,
        ) -> Result<Completion, GenerationError> {
            let name = contract.map(|c| c.name);
            self.calls.lock().push(name);
            match name {
                Some("summary") => Ok(Completion::Structured(json!({"summary": "Fresh summary"}))),
                Some("technical_skills") => Ok(Completion::Structured(
                    json!({"technical_skills": {"Languages": ["Python", "SQL"]}}),
                )),
                Some("experience") => Ok(Completion::Structured(json!({
                    "experience": [{
                        "company": "Acme", "role": "Data Engineer", "period": "2020-2024",
                        "points": ["One.", "Two.", "Three.", "Four.", "Five.", "Six."]
                    }]
                }))),
                _ => Err(GenerationError::Service("unexpected call".into())),
            }
        }
    }

    /// Always fails with a service error.
    struct DownGenerator;

    #[async_trait]
    impl ContentGenerator for DownGenerator {
        async fn complete(
            &self,
            _prompt: &str,
            _contract: Option<&OutputContract>,
            _deadline: Duration,
        ) -> Result<Completion, GenerationError> {
            Err(GenerationError::Service("down".into()))
        }
    }

    /// Accepts every write except the completion patch.
    struct NoCompleteStore(MemoryJobStore);

    #[async_trait]
    impl JobStore for NoCompleteStore {
        async fn create(&self, job: Job) -> Result<(), StoreError> {
            self.0.create(job).await
        }
        async fn get(&self, request_id: &str) -> Result<Option<Job>, StoreError> {
            self.0.get(request_id).await
        }
        async fn update(&self, request_id: &str, patch: JobPatch) -> Result<Job, StoreError> {
            match patch {
                JobPatch::Complete { .. } => Err(StoreError::NotFound(request_id.to_string())),
                other => self.0.update(request_id, other).await,
            }
        }
        async fn list(&self) -> Result<Vec<Job>, StoreError> {
            self.0.list().await
        }
    }

    fn hints() -> TargetHints {
        TargetHints {
            normalized_text: "Seeking a data engineer".into(),
            technical_keywords: vec!["Python".into()],
            ..Default::default()
        }
    }

    fn source() -> ResumeDocument {
        serde_json::from_value(json!({
            "name": "Ana",
            "summary": "5 years in data.",
            "technical_skills": {"Languages": "Java"},
            "experience": [{"company": "Acme", "role": "Data Engineer", "period": "2020-2024",
                            "points": ["a", "b", "c", "d", "e", "f"]}],
            "education": [{"degree": "BSc", "institution": "USP", "year": "2019"}]
        }))
        .unwrap()
    }

    async fn setup(
        mode: Mode,
        preprocessor: Arc<dyn Preprocessor>,
    ) -> (PipelineOrchestrator, Arc<ContractGenerator>, Arc<MemoryJobStore>, Job) {
        let store = Arc::new(MemoryJobStore::new());
        let job = Job::new("r1".into(), "ana".into(), mode, source(), "Data engineer".into());
        store.create(job.clone()).await.unwrap();
        let generator = Arc::new(ContractGenerator {
            calls: Mutex::new(Vec::new()),
        });
        let orchestrator = PipelineOrchestrator::new(
            preprocessor,
            generator.clone(),
            Arc::new(ProgressTracker::new(store.clone())),
            PipelineTimeouts::default(),
        );
        (orchestrator, generator, store, job)
    }

    #[tokio::test]
    async fn fresh_run_completes_with_generated_sections() {
        let (orchestrator, generator, store, job) =
            setup(Mode::GenerateFresh, Arc::new(StaticPreprocessor(Ok(hints())))).await;

        let outcome = orchestrator.run(&job).await;

        let JobOutcome::Completed(doc) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(doc.summary, "Fresh summary");
        assert_eq!(doc.technical_skills["Languages"], "Python, SQL");
        assert_eq!(doc.experience[0].points[0], "One.");
        assert_eq!(doc.name, "Ana");
        assert_eq!(generator.calls.lock().len(), 3);

        let stored = store.get("r1").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.progress_percent, 100);
        assert_eq!(stored.result_document.as_ref(), Some(doc.as_ref()));
        assert!(stored.error_detail.is_none());
    }

    #[tokio::test]
    async fn preprocessing_failure_fails_without_branches() {
        let (orchestrator, generator, store, job) = setup(
            Mode::GenerateFresh,
            Arc::new(StaticPreprocessor(Err(PreprocessError::Validation(
                "no keywords".into(),
            )))),
        )
        .await;

        let outcome = orchestrator.run(&job).await;

        assert!(matches!(outcome, JobOutcome::Failed(ref d) if d.contains("preprocess")));
        assert!(generator.calls.lock().is_empty());
        let stored = store.get("r1").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(stored.result_document.is_none());
        assert!(stored.error_detail.unwrap().contains("preprocess"));
        assert!(stored.progress_percent < 100);
    }

    #[tokio::test(start_paused = true)]
    async fn preprocessing_timeout_fails_the_job() {
        let (orchestrator, generator, store, job) =
            setup(Mode::LightEdit, Arc::new(SlowPreprocessor)).await;

        let outcome = orchestrator.run(&job).await;

        assert!(matches!(outcome, JobOutcome::Failed(ref d) if d.contains("timed out")));
        assert!(generator.calls.lock().is_empty());
        assert_eq!(
            store.get("r1").await.unwrap().unwrap().status,
            JobStatus::Failed
        );
    }

    #[tokio::test]
    async fn light_edit_calls_only_the_experience_branch() {
        let (orchestrator, generator, _store, job) =
            setup(Mode::LightEdit, Arc::new(StaticPreprocessor(Ok(hints())))).await;

        let JobOutcome::Completed(doc) = orchestrator.run(&job).await else {
            panic!("expected completion");
        };
        assert_eq!(doc.summary, "5 years in data.");
        assert_eq!(doc.technical_skills["Languages"], "Java");
        assert_eq!(*generator.calls.lock(), vec![Some("experience")]);
    }

    #[tokio::test]
    async fn fallback_with_ungrouped_source_entry_still_completes() {
        let mut document = source();
        document.experience.push(serde_json::from_value(json!({
            "period": "2019",
            "points": ["a", "b", "c", "d", "e", "f"]
        })).unwrap());
        let store = Arc::new(MemoryJobStore::new());
        let job = Job::new("r1".into(), "ana".into(), Mode::LightEdit, document.clone(), "t".into());
        store.create(job.clone()).await.unwrap();
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(StaticPreprocessor(Ok(hints()))),
            Arc::new(DownGenerator),
            Arc::new(ProgressTracker::new(store.clone())),
            PipelineTimeouts::default(),
        );

        let JobOutcome::Completed(doc) = orchestrator.run(&job).await else {
            panic!("expected completion");
        };
        assert_eq!(doc.experience, document.experience);
        assert_eq!(
            store.get("r1").await.unwrap().unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn failed_completion_write_fails_the_job() {
        let store = Arc::new(NoCompleteStore(MemoryJobStore::new()));
        let job = Job::new("r1".into(), "ana".into(), Mode::LightEdit, source(), "t".into());
        store.create(job.clone()).await.unwrap();
        let tracker = Arc::new(ProgressTracker::new(store.clone()));
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(StaticPreprocessor(Ok(hints()))),
            Arc::new(ContractGenerator {
                calls: Mutex::new(Vec::new()),
            }),
            tracker.clone(),
            PipelineTimeouts::default(),
        );

        let outcome = orchestrator.run(&job).await;

        assert!(matches!(outcome, JobOutcome::Failed(ref d) if d.contains("r1")));
        let stored = store.get("r1").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert!(stored.result_document.is_none());
        assert_eq!(store.count_active("ana").await.unwrap(), 0);
        assert!(tracker.entry("r1").is_none());
    }
}
