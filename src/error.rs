use thiserror::Error;

use crate::state_machine::JobStatus;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum TailorError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Submitter {submitter} already has {active} active jobs (limit {cap})")]
    AdmissionDenied {
        submitter: String,
        active: usize,
        cap: usize,
    },

    #[error("A job with request id {0} already exists")]
    DuplicateRequest(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job is not completed (status: {status})")]
    NotCompleted { status: JobStatus },

    #[error("preprocessing failed: {0}")]
    PreprocessingFailed(String),

    #[error("assembly failed: {0}")]
    Assembly(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Generation error: {0}")]
    Generation(#[from] crate::generator::GenerationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T, E = TailorError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_denied_display() {
        let err = TailorError::AdmissionDenied {
            submitter: "ana".into(),
            active: 2,
            cap: 2,
        };
        assert_eq!(
            err.to_string(),
            "Submitter ana already has 2 active jobs (limit 2)"
        );
    }

    #[test]
    fn preprocessing_failure_mentions_stage() {
        let err = TailorError::PreprocessingFailed("empty text".into());
        assert!(err.to_string().contains("preprocess"));
    }

    #[test]
    fn store_error_converts() {
        let err: TailorError = StoreError::NotFound("req-1".into()).into();
        assert!(matches!(err, TailorError::Store(_)));
    }
}
