//! Target-description preprocessing.
//!
//! Turns the pasted job description into [`TargetHints`]: cleaned text plus
//! the keyword and phrase lists every branch prompt is built from.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::generator::{ContentGenerator, GenerationError};
use crate::prompts;
use crate::text::clean_target_text;

const UNSPECIFIED: &str = "Not specified";

/// Preprocessed view of the target description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetHints {
    pub normalized_text: String,
    pub technical_keywords: Vec<String>,
    pub soft_skills: Vec<String>,
    pub phrases: Vec<String>,
    pub requirements: Vec<String>,
    pub title: String,
    pub seniority: String,
}

impl TargetHints {
    /// Keywords, soft skills and phrases as a prompt block.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Role: {} ({})\n", self.title, self.seniority));
        out.push_str(&format!(
            "Technical keywords: {}\n",
            self.technical_keywords.join(", ")
        ));
        out.push_str(&format!("Soft skills: {}\n", self.soft_skills.join(", ")));
        if !self.phrases.is_empty() {
            out.push_str("Key phrases:\n");
            for phrase in &self.phrases {
                out.push_str(&format!("- {phrase}\n"));
            }
        }
        out
    }
}

/// Caller-supplied context about the posting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessContext {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[async_trait]
pub trait Preprocessor: Send + Sync {
    async fn normalize(
        &self,
        text: &str,
        ctx: &PreprocessContext,
    ) -> Result<TargetHints, PreprocessError>;
}

/// Shape of the structured hints reply.
#[derive(Debug, Deserialize)]
struct HintsReply {
    #[serde(default)]
    job_title: String,
    #[serde(default)]
    seniority: String,
    #[serde(default)]
    requirements: Vec<String>,
    #[serde(default)]
    technical_keywords: Vec<String>,
    #[serde(default)]
    soft_skills: Vec<String>,
    #[serde(default)]
    phrases: Vec<String>,
}

/// Preprocessor backed by one structured generation call.
pub struct LlmPreprocessor {
    generator: Arc<dyn ContentGenerator>,
    deadline: Duration,
}

impl LlmPreprocessor {
    pub fn new(generator: Arc<dyn ContentGenerator>, deadline: Duration) -> Self {
        Self {
            generator,
            deadline,
        }
    }
}

#[async_trait]
impl Preprocessor for LlmPreprocessor {
    #[instrument(skip_all, fields(chars = text.len()))]
    async fn normalize(
        &self,
        text: &str,
        ctx: &PreprocessContext,
    ) -> Result<TargetHints, PreprocessError> {
        let normalized_text = clean_target_text(text);
        if normalized_text.is_empty() {
            return Err(PreprocessError::Validation(
                "target description is empty after cleanup".into(),
            ));
        }

        let contract = prompts::hints_contract();
        let reply: HintsReply = self
            .generator
            .complete(
                &prompts::hints_prompt(&normalized_text, ctx),
                Some(&contract),
                self.deadline,
            )
            .await?
            .parse()?;

        let hints = TargetHints {
            technical_keywords: dedup(reply.technical_keywords),
            soft_skills: dedup(reply.soft_skills),
            phrases: dedup(reply.phrases),
            requirements: dedup(reply.requirements),
            title: ctx
                .job_title
                .clone()
                .or_else(|| non_empty(reply.job_title))
                .unwrap_or_else(|| UNSPECIFIED.to_string()),
            seniority: non_empty(reply.seniority).unwrap_or_else(|| UNSPECIFIED.to_string()),
            normalized_text,
        };

        if hints.technical_keywords.is_empty() && hints.phrases.is_empty() {
            return Err(PreprocessError::Validation(
                "no keywords or phrases found in target description".into(),
            ));
        }

        info!(
            keywords = hints.technical_keywords.len(),
            phrases = hints.phrases.len(),
            title = %hints.title,
            "target description preprocessed"
        );
        Ok(hints)
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Trim entries and drop blanks and case-insensitive duplicates, keeping
/// first-seen order.
fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.to_lowercase()))
        .collect()
}
