//! Seam between the pipeline and the external content-generation service.
//!
//! [`ContentGenerator`] is a single request/response call: a prompt, an
//! optional [`OutputContract`] the reply must satisfy, and a deadline. The
//! Anthropic adapter in [`crate::anthropic`] is the production
//! implementation; tests swap in scripted generators.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::text::extract_json;

/// A JSON schema the generated reply must conform to.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputContract {
    /// Short identifier, also used as the forced tool name.
    pub name: &'static str,
    pub description: &'static str,
    pub schema: Value,
}

/// Raw reply of one generation call.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Text(String),
    Structured(Value),
}

impl Completion {
    /// Interpret the reply as JSON, extracting it from prose if needed.
    pub fn into_value(self) -> Result<Value, GenerationError> {
        match self {
            Completion::Structured(value) => Ok(value),
            Completion::Text(text) => extract_json(&text).ok_or_else(|| {
                GenerationError::Parse(format!("no JSON object in reply ({} chars)", text.len()))
            }),
        }
    }

    pub fn parse<T: DeserializeOwned>(self) -> Result<T, GenerationError> {
        let value = self.into_value()?;
        serde_json::from_value(value).map_err(|e| GenerationError::Parse(e.to_string()))
    }

    pub fn into_text(self) -> String {
        match self {
            Completion::Text(text) => text,
            Completion::Structured(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation service error: {0}")]
    Service(String),

    #[error("failed to parse generated output: {0}")]
    Parse(String),
}

/// Stateless generation client, shared by every branch of every job.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        contract: Option<&OutputContract>,
        deadline: Duration,
    ) -> Result<Completion, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct SummaryReply {
        summary: String,
    }

    #[test]
    fn structured_completion_parses_directly() {
        let c = Completion::Structured(serde_json::json!({"summary": "X"}));
        let reply: SummaryReply = c.parse().unwrap();
        assert_eq!(reply.summary, "X");
    }

    #[test]
    fn text_completion_extracts_json() {
        let c = Completion::Text("```json\n{\"summary\": \"Y\"}\n```".into());
        let reply: SummaryReply = c.parse().unwrap();
        assert_eq!(reply.summary, "Y");
    }

    #[test]
    fn text_without_json_is_parse_error() {
        let err = Completion::Text("sorry".into()).into_value().unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }

    #[test]
    fn wrong_shape_is_parse_error() {
        let c = Completion::Structured(serde_json::json!({"other": 1}));
        let err = c.parse::<SummaryReply>().unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }

    #[test]
    fn structured_into_text_serializes() {
        let c = Completion::Structured(serde_json::json!({"a": 1}));
        assert_eq!(c.into_text(), r#"{"a":1}"#);
    }
}
