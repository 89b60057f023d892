use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::error::AnthropicError;
use super::types::{Message, MessagesRequest, MessagesResponse, Tool, ToolChoice};
use crate::generator::{Completion, ContentGenerator, GenerationError, OutputContract};
use crate::text::extract_json;

const API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Rewrites should stay close to the submitted facts.
const TEMPERATURE: f32 = 0.3;

pub struct AnthropicClient {
    api_key: String,
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Result<Self, AnthropicError> {
        Self::with_base_url(api_key, model, max_tokens, API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(
        api_key: String,
        model: String,
        max_tokens: u32,
        base_url: String,
    ) -> Result<Self, AnthropicError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            api_key,
            client,
            base_url,
            model,
            max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, prompt: &str, contract: Option<&OutputContract>) -> MessagesRequest {
        let (tools, tool_choice) = match contract {
            Some(contract) => (
                vec![Tool {
                    name: contract.name.to_string(),
                    description: contract.description.to_string(),
                    input_schema: contract.schema.clone(),
                }],
                Some(ToolChoice::Tool {
                    name: contract.name.to_string(),
                }),
            ),
            None => (Vec::new(), None),
        };

        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message::user(prompt)],
            temperature: Some(TEMPERATURE),
            tools,
            tool_choice,
        }
    }

    pub async fn send_message(
        &self,
        req: &MessagesRequest,
    ) -> Result<MessagesResponse, AnthropicError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(AnthropicError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AnthropicError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<MessagesResponse>().await?;
        Ok(body)
    }
}

#[async_trait]
impl ContentGenerator for AnthropicClient {
    async fn complete(
        &self,
        prompt: &str,
        contract: Option<&OutputContract>,
        deadline: Duration,
    ) -> Result<Completion, GenerationError> {
        let req = self.build_request(prompt, contract);

        let resp = tokio::time::timeout(deadline, self.send_message(&req))
            .await
            .map_err(|_| GenerationError::Timeout(deadline))??;

        debug!(
            model = %resp.model,
            input_tokens = resp.usage.input_tokens,
            output_tokens = resp.usage.output_tokens,
            stop_reason = resp.stop_reason.as_deref().unwrap_or("none"),
            "generation call finished"
        );

        let Some(contract) = contract else {
            return Ok(Completion::Text(resp.text()));
        };

        if let Some(input) = resp.tool_input(contract.name) {
            return Ok(Completion::Structured(input.clone()));
        }
        // Some replies carry the object as text despite the forced tool.
        extract_json(&resp.text())
            .map(Completion::Structured)
            .ok_or_else(|| {
                AnthropicError::MissingToolOutput {
                    tool: contract.name.to_string(),
                }
                .into()
            })
    }
}
