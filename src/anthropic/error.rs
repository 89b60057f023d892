//! Tipos de erro para o cliente da API Anthropic.
//!
//! [`AnthropicError`] descreve falhas do transporte e da API. Na fronteira
//! com o pipeline elas são achatadas em
//! [`GenerationError`](crate::generator::GenerationError), que é o que os
//! branches tratam.

use thiserror::Error;

use crate::generator::GenerationError;

/// Erros que podem ocorrer ao interagir com a API da Anthropic.
#[derive(Debug, Error)]
pub enum AnthropicError {
    /// HTTP 429; `retry_after_ms` vem do cabeçalho `retry-after`.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Qualquer outro status 4xx/5xx, com o corpo da resposta.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// A resposta não trouxe o bloco `tool_use` exigido pelo contrato.
    #[error("response has no output for tool `{tool}`")]
    MissingToolOutput { tool: String },

    /// Falha de rede subjacente (DNS, conexão recusada, corpo inválido).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl From<AnthropicError> for GenerationError {
    fn from(err: AnthropicError) -> Self {
        match err {
            AnthropicError::MissingToolOutput { .. } => GenerationError::Parse(err.to_string()),
            AnthropicError::NetworkError(ref e) if e.is_decode() => {
                GenerationError::Parse(err.to_string())
            }
            other => GenerationError::Service(other.to_string()),
        }
    }
}
