//! Tipos de dados para requisições e respostas da API Anthropic Messages.
//!
//! Além de texto simples, a requisição pode declarar uma ferramenta e forçar
//! o seu uso (`tool_choice`), o que faz o modelo devolver um bloco
//! `tool_use` cujo `input` segue o schema JSON declarado. É assim que o
//! contrato de saída estruturada é imposto.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Corpo da requisição para o endpoint `/v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
    /// Temperatura baixa mantém a reescrita próxima dos dados de entrada.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

/// Uma única mensagem em uma conversa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// "user" ou "assistant".
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Declaração de ferramenta; `input_schema` é o contrato de saída.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Força o modelo a responder chamando a ferramenta indicada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    Tool { name: String },
}

/// Resposta retornada pelo endpoint `/v1/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub model: String,
    /// Motivo da parada ("end_turn", "max_tokens", "tool_use").
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

impl MessagesResponse {
    /// Concatena todos os blocos de texto da resposta.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Entrada do primeiro bloco `tool_use` com o nome dado.
    pub fn tool_input(&self, tool: &str) -> Option<&Value> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input, .. } if name == tool => Some(input),
            _ => None,
        })
    }
}

/// Um bloco de conteúdo dentro da resposta.
///
/// O discriminador é o campo `"type"` do JSON; tipos desconhecidos são
/// aceitos e ignorados.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

/// Estatísticas de consumo de tokens para uma chamada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_tools_omits_fields() {
        let req = MessagesRequest {
            model: "claude-sonnet-4-5-20250929".into(),
            max_tokens: 1024,
            messages: vec![Message::user("Hello")],
            temperature: None,
            tools: Vec::new(),
            tool_choice: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
        assert!(json.get("temperature").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn tool_choice_serializes_with_type_tag() {
        let choice = ToolChoice::Tool {
            name: "summary".into(),
        };
        assert_eq!(
            serde_json::to_value(&choice).unwrap(),
            serde_json::json!({"type": "tool", "name": "summary"})
        );
    }

    #[test]
    fn response_with_tool_use_block() {
        let api_json = r#"{
            "id": "msg_123",
            "content": [
                {"type": "text", "text": "Calling tool"},
                {"type": "tool_use", "id": "tu_1", "name": "summary", "input": {"summary": "X"}}
            ],
            "model": "claude-sonnet-4-5-20250929",
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 5, "output_tokens": 15}
        }"#;
        let resp: MessagesResponse = serde_json::from_str(api_json).unwrap();
        assert_eq!(resp.text(), "Calling tool");
        assert_eq!(resp.tool_input("summary").unwrap()["summary"], "X");
        assert!(resp.tool_input("other").is_none());
    }

    #[test]
    fn unknown_block_types_are_tolerated() {
        let json = r#"{
            "id": "msg_456",
            "content": [{"type": "thinking", "thinking": "..."}, {"type": "text", "text": "ok"}],
            "model": "test",
            "stop_reason": null,
            "usage": {"input_tokens": 0, "output_tokens": 0}
        }"#;
        let resp: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.content[0], ContentBlock::Unknown);
        assert_eq!(resp.text(), "ok");
        assert_eq!(resp.stop_reason, None);
    }
}
