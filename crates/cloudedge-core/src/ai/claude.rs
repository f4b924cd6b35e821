use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatModel, ChatRequest, ModelError};
use crate::state::ChatRole;

pub const CLAUDE_API_BASE: &str = "https://api.anthropic.com";

/// Anthropic rejects thinking budgets below this
const MIN_THINKING_BUDGET: u32 = 1024;
/// Room left for the visible answer on top of the thinking budget
const ANSWER_TOKENS: u32 = 4096;

/// Output token ceiling per model; thinking counts against it
fn max_output_tokens(model: &str) -> u32 {
    if model.starts_with("claude-opus-4") {
        32_000
    } else {
        64_000
    }
}

#[derive(Serialize)]
struct ClaudeMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ClaudeThinking {
    #[serde(rename = "type")]
    kind: &'static str,
    budget_tokens: u32,
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ClaudeThinking>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContent>,
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: CLAUDE_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn build_request(&self, request: &ChatRequest) -> ClaudeRequest {
        let mut messages: Vec<ClaudeMessage> = request
            .history
            .iter()
            .map(|entry| ClaudeMessage {
                role: match entry.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "assistant",
                },
                content: entry.text(),
            })
            .collect();
        messages.push(ClaudeMessage {
            role: "user",
            content: request.message.clone(),
        });

        let (thinking, max_tokens) = if request.thinking_budget == 0 {
            (None, ANSWER_TOKENS)
        } else {
            let ceiling = max_output_tokens(&self.model);
            let budget = request
                .thinking_budget
                .min(ceiling - ANSWER_TOKENS)
                .max(MIN_THINKING_BUDGET);
            (
                Some(ClaudeThinking {
                    kind: "enabled",
                    budget_tokens: budget,
                }),
                budget + ANSWER_TOKENS,
            )
        };

        ClaudeRequest {
            model: self.model.clone(),
            max_tokens,
            system: request.system_instruction.clone(),
            messages,
            thinking,
        }
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "claude-sonnet-4-20250514".to_string(),
            "claude-opus-4-20250514".to_string(),
            "claude-3-7-sonnet-20250219".to_string(),
        ]
    }
}

#[async_trait]
impl ChatModel for ClaudeClient {
    async fn send_message(&self, request: &ChatRequest) -> Result<String, ModelError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(ModelError::from_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ModelError::from_transport)?;

        if !status.is_success() {
            return Err(ModelError::from_status(status, &body));
        }

        let claude_response: ClaudeResponse = serde_json::from_str(&body).map_err(|e| {
            ModelError::invalid_response(format!("Failed to parse Claude response: {}", e))
        })?;
        Ok(claude_response
            .content
            .into_iter()
            .filter(|c| c.kind == "text")
            .filter_map(|c| c.text)
            .collect())
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::test_server::serve_once;
    use crate::ai::ModelErrorKind;
    use crate::state::{ChatMessage, HistoryEntry};
    use serde_json::json;

    fn sample_request(thinking_budget: u32) -> ChatRequest {
        ChatRequest {
            system_instruction: "persona".to_string(),
            thinking_budget,
            history: vec![
                HistoryEntry::from(&ChatMessage::user("What is ENS?")),
                HistoryEntry::from(&ChatMessage::model("Edge nodes.")),
            ],
            message: "And ESA?".to_string(),
        }
    }

    #[test]
    fn test_request_maps_model_role_to_assistant() {
        let client = ClaudeClient::new("key", "claude-sonnet-4-20250514");
        let body = serde_json::to_value(client.build_request(&sample_request(32768))).unwrap();

        assert_eq!(body["system"], "persona");
        assert_eq!(
            body["messages"],
            json!([
                {"role": "user", "content": "What is ENS?"},
                {"role": "assistant", "content": "Edge nodes."},
                {"role": "user", "content": "And ESA?"}
            ])
        );
        assert_eq!(body["thinking"], json!({"type": "enabled", "budget_tokens": 32768}));
        assert_eq!(body["max_tokens"], 32768 + ANSWER_TOKENS);
    }

    #[test]
    fn test_small_budget_is_raised_and_zero_disables_thinking() {
        let client = ClaudeClient::new("key", "claude-sonnet-4-20250514");

        let body = serde_json::to_value(client.build_request(&sample_request(10))).unwrap();
        assert_eq!(body["thinking"]["budget_tokens"], MIN_THINKING_BUDGET);

        let body = serde_json::to_value(client.build_request(&sample_request(0))).unwrap();
        assert!(body.get("thinking").is_none());
        assert_eq!(body["max_tokens"], ANSWER_TOKENS);
    }

    #[test]
    fn test_opus_budget_fits_output_limit() {
        let client = ClaudeClient::new("key", "claude-opus-4-20250514");
        let body = serde_json::to_value(client.build_request(&sample_request(32768))).unwrap();

        assert_eq!(body["max_tokens"], 32_000);
        assert_eq!(body["thinking"]["budget_tokens"], 32_000 - ANSWER_TOKENS);
    }

    #[tokio::test]
    async fn test_send_message_returns_text_blocks_only() {
        let (base_url, server) = serve_once(
            200,
            r#"{"content":[{"type":"thinking","thinking":"hmm","signature":"x"},{"type":"text","text":"ESA is security plus CDN."}]}"#,
        )
        .await;
        let client = ClaudeClient::new("test-key", "claude-sonnet-4-20250514").with_base_url(&base_url);

        let reply = client.send_message(&sample_request(2048)).await.unwrap();
        assert_eq!(reply, "ESA is security plus CDN.");

        let captured = server.await.unwrap();
        assert!(captured.request_line().starts_with("POST /v1/messages"));
        assert_eq!(captured.header("x-api-key").as_deref(), Some("test-key"));
    }

    #[tokio::test]
    async fn test_send_message_maps_rate_limit() {
        let (base_url, server) = serve_once(
            429,
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#,
        )
        .await;
        let client = ClaudeClient::new("test-key", "claude-sonnet-4-20250514").with_base_url(&base_url);

        let err = client.send_message(&sample_request(2048)).await.unwrap_err();
        assert_eq!(err.kind, ModelErrorKind::RateLimit);
        server.await.unwrap();
    }
}
