use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatModel, ChatRequest, ModelError};
use crate::state::ChatRole;

pub const OPENAI_API_BASE: &str = "https://api.openai.com";

#[derive(Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'static str>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: OPENAI_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Only the reasoning families accept `reasoning_effort`
    fn supports_reasoning(&self) -> bool {
        self.model.starts_with('o') || self.model.starts_with("gpt-5")
    }

    fn reasoning_effort(thinking_budget: u32) -> &'static str {
        match thinking_budget {
            b if b >= 16_384 => "high",
            b if b >= 4_096 => "medium",
            _ => "low",
        }
    }

    fn build_request(&self, request: &ChatRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(OpenAIMessage {
            role: "system",
            content: request.system_instruction.clone(),
        });
        messages.extend(request.history.iter().map(|entry| OpenAIMessage {
            role: match entry.role {
                ChatRole::User => "user",
                ChatRole::Model => "assistant",
            },
            content: entry.text(),
        }));
        messages.push(OpenAIMessage {
            role: "user",
            content: request.message.clone(),
        });

        let reasoning_effort = (self.supports_reasoning() && request.thinking_budget > 0)
            .then(|| Self::reasoning_effort(request.thinking_budget));

        OpenAIRequest {
            model: self.model.clone(),
            messages,
            reasoning_effort,
        }
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gpt-5".to_string(),
            "o4-mini".to_string(),
            "o3".to_string(),
            "gpt-4o".to_string(),
        ]
    }
}

#[async_trait]
impl ChatModel for OpenAIClient {
    async fn send_message(&self, request: &ChatRequest) -> Result<String, ModelError> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(ModelError::from_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ModelError::from_transport)?;

        if !status.is_success() {
            return Err(ModelError::from_status(status, &body));
        }

        let openai_response: OpenAIResponse = serde_json::from_str(&body).map_err(|e| {
            ModelError::invalid_response(format!("Failed to parse OpenAI response: {}", e))
        })?;
        Ok(openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::test_server::serve_once;
    use crate::state::{ChatMessage, HistoryEntry};
    use serde_json::json;

    fn sample_request() -> ChatRequest {
        ChatRequest {
            system_instruction: "persona".to_string(),
            thinking_budget: 32768,
            history: vec![
                HistoryEntry::from(&ChatMessage::user("What is ENS?")),
                HistoryEntry::from(&ChatMessage::model("Edge nodes.")),
            ],
            message: "And ESA?".to_string(),
        }
    }

    #[test]
    fn test_request_leads_with_system_message() {
        let client = OpenAIClient::new("key", "gpt-5");
        let body = serde_json::to_value(client.build_request(&sample_request())).unwrap();

        assert_eq!(
            body["messages"],
            json!([
                {"role": "system", "content": "persona"},
                {"role": "user", "content": "What is ENS?"},
                {"role": "assistant", "content": "Edge nodes."},
                {"role": "user", "content": "And ESA?"}
            ])
        );
        assert_eq!(body["reasoning_effort"], "high");
    }

    #[test]
    fn test_reasoning_effort_omitted_for_chat_models() {
        let client = OpenAIClient::new("key", "gpt-4o");
        let body = serde_json::to_value(client.build_request(&sample_request())).unwrap();
        assert!(body.get("reasoning_effort").is_none());
    }

    #[test]
    fn test_reasoning_effort_levels() {
        assert_eq!(OpenAIClient::reasoning_effort(32768), "high");
        assert_eq!(OpenAIClient::reasoning_effort(8192), "medium");
        assert_eq!(OpenAIClient::reasoning_effort(1024), "low");
    }

    #[tokio::test]
    async fn test_null_content_is_empty_reply() {
        let (base_url, server) = serve_once(
            200,
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":null}}]}"#,
        )
        .await;
        let client = OpenAIClient::new("test-key", "gpt-5").with_base_url(&base_url);

        let reply = client.send_message(&sample_request()).await.unwrap();
        assert_eq!(reply, "");

        let captured = server.await.unwrap();
        assert!(captured.request_line().starts_with("POST /v1/chat/completions"));
        assert_eq!(
            captured.header("authorization").as_deref(),
            Some("Bearer test-key")
        );
    }
}
