use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatModel, ChatRequest, ModelError};
use crate::state::{ChatRole, HistoryEntry, Part};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<HistoryEntry>,
    system_instruction: GeminiSystemInstruction,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    thinking_config: GeminiThinkingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiThinkingConfig {
    thinking_budget: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Largest thinking budget the model accepts
    fn max_thinking_budget(&self) -> u32 {
        if self.model.contains("flash") {
            24_576
        } else {
            32_768
        }
    }

    fn build_request(&self, request: &ChatRequest) -> GeminiRequest {
        let mut contents = request.history.clone();
        contents.push(HistoryEntry {
            role: ChatRole::User,
            parts: vec![Part {
                text: request.message.clone(),
            }],
        });

        GeminiRequest {
            contents,
            system_instruction: GeminiSystemInstruction {
                parts: vec![Part {
                    text: request.system_instruction.clone(),
                }],
            },
            generation_config: GeminiGenerationConfig {
                thinking_config: GeminiThinkingConfig {
                    thinking_budget: request.thinking_budget.min(self.max_thinking_budget()),
                },
            },
        }
    }

    /// Text of the first candidate, skipping thought summaries
    fn reply_text(response: GeminiResponse) -> String {
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gemini-3-pro-preview".to_string(),
            "gemini-2.5-pro".to_string(),
            "gemini-2.5-flash".to_string(),
        ]
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn send_message(&self, request: &ChatRequest) -> Result<String, ModelError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
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

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            ModelError::invalid_response(format!("Failed to parse Gemini response: {}", e))
        })?;
        Ok(Self::reply_text(gemini_response))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
