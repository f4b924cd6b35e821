//! Model service clients
//!
//! Every provider implements [`ChatModel`]: one request carrying the persona,
//! the reasoning budget, the prior turns and the new user message, answered
//! by a single reply string.

pub mod claude;
pub mod error;
pub mod gemini;
pub mod openai;

#[cfg(test)]
pub(crate) mod test_server;

use async_trait::async_trait;
use std::sync::Arc;

use crate::provider::Provider;
use crate::state::HistoryEntry;

pub use claude::ClaudeClient;
pub use error::{ModelError, ModelErrorKind};
pub use gemini::GeminiClient;
pub use openai::OpenAIClient;

/// Everything a provider needs to produce the next assistant reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system_instruction: String,
    /// Token budget the model may spend reasoning before it answers
    pub thinking_budget: u32,
    pub history: Vec<HistoryEntry>,
    pub message: String,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one message with its history. An empty string is a valid reply.
    async fn send_message(&self, request: &ChatRequest) -> Result<String, ModelError>;

    fn model_id(&self) -> &str;
}

/// Build the client for `provider`
pub fn build_model(provider: Provider, api_key: &str, model: &str) -> Arc<dyn ChatModel> {
    match provider {
        Provider::Gemini => Arc::new(GeminiClient::new(api_key, model)),
        Provider::Claude => Arc::new(ClaudeClient::new(api_key, model)),
        Provider::OpenAI => Arc::new(OpenAIClient::new(api_key, model)),
    }
}
