pub mod ai;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod provider;
pub mod state;

// Re-export main types for convenience
pub use ai::{build_model, ChatModel, ChatRequest, ClaudeClient, GeminiClient, ModelError, ModelErrorKind, OpenAIClient};
pub use catalog::{Calculator, PriceCalculator, Product, Region, Tool};
pub use config::{Config, ResolvedConfig};
pub use controller::{AssistantSettings, DialogueController, SubmitError, TurnOutcome};
pub use provider::Provider;
pub use state::{ChatMessage, ChatRole, ConversationSnapshot, ConversationStore, HistoryEntry, Part};
