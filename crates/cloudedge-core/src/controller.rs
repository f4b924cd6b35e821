//! Dialogue controller
//!
//! Runs one request/response cycle per submission: append the user message,
//! mark the store pending, ask the model service, append whatever comes back
//! (reply, fallback or error text) and clear pending on every exit path.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::ai::{ChatModel, ChatRequest};
use crate::state::{ChatMessage, ConversationStore};

/// Persona sent out of band as the system instruction
pub const CLOUDEDGE_PERSONA: &str = "You are an expert cloud architect and sales engineer for CloudEdge, a leading edge computing provider.
Your products include:
1. ENS (Edge Node Service): Distributed edge computing nodes.
2. ESA (Edge Security Acceleration): Security and CDN combined.
3. CDN (Content Delivery Network): Fast static content delivery.
4. ENA (Edge Network Acceleration): Network optimization.

You are helpful, concise, and professional. You can help calculate prices, suggest architectures, and debug issues.";

/// Tokens the model may spend reasoning before answering
pub const DEFAULT_THINKING_BUDGET: u32 = 32_768;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const MISSING_API_KEY_MESSAGE: &str =
    "Error: API Key is missing. Please check your environment configuration.";
pub const EMPTY_RESPONSE_MESSAGE: &str = "I'm sorry, I couldn't generate a response.";
pub const REQUEST_FAILED_MESSAGE: &str =
    "Sorry, I encountered an error while processing your request. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantSettings {
    pub system_instruction: String,
    pub thinking_budget: u32,
    pub request_timeout: Duration,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            system_instruction: CLOUDEDGE_PERSONA.to_string(),
            thinking_budget: DEFAULT_THINKING_BUDGET,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// How a submission ended. Every variant appended exactly one model message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Replied,
    EmptyReply,
    Failed,
    MissingCredential,
}

/// Submissions refused before anything was appended
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("assistant is still answering the previous message")]
    Busy,
}

/// Owns an in-flight turn. `finish` closes it with the model message; if the
/// turn future is dropped first, `Drop` clears the pending flag instead.
struct PendingGuard<'a> {
    store: &'a ConversationStore,
    armed: bool,
}

impl<'a> PendingGuard<'a> {
    fn new(store: &'a ConversationStore) -> Self {
        Self { store, armed: true }
    }

    fn finish(mut self, message: ChatMessage) {
        self.armed = false;
        self.store.finish_turn(message);
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        // A finished turn may already have been followed by a new one
        if self.armed {
            self.store.set_pending(false);
        }
    }
}

pub struct DialogueController {
    store: Arc<ConversationStore>,
    model: Option<Arc<dyn ChatModel>>,
    settings: AssistantSettings,
}

impl DialogueController {
    /// `model` is `None` when no credential is configured
    pub fn new(
        store: Arc<ConversationStore>,
        model: Option<Arc<dyn ChatModel>>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            store,
            model,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn settings(&self) -> &AssistantSettings {
        &self.settings
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_id(&self) -> Option<&str> {
        self.model.as_deref().map(|m| m.model_id())
    }

    pub async fn submit(&self, user_text: &str) -> Result<TurnOutcome, SubmitError> {
        let text = user_text.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyMessage);
        }

        let Some(model) = self.model.as_ref() else {
            return self.answer_without_credential(text);
        };

        let history = self
            .store
            .begin_turn(ChatMessage::user(text))
            .ok_or(SubmitError::Busy)?;
        let pending = PendingGuard::new(&self.store);

        let request = ChatRequest {
            system_instruction: self.settings.system_instruction.clone(),
            thinking_budget: self.settings.thinking_budget,
            history,
            message: text.to_string(),
        };

        tracing::info!(
            model = %model.model_id(),
            history_len = request.history.len(),
            "Dispatching assistant turn"
        );

        let start = Instant::now();
        let result = tokio::time::timeout(
            self.settings.request_timeout,
            model.send_message(&request),
        )
        .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (reply, outcome) = match result {
            Ok(Ok(reply)) if reply.trim().is_empty() => {
                tracing::warn!(model = %model.model_id(), duration_ms, "Model returned an empty reply");
                (EMPTY_RESPONSE_MESSAGE.to_string(), TurnOutcome::EmptyReply)
            }
            Ok(Ok(reply)) => {
                tracing::debug!(
                    model = %model.model_id(),
                    duration_ms,
                    reply_len = reply.len(),
                    "Model replied"
                );
                (reply, TurnOutcome::Replied)
            }
            Ok(Err(e)) => {
                tracing::error!(
                    model = %model.model_id(),
                    duration_ms,
                    kind = %e.kind,
                    error = %e.message,
                    "Model request failed"
                );
                (REQUEST_FAILED_MESSAGE.to_string(), TurnOutcome::Failed)
            }
            Err(_) => {
                tracing::error!(
                    model = %model.model_id(),
                    timeout_secs = self.settings.request_timeout.as_secs_f64(),
                    "Model request timed out"
                );
                (REQUEST_FAILED_MESSAGE.to_string(), TurnOutcome::Failed)
            }
        };

        pending.finish(ChatMessage::model(reply));
        Ok(outcome)
    }

    /// No credential: record the exchange without ever going pending
    fn answer_without_credential(&self, text: &str) -> Result<TurnOutcome, SubmitError> {
        if self.store.is_pending() {
            return Err(SubmitError::Busy);
        }

        tracing::warn!("No API key configured; skipping model request");
        self.store.append(ChatMessage::user(text));
        self.store.append(ChatMessage::model(MISSING_API_KEY_MESSAGE));
        Ok(TurnOutcome::MissingCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ModelError;
    use crate::state::{ChatRole, HistoryEntry};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Returns queued results and records every request
    struct MockChatModel {
        responses: Mutex<VecDeque<Result<String, ModelError>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl MockChatModel {
        fn new() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn queue_reply(&self, text: &str) {
            self.responses.lock().unwrap().push_back(Ok(text.to_string()));
        }

        fn queue_error(&self, error: ModelError) {
            self.responses.lock().unwrap().push_back(Err(error));
        }

        fn recorded_requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for MockChatModel {
        async fn send_message(&self, request: &ChatRequest) -> Result<String, ModelError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ModelError::network("No mock response queued")))
        }

        fn model_id(&self) -> &str {
            "mock-model"
        }
    }

    /// Blocks every call until released
    struct GatedModel {
        release: Notify,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ChatModel for GatedModel {
        async fn send_message(&self, _request: &ChatRequest) -> Result<String, ModelError> {
            *self.calls.lock().unwrap() += 1;
            self.release.notified().await;
            Ok("released".to_string())
        }

        fn model_id(&self) -> &str {
            "gated-model"
        }
    }

    /// Never answers
    struct HangingModel;

    #[async_trait]
    impl ChatModel for HangingModel {
        async fn send_message(&self, _request: &ChatRequest) -> Result<String, ModelError> {
            std::future::pending().await
        }

        fn model_id(&self) -> &str {
            "hanging-model"
        }
    }

    fn controller_with(model: Arc<MockChatModel>) -> DialogueController {
        DialogueController::new(
            Arc::new(ConversationStore::new()),
            Some(model as Arc<dyn ChatModel>),
            AssistantSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_each_successful_submission_appends_two_messages() {
        let model = Arc::new(MockChatModel::new());
        let controller = controller_with(model.clone());

        for n in 1..=3 {
            model.queue_reply(&format!("reply {}", n));
            assert!(!controller.store().is_pending());

            let outcome = controller.submit(&format!("question {}", n)).await.unwrap();

            assert_eq!(outcome, TurnOutcome::Replied);
            assert_eq!(controller.store().len(), 2 * n);
            assert!(!controller.store().is_pending());
        }
    }

    #[tokio::test]
    async fn test_worked_example_history() {
        let model = Arc::new(MockChatModel::new());
        let controller = controller_with(model.clone());

        model.queue_reply("ENS is our Edge Node Service.");
        controller.submit("What is ENS?").await.unwrap();
        model.queue_reply("ESA is Edge Security Acceleration.");
        controller.submit("And ESA?").await.unwrap();

        let requests = model.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].history.is_empty());
        assert_eq!(requests[0].message, "What is ENS?");
        assert_eq!(
            requests[1].history,
            vec![
                HistoryEntry::from(&ChatMessage::user("What is ENS?")),
                HistoryEntry::from(&ChatMessage::model("ENS is our Edge Node Service.")),
            ]
        );
        assert_eq!(requests[1].message, "And ESA?");

        let messages = controller.store().snapshot().messages;
        assert_eq!(
            messages,
            vec![
                ChatMessage::user("What is ENS?"),
                ChatMessage::model("ENS is our Edge Node Service."),
                ChatMessage::user("And ESA?"),
                ChatMessage::model("ESA is Edge Security Acceleration."),
            ]
        );
    }

    #[tokio::test]
    async fn test_nth_history_has_all_prior_pairs() {
        let model = Arc::new(MockChatModel::new());
        let controller = controller_with(model.clone());

        for n in 0..4 {
            model.queue_reply("ok");
            controller.submit(&format!("q{}", n)).await.unwrap();
        }

        for (n, request) in model.recorded_requests().iter().enumerate() {
            assert_eq!(request.history.len(), 2 * n);
            assert!(request.history.iter().all(|h| h.text() != request.message));
            for (i, entry) in request.history.iter().enumerate() {
                let expected = if i % 2 == 0 { ChatRole::User } else { ChatRole::Model };
                assert_eq!(entry.role, expected);
            }
        }
    }

    #[tokio::test]
    async fn test_persona_and_budget_are_sent() {
        let model = Arc::new(MockChatModel::new());
        let settings = AssistantSettings {
            system_instruction: "custom persona".to_string(),
            thinking_budget: 1024,
            ..AssistantSettings::default()
        };
        let controller = DialogueController::new(
            Arc::new(ConversationStore::new()),
            Some(model.clone() as Arc<dyn ChatModel>),
            settings,
        );

        model.queue_reply("hi");
        controller.submit("hello").await.unwrap();

        let request = &model.recorded_requests()[0];
        assert_eq!(request.system_instruction, "custom persona");
        assert_eq!(request.thinking_budget, 1024);
    }

    #[tokio::test]
    async fn test_default_persona_names_catalog() {
        let settings = AssistantSettings::default();
        for product in ["ENS", "ESA", "CDN", "ENA"] {
            assert!(settings.system_instruction.contains(product));
        }
        assert_eq!(settings.thinking_budget, DEFAULT_THINKING_BUDGET);
    }

    #[tokio::test]
    async fn test_error_appends_fixed_message() {
        let model = Arc::new(MockChatModel::new());
        let controller = controller_with(model.clone());
        model.queue_error(ModelError::network("connection refused"));

        let outcome = controller.submit("hello").await.unwrap();

        assert_eq!(outcome, TurnOutcome::Failed);
        let snapshot = controller.store().snapshot();
        assert!(!snapshot.pending);
        let model_messages: Vec<_> = snapshot
            .messages
            .iter()
            .filter(|m| m.role == ChatRole::Model)
            .collect();
        assert_eq!(model_messages.len(), 1);
        assert_eq!(model_messages[0].text, REQUEST_FAILED_MESSAGE);
        assert!(!model_messages[0].text.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_empty_reply_uses_fallback() {
        let model = Arc::new(MockChatModel::new());
        let controller = controller_with(model.clone());
        model.queue_reply("");
        model.queue_reply("   \n");

        assert_eq!(controller.submit("one").await.unwrap(), TurnOutcome::EmptyReply);
        assert_eq!(controller.submit("two").await.unwrap(), TurnOutcome::EmptyReply);

        let messages = controller.store().snapshot().messages;
        assert_eq!(messages[1], ChatMessage::model(EMPTY_RESPONSE_MESSAGE));
        assert_eq!(messages[3], ChatMessage::model(EMPTY_RESPONSE_MESSAGE));
    }

    #[tokio::test]
    async fn test_missing_credential_skips_request() {
        let store = Arc::new(ConversationStore::new());
        let controller =
            DialogueController::new(store.clone(), None, AssistantSettings::default());
        let mut rx = store.subscribe();

        let outcome = controller.submit("hello").await.unwrap();

        assert_eq!(outcome, TurnOutcome::MissingCredential);
        assert!(!controller.has_model());
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert!(!snapshot.pending);
        assert_eq!(
            snapshot.messages,
            vec![
                ChatMessage::user("hello"),
                ChatMessage::model(MISSING_API_KEY_MESSAGE),
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_input_rejected() {
        let model = Arc::new(MockChatModel::new());
        let controller = controller_with(model.clone());

        assert_eq!(controller.submit("").await, Err(SubmitError::EmptyMessage));
        assert_eq!(controller.submit("  \t\n").await, Err(SubmitError::EmptyMessage));
        assert!(controller.store().is_empty());
        assert!(model.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_input_is_trimmed() {
        let model = Arc::new(MockChatModel::new());
        let controller = controller_with(model.clone());
        model.queue_reply("hi");

        controller.submit("  hello  ").await.unwrap();

        assert_eq!(model.recorded_requests()[0].message, "hello");
        assert_eq!(controller.store().snapshot().messages[0], ChatMessage::user("hello"));
    }

    #[tokio::test]
    async fn test_submit_while_pending_is_rejected() {
        let model = Arc::new(GatedModel {
            release: Notify::new(),
            calls: Mutex::new(0),
        });
        let store = Arc::new(ConversationStore::new());
        let controller = Arc::new(DialogueController::new(
            store.clone(),
            Some(model.clone() as Arc<dyn ChatModel>),
            AssistantSettings::default(),
        ));

        let mut rx = store.subscribe();
        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("first").await }
        });
        rx.wait_for(|s| s.pending).await.unwrap();

        assert_eq!(controller.submit("second").await, Err(SubmitError::Busy));
        assert_eq!(store.len(), 1);
        assert_eq!(*model.calls.lock().unwrap(), 1);

        model.release.notify_one();
        assert_eq!(first.await.unwrap(), Ok(TurnOutcome::Replied));
        assert!(!store.is_pending());
        assert_eq!(store.len(), 2);
        assert_eq!(*model.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_timeout_takes_failure_path() {
        let controller = DialogueController::new(
            Arc::new(ConversationStore::new()),
            Some(Arc::new(HangingModel) as Arc<dyn ChatModel>),
            AssistantSettings {
                request_timeout: Duration::from_millis(20),
                ..AssistantSettings::default()
            },
        );

        let outcome = controller.submit("hello").await.unwrap();

        assert_eq!(outcome, TurnOutcome::Failed);
        let snapshot = controller.store().snapshot();
        assert!(!snapshot.pending);
        assert_eq!(snapshot.messages[1], ChatMessage::model(REQUEST_FAILED_MESSAGE));
    }

    /// Counts overlapping calls and yields so other submissions can interleave
    struct CountingModel {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl ChatModel for CountingModel {
        async fn send_message(&self, _request: &ChatRequest) -> Result<String, ModelError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok("ok".to_string())
        }

        fn model_id(&self) -> &str {
            "counting-model"
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submissions_never_overlap() {
        let model = Arc::new(CountingModel {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let controller = Arc::new(DialogueController::new(
            Arc::new(ConversationStore::new()),
            Some(model.clone() as Arc<dyn ChatModel>),
            AssistantSettings::default(),
        ));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let controller = controller.clone();
                tokio::spawn(async move {
                    for _ in 0..2_000 {
                        let _ = controller.submit("x").await;
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(model.max_in_flight.load(Ordering::SeqCst), 1);
        let snapshot = controller.store().snapshot();
        assert!(!snapshot.pending);
        assert!(!snapshot.messages.is_empty());
        for (i, message) in snapshot.messages.iter().enumerate() {
            let expected = if i % 2 == 0 { ChatRole::User } else { ChatRole::Model };
            assert_eq!(message.role, expected, "message {} out of order", i);
        }
    }

    #[test]
    fn test_finished_guard_leaves_next_turn_pending() {
        let store = ConversationStore::new();
        store.begin_turn(ChatMessage::user("first")).unwrap();
        let guard = PendingGuard::new(&store);
        guard.finish(ChatMessage::model("done"));

        store.begin_turn(ChatMessage::user("second")).unwrap();
        assert!(store.is_pending());
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_dropped_turn_releases_pending() {
        let store = Arc::new(ConversationStore::new());
        let controller = DialogueController::new(
            store.clone(),
            Some(Arc::new(HangingModel) as Arc<dyn ChatModel>),
            AssistantSettings::default(),
        );

        let turn = controller.submit("hello");
        let _ = tokio::time::timeout(Duration::from_millis(20), turn).await;

        assert!(!store.is_pending());
        assert_eq!(store.len(), 1);
    }
}
