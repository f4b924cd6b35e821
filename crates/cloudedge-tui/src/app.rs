use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use ratatui::widgets::ListState;
use cloudedge_core::{
    build_model, AssistantSettings, Config, ConversationSnapshot, ConversationStore,
    Calculator, DialogueController, PriceCalculator, Provider, ResolvedConfig, SubmitError, Tool,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Tool(Tool),
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Home state
    pub tool_state: ListState,

    // Tool state, shared by both calculators for the session
    pub calculator: PriceCalculator,

    // Assistant state
    pub chat_input: String,
    pub chat_cursor: usize, // cursor position in chat_input (chars)
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub show_busy_hint: bool,
    pub submitting: Arc<AtomicBool>, // spawned submission not yet returned
    pub conversation: ConversationSnapshot,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Provider state
    pub provider: Provider,
    pub model: String,

    // Data
    pub store: Arc<ConversationStore>,
    pub controller: Arc<DialogueController>,
}

impl App {
    pub fn new(resolved: ResolvedConfig) -> Self {
        let store = Arc::new(ConversationStore::new());
        let controller = Arc::new(build_controller(store.clone(), &resolved));

        let mut tool_state = ListState::default();
        tool_state.select(Some(0));

        Self {
            should_quit: false,
            screen: Screen::Home,
            input_mode: InputMode::Normal,

            tool_state,

            calculator: PriceCalculator::new(Calculator::Ens),

            chat_input: String::new(),
            chat_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            show_busy_hint: false,
            submitting: Arc::new(AtomicBool::new(false)),
            conversation: ConversationSnapshot::default(),

            animation_frame: 0,

            provider: resolved.provider,
            model: resolved.model,

            store,
            controller,
        }
    }

    // Navigation
    pub fn selected_tool(&self) -> Option<Tool> {
        self.tool_state.selected().and_then(|i| Tool::all().get(i).copied())
    }

    pub fn tool_nav_down(&mut self) {
        let len = Tool::all().len();
        let i = self.tool_state.selected().unwrap_or(0);
        self.tool_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn tool_nav_up(&mut self) {
        let i = self.tool_state.selected().unwrap_or(0);
        self.tool_state.select(Some(i.saturating_sub(1)));
    }

    pub fn open_tool(&mut self, tool: Tool) {
        if let Some(kind) = tool.calculator() {
            self.calculator.kind = kind;
        }
        self.screen = Screen::Tool(tool);
        self.input_mode = InputMode::Normal;
    }

    pub fn open_assistant(&mut self) {
        self.screen = Screen::Assistant;
        self.input_mode = InputMode::Editing;
        self.sync_conversation();
    }

    pub fn go_home(&mut self) {
        self.screen = Screen::Home;
        self.input_mode = InputMode::Normal;
    }

    /// Pull a fresh snapshot from the store and follow new messages
    pub fn sync_conversation(&mut self) {
        let snapshot = self.store.snapshot();
        let changed = snapshot.messages.len() != self.conversation.messages.len()
            || snapshot.pending != self.conversation.pending;
        if !snapshot.pending {
            self.show_busy_hint = false;
        }
        self.conversation = snapshot;
        if changed {
            self.scroll_chat_to_bottom();
        }
    }

    /// Send the input box to the assistant. While a reply is pending the
    /// input stays in the box and a hint is shown instead.
    pub fn submit_chat(&mut self) {
        let text = self.chat_input.trim().to_string();
        if text.is_empty() {
            return;
        }
        // The store only turns pending once the spawned task reaches the
        // controller, so a submission in between also counts as busy
        if self.store.is_pending() || self.submitting.swap(true, Ordering::SeqCst) {
            self.show_busy_hint = true;
            return;
        }

        self.chat_input.clear();
        self.chat_cursor = 0;
        self.show_busy_hint = false;

        let controller = self.controller.clone();
        let submitting = self.submitting.clone();
        tokio::spawn(async move {
            let result = controller.submit(&text).await;
            submitting.store(false, Ordering::SeqCst);
            match result {
                Ok(outcome) => tracing::debug!(?outcome, "Assistant turn finished"),
                Err(SubmitError::Busy) => tracing::warn!("Dropped submission while assistant was busy"),
                Err(e) => tracing::debug!(error = %e, "Submission rejected"),
            }
        });
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.pending || self.screen == Screen::Tool(Tool::SpeedTest) {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_chat_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Scroll chat to bottom so the newest message (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.conversation.messages {
            total_lines = total_lines.saturating_add(1); // Role line ("You:" or "AI:")
            for line in msg.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                let wrapped = if char_count == 0 { 1 } else { char_count / wrap_width + 1 };
                total_lines = total_lines.saturating_add(wrapped as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.conversation.pending {
            total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    // Calculator actions
    pub fn calculator_increment(&mut self) {
        self.calculator.increment();
    }

    pub fn calculator_decrement(&mut self) {
        self.calculator.decrement();
    }

    pub fn calculator_cycle_region(&mut self) {
        self.calculator.cycle_region();
    }

    // Provider / model switching
    pub fn cycle_model(&mut self) {
        let models = self.provider.models();
        let idx = models.iter().position(|m| *m == self.model).map_or(0, |i| (i + 1) % models.len());
        if let Some(model) = models.get(idx) {
            self.model = model.clone();
            if let Err(e) = Config::save_default_model(&self.model) {
                tracing::warn!(error = %e, "Failed to save default model");
            }
            self.rebuild_controller();
        }
    }

    pub fn cycle_provider(&mut self) {
        let provider = self.provider.next();
        if let Err(e) = Config::save_provider(provider) {
            tracing::warn!(error = %e, "Failed to save provider");
        }
        let config = Config::load().unwrap_or_else(|_| Config::new());
        let resolved = config.resolve_for(provider);
        self.provider = resolved.provider;
        self.model = resolved.model;
        self.rebuild_controller();
    }

    pub fn has_api_key(&self) -> bool {
        self.controller.has_model()
    }

    /// Swap the model service; the conversation store is kept
    fn rebuild_controller(&mut self) {
        let config = Config::load().unwrap_or_else(|_| Config::new());
        let mut resolved = config.resolve_for(self.provider);
        resolved.model = self.model.clone();
        self.controller = Arc::new(build_controller(self.store.clone(), &resolved));
        tracing::info!(
            provider = self.provider.as_str(),
            model = %self.model,
            has_key = self.controller.has_model(),
            "Switched assistant model"
        );
    }
}

fn build_controller(store: Arc<ConversationStore>, resolved: &ResolvedConfig) -> DialogueController {
    let model = resolved
        .api_key
        .as_deref()
        .map(|key| build_model(resolved.provider, key, &resolved.model));
    DialogueController::new(store, model, AssistantSettings::default())
}
