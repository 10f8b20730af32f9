//! A session is the shared context between a human and the AI assistant:
//! the ordered conversation history and the active mode.
use crate::{
    completion::{ChatMessage, SenderType},
    mode::Mode,
};

/// In-memory chat session. History is append-only within a session,
/// cleared explicitly, and never persisted across sessions.
pub struct Session {
    messages: Vec<ChatMessage>,
    mode: Mode,
}

impl Session {
    pub fn new(mode: Mode) -> Self {
        Self {
            messages: Vec::new(),
            mode,
        }
    }

    /// Add a new message to the conversation history
    pub fn add_message(&mut self, sender: SenderType, text: &str) {
        self.messages.push(ChatMessage::new(sender, text));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Clear the conversation history
    pub fn clear_history(&mut self) {
        self.messages.clear();
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// The message sequence to send to a provider: the mode's system prompt
    /// followed by the conversation history.
    pub fn conversation(&self) -> Vec<ChatMessage> {
        let mut messages =
            vec![ChatMessage::new(SenderType::System, self.mode.system_prompt())];
        messages.extend(self.messages.iter().cloned());
        messages
    }
}
