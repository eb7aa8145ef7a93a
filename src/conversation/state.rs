use serde::{Deserialize, Serialize};

use super::persona::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The message log of one session plus the active mode.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    mode: Mode,
}

impl ConversationState {
    pub fn new(mode: Mode) -> Self {
        Self {
            messages: Vec::new(),
            mode,
        }
    }

    pub fn add_user_message(&mut self, message: &str) {
        self.messages.push(Message::user(message));
    }

    pub fn add_assistant_message(&mut self, message: &str) {
        self.messages.push(Message::assistant(message));
    }

    pub fn get_messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch mode; the log always starts over.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.messages.clear();
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
