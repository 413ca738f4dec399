//! UI-agnostic chat state types
//!
//! These are shared by every front end and persisted as-is, so the serde
//! shape (`{"text": ..., "sender": "user"|"bot"}`) is part of the history format.

use serde::{Deserialize, Serialize};

/// A single line in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
}

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}
