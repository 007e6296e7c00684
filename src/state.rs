//! Conversation data shared by the TUI, the exporter and the one-shot CLI.

use serde::{Deserialize, Serialize};

/// A citation returned alongside a grounded answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

/// The role of a turn in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Model,
}

/// One turn of the conversation. Turns are appended, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistoryItem {
    pub role: ChatRole,
    pub text: String,
    pub is_error: bool,
    pub sources: Vec<Source>,
}

impl ChatHistoryItem {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            is_error: false,
            sources: Vec::new(),
        }
    }

    pub fn model(text: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
            is_error: false,
            sources,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: message.into(),
            is_error: true,
            sources: Vec::new(),
        }
    }
}
