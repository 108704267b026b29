//! Generic chat protocol messages.
//!
//! [`ChatMessage`] is the orchestration-side message shape: a role tag plus
//! text content. The role enum is deliberately wider than what the engine
//! accepts; translation rejects the extra roles rather than dropping them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a chat message in the generic protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
    /// Tool invocation result (not accepted by the local engine).
    Tool,
    /// Legacy function-call result (not accepted by the local engine).
    Function,
}

impl MessageRole {
    /// The lowercase protocol tag for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Function => "function",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in a generic chat conversation.
///
/// # Examples
///
/// ```
/// use mistralrs_adapter::message::{ChatMessage, MessageRole};
///
/// let msg = ChatMessage::user("hello");
/// assert_eq!(msg.role, MessageRole::User);
/// assert_eq!(msg.content, "hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored this turn.
    pub role: MessageRole,
    /// The text content of the turn.
    pub content: String,
}

impl ChatMessage {
    /// Create a message with an explicit role.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}
