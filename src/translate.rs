//! Role and message translation from the generic protocol to the engine
//! protocol.
//!
//! Translation is strict: order is preserved, nothing is dropped or
//! coerced, and any role the engine cannot accept fails the whole call.

use crate::engine;
use crate::error::{AdapterError, Result};
use crate::message::{ChatMessage, MessageRole};

/// Map a generic role to an engine role.
///
/// Roles outside {system, user, assistant} fail with
/// [`AdapterError::UnsupportedRole`].
pub fn map_role(role: MessageRole) -> Result<engine::Role> {
    match role {
        MessageRole::System => Ok(engine::Role::System),
        MessageRole::User => Ok(engine::Role::User),
        MessageRole::Assistant => Ok(engine::Role::Assistant),
        MessageRole::Tool | MessageRole::Function => Err(AdapterError::UnsupportedRole {
            role: role.as_str().to_owned(),
        }),
    }
}

/// Translate an ordered conversation into engine messages.
///
/// Pure: no truncation, dedup, or reordering. An empty conversation
/// translates to an empty message list; whether that is acceptable is the
/// engine's decision.
pub fn translate_messages(messages: &[ChatMessage]) -> Result<Vec<engine::Message>> {
    messages
        .iter()
        .map(|msg| Ok(engine::Message::new(map_role(msg.role)?, &msg.content)))
        .collect()
}
