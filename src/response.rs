//! Non-streaming response normalization.

use serde::{Deserialize, Serialize};

use crate::engine::CompletionResponse;
use crate::error::{AdapterError, Result};

/// The generic non-streaming completion result.
///
/// Both chat and raw-prompt calls resolve to this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// The full generated text.
    pub text: String,
}

impl Completion {
    /// Create a completion from generated text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Normalize an engine response into a [`Completion`].
///
/// Takes the first choice's message content. A response with zero choices
/// is a typed error; it is never collapsed into an empty-string success.
pub fn normalize(response: CompletionResponse) -> Result<Completion> {
    match response.choices.into_iter().next() {
        Some(choice) => Ok(Completion::new(choice.message.content)),
        None => Err(AdapterError::EmptyResponse(
            "engine returned a response with no choices".to_owned(),
        )),
    }
}
