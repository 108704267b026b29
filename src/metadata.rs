//! Capability metadata reported by the adapter.

use serde::{Deserialize, Serialize};

/// Placeholder model identifier for the in-process engine.
///
/// The engine loads exactly one model; the protocol still carries a model
/// field, so the adapter reports this fixed tag.
pub const LOCAL_MODEL_ID: &str = "local";

/// Capability snapshot of the adapter.
///
/// Orchestration layers use this to budget prompt and output tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmMetadata {
    /// Total context window, in tokens.
    pub context_window: usize,
    /// Maximum tokens generated per call.
    pub max_output_tokens: usize,
    /// The adapter-internal model identifier.
    pub model_id: String,
}

impl LlmMetadata {
    /// Create a metadata snapshot for the local engine.
    pub fn new(context_window: usize, max_output_tokens: usize) -> Self {
        Self {
            context_window,
            max_output_tokens,
            model_id: LOCAL_MODEL_ID.to_owned(),
        }
    }
}
