//! Engine boundary: the provider-side protocol and the trait behind which
//! the inference engine sits.
//!
//! The adapter never talks to `mistralrs` directly; it builds
//! [`CompletionRequest`] values and hands them to a [`CompletionEngine`].
//! The production implementation lives in [`mistral`]; tests substitute
//! scripted in-memory engines.

pub mod mistral;

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::params::GenerationParams;

/// Default token source policy for model downloads.
pub const DEFAULT_TOKEN_SOURCE: &str = "cache";
/// Default maximum number of concurrently scheduled sequences.
pub const DEFAULT_MAX_SEQS: usize = 16;
/// Default prefix-cache size, in sequences.
pub const DEFAULT_PREFIX_CACHE_N: usize = 16;

/// Role of a message in the engine protocol.
///
/// Narrower than [`MessageRole`](crate::message::MessageRole): the engine
/// accepts exactly these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in the engine protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored this turn.
    pub role: Role,
    /// The text content of the turn.
    pub content: String,
}

impl Message {
    /// Create an engine message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// The input half of a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestInput {
    /// An ordered conversation.
    Messages(Vec<Message>),
    /// A pre-formatted raw prompt.
    Prompt(String),
}

/// A provider-protocol completion request.
///
/// Built fresh for every call by [`build_request`](crate::request::build_request);
/// never cached or reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Conversation or raw prompt.
    pub input: RequestInput,
    /// Model identifier; the in-process engine ignores it beyond logging.
    pub model: String,
    /// Per-token logit biases. The adapter never sets these.
    pub logit_bias: Option<HashMap<u32, f32>>,
    /// Whether to request logprob tensors. The adapter never sets this.
    pub logprobs: bool,
    /// Fully-merged generation parameters.
    pub params: GenerationParams,
}

/// One choice in a non-streaming engine response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseChoice {
    /// The generated message.
    pub message: Message,
    /// Why generation stopped, when the engine reports it.
    pub finish_reason: Option<String>,
}

/// A non-streaming engine response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated choices. The local engine produces at most one.
    pub choices: Vec<ResponseChoice>,
}

/// One choice in a streaming chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// The text fragment added by this chunk.
    pub delta: String,
    /// Why generation stopped, present on the final chunk.
    pub finish_reason: Option<String>,
}

/// A streaming engine chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionChunk {
    /// Chunk choices. May be empty on engine heartbeats.
    pub choices: Vec<ChunkChoice>,
}

/// A boxed stream of engine chunks.
///
/// Lazy and pull-driven; dropping it abandons the call.
pub type CompletionChunkStream =
    Pin<Box<dyn Stream<Item = Result<CompletionChunk>> + Send>>;

/// Trait for completion engines.
///
/// Implementations own whatever handle the backend needs and accept
/// concurrent calls (`&self`); the production engine schedules up to
/// its configured `max_seqs` sequences.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    /// Execute a request and return the complete response.
    async fn send_completion_request(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse>;

    /// Execute a request and return a lazy chunk stream.
    async fn stream_completion_request(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionChunkStream>;
}

/// Where the engine's model weights come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    /// A GGUF model pulled from the hub (or its local cache).
    Gguf {
        /// Hub model ID (e.g. `"Qwen/Qwen3-4B-GGUF"`).
        model_id: String,
        /// GGUF file names within the repo.
        files: Vec<String>,
        /// Separate tokenizer model ID, when the GGUF repo lacks one.
        tok_model_id: Option<String>,
    },
}

/// Configuration for constructing the production engine.
///
/// # Examples
///
/// ```
/// use mistralrs_adapter::engine::{EngineConfig, ModelSource};
///
/// let config = EngineConfig::new(ModelSource::Gguf {
///     model_id: "Qwen/Qwen3-4B-GGUF".into(),
///     files: vec!["Qwen3-4B-Q4_K_M.gguf".into()],
///     tok_model_id: None,
/// })
/// .with_max_seqs(8);
/// assert_eq!(config.max_seqs, 8);
/// assert_eq!(config.token_source, "cache");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model selection descriptor.
    pub model: ModelSource,
    /// Token source policy for hub access.
    pub token_source: String,
    /// Maximum concurrently scheduled sequences.
    pub max_seqs: usize,
    /// Prefix-cache size, in sequences.
    pub prefix_cache_n: usize,
    /// Disable the KV cache entirely.
    pub no_kv_cache: bool,
    /// Override chat template, as a Jinja file path or literal.
    pub chat_template: Option<String>,
}

impl EngineConfig {
    /// Create a config with the standard knob defaults.
    pub fn new(model: ModelSource) -> Self {
        Self {
            model,
            token_source: DEFAULT_TOKEN_SOURCE.to_owned(),
            max_seqs: DEFAULT_MAX_SEQS,
            prefix_cache_n: DEFAULT_PREFIX_CACHE_N,
            no_kv_cache: false,
            chat_template: None,
        }
    }

    /// Set the token source policy.
    pub fn with_token_source(mut self, token_source: impl Into<String>) -> Self {
        self.token_source = token_source.into();
        self
    }

    /// Set the maximum number of concurrent sequences.
    pub fn with_max_seqs(mut self, max_seqs: usize) -> Self {
        self.max_seqs = max_seqs;
        self
    }

    /// Set the prefix-cache size.
    pub fn with_prefix_cache_n(mut self, prefix_cache_n: usize) -> Self {
        self.prefix_cache_n = prefix_cache_n;
        self
    }

    /// Disable the KV cache.
    pub fn with_no_kv_cache(mut self, no_kv_cache: bool) -> Self {
        self.no_kv_cache = no_kv_cache;
        self
    }

    /// Override the chat template.
    pub fn with_chat_template(mut self, chat_template: impl Into<String>) -> Self {
        self.chat_template = Some(chat_template.into());
        self
    }
}
