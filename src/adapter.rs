//! Adapter facade: the public chat/completion surface over a
//! [`CompletionEngine`].
//!
//! Call flow for every entry point: translate (or format) the input, merge
//! generation parameters, build a fresh request, hand it to the engine, and
//! normalize the result. Streaming variants return a lazy [`DeltaStream`];
//! non-streaming variants resolve to a [`Completion`].

use std::sync::Arc;

use tracing::debug;

use crate::engine::{CompletionEngine, RequestInput};
use crate::error::{AdapterError, Result};
use crate::events::{DeltaStream, accumulate};
use crate::message::{ChatMessage, MessageRole};
use crate::metadata::LlmMetadata;
use crate::params::{DEFAULT_MAX_NEW_TOKENS, GenerationParams, ParamOverrides};
use crate::request::build_request;
use crate::response::{Completion, normalize};
use crate::translate::translate_messages;

/// Default context window, in tokens.
pub const DEFAULT_CONTEXT_WINDOW: usize = 3900;

/// Caller-supplied conversation formatter.
///
/// When configured, chat paths hand the whole conversation to this closure
/// and submit its output as a raw prompt instead of translating messages.
pub type MessagesToPrompt = Arc<dyn Fn(&[ChatMessage]) -> String + Send + Sync>;

/// Caller-supplied raw-prompt formatter.
///
/// Applied exactly once to unformatted completion prompts.
pub type CompletionToPrompt = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Builder for [`MistralRsAdapter`].
///
/// # Examples
///
/// ```no_run
/// use mistralrs_adapter::adapter::AdapterBuilder;
/// use mistralrs_adapter::params::ParamOverrides;
///
/// # fn engine() -> Box<dyn mistralrs_adapter::engine::CompletionEngine> { unimplemented!() }
/// let adapter = AdapterBuilder::new()
///     .with_context_window(8192)
///     .with_max_new_tokens(512)
///     .with_system_prompt("You are a helpful assistant.")
///     .with_overrides(ParamOverrides::new().with_temperature(0.7))
///     .build(engine());
/// ```
pub struct AdapterBuilder {
    context_window: usize,
    max_new_tokens: usize,
    system_prompt: Option<String>,
    messages_to_prompt: Option<MessagesToPrompt>,
    completion_to_prompt: Option<CompletionToPrompt>,
    overrides: ParamOverrides,
}

impl Default for AdapterBuilder {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            system_prompt: None,
            messages_to_prompt: None,
            completion_to_prompt: None,
            overrides: ParamOverrides::new(),
        }
    }
}

impl AdapterBuilder {
    /// Create a builder with the standard defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the context window, in tokens.
    pub fn with_context_window(mut self, context_window: usize) -> Self {
        self.context_window = context_window;
        self
    }

    /// Set the per-call generation budget, in tokens.
    pub fn with_max_new_tokens(mut self, max_new_tokens: usize) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    /// Seed chat conversations with a system prompt.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Route chat conversations through a caller-supplied formatter.
    pub fn with_messages_to_prompt(
        mut self,
        formatter: impl Fn(&[ChatMessage]) -> String + Send + Sync + 'static,
    ) -> Self {
        self.messages_to_prompt = Some(Arc::new(formatter));
        self
    }

    /// Route unformatted completion prompts through a caller-supplied
    /// formatter.
    pub fn with_completion_to_prompt(
        mut self,
        formatter: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.completion_to_prompt = Some(Arc::new(formatter));
        self
    }

    /// Set constructor-layer generation overrides.
    pub fn with_overrides(mut self, overrides: ParamOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Build the adapter over the given engine.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `context_window` or
    /// `max_new_tokens` is zero.
    pub fn build(self, engine: Box<dyn CompletionEngine>) -> Result<MistralRsAdapter> {
        if self.context_window == 0 {
            return Err(AdapterError::Config(
                "context_window must be positive".to_owned(),
            ));
        }
        if self.max_new_tokens == 0 {
            return Err(AdapterError::Config(
                "max_new_tokens must be positive".to_owned(),
            ));
        }
        Ok(MistralRsAdapter {
            engine,
            context_window: self.context_window,
            max_new_tokens: self.max_new_tokens,
            system_prompt: self.system_prompt,
            messages_to_prompt: self.messages_to_prompt,
            completion_to_prompt: self.completion_to_prompt,
            overrides: self.overrides,
        })
    }
}

/// The adapter: a uniform chat/completion surface over a local engine.
///
/// Owns its engine handle exclusively. All methods take `&self` and build
/// fresh per-call state, so concurrent calls never share parameters or
/// requests; how many requests run at once is the engine's scheduling
/// decision.
pub struct MistralRsAdapter {
    engine: Box<dyn CompletionEngine>,
    context_window: usize,
    max_new_tokens: usize,
    system_prompt: Option<String>,
    messages_to_prompt: Option<MessagesToPrompt>,
    completion_to_prompt: Option<CompletionToPrompt>,
    overrides: ParamOverrides,
}

impl std::fmt::Debug for MistralRsAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralRsAdapter")
            .field("context_window", &self.context_window)
            .field("max_new_tokens", &self.max_new_tokens)
            .field("system_prompt", &self.system_prompt)
            .field("overrides", &self.overrides)
            .finish()
    }
}

impl MistralRsAdapter {
    /// Capability snapshot for orchestration-side token budgeting.
    pub fn metadata(&self) -> LlmMetadata {
        LlmMetadata::new(self.context_window, self.max_new_tokens)
    }

    /// Run a chat conversation to completion.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        opts: &ParamOverrides,
    ) -> Result<Completion> {
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(
            request_id = %request_id,
            messages = messages.len(),
            "chat request"
        );

        let input = self.chat_input(messages)?;
        let params = self.merged_params(opts, false);
        let response = self
            .engine
            .send_completion_request(build_request(input, params))
            .await?;
        let completion = normalize(response)?;

        debug!(
            request_id = %request_id,
            chars = completion.text.len(),
            "chat response complete"
        );
        Ok(completion)
    }

    /// Run a chat conversation, streaming delta events.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        opts: &ParamOverrides,
    ) -> Result<DeltaStream> {
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(
            request_id = %request_id,
            messages = messages.len(),
            "stream_chat request"
        );

        let input = self.chat_input(messages)?;
        let params = self.merged_params(opts, true);
        let chunks = self
            .engine
            .stream_completion_request(build_request(input, params))
            .await?;
        Ok(accumulate(chunks))
    }

    /// Run a raw prompt to completion.
    ///
    /// `formatted == false` routes the prompt through the configured
    /// completion formatter exactly once; with no formatter it passes
    /// through unchanged. `formatted == true` bypasses the formatter.
    pub async fn complete(
        &self,
        prompt: &str,
        formatted: bool,
        opts: &ParamOverrides,
    ) -> Result<Completion> {
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(
            request_id = %request_id,
            formatted,
            chars = prompt.len(),
            "complete request"
        );

        let input = RequestInput::Prompt(self.completion_prompt(prompt, formatted));
        let params = self.merged_params(opts, false);
        let response = self
            .engine
            .send_completion_request(build_request(input, params))
            .await?;
        let completion = normalize(response)?;

        debug!(
            request_id = %request_id,
            chars = completion.text.len(),
            "complete response"
        );
        Ok(completion)
    }

    /// Run a raw prompt, streaming delta events.
    ///
    /// Formatter routing matches [`complete`](Self::complete).
    pub async fn stream_complete(
        &self,
        prompt: &str,
        formatted: bool,
        opts: &ParamOverrides,
    ) -> Result<DeltaStream> {
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(
            request_id = %request_id,
            formatted,
            chars = prompt.len(),
            "stream_complete request"
        );

        let input = RequestInput::Prompt(self.completion_prompt(prompt, formatted));
        let params = self.merged_params(opts, true);
        let chunks = self
            .engine
            .stream_completion_request(build_request(input, params))
            .await?;
        Ok(accumulate(chunks))
    }

    fn merged_params(&self, call: &ParamOverrides, stream: bool) -> GenerationParams {
        let defaults = GenerationParams::defaults(self.max_new_tokens);
        GenerationParams::merged(&defaults, &self.overrides, call).with_stream(stream)
    }

    fn chat_input(&self, messages: &[ChatMessage]) -> Result<RequestInput> {
        let seeded = self.seeded(messages);
        match &self.messages_to_prompt {
            Some(formatter) => Ok(RequestInput::Prompt(formatter(&seeded))),
            None => Ok(RequestInput::Messages(translate_messages(&seeded)?)),
        }
    }

    /// Prepend the configured system prompt unless the conversation already
    /// opens with a system message.
    fn seeded(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        match &self.system_prompt {
            Some(prompt)
                if messages
                    .first()
                    .is_none_or(|m| m.role != MessageRole::System) =>
            {
                let mut seeded = Vec::with_capacity(messages.len() + 1);
                seeded.push(ChatMessage::system(prompt));
                seeded.extend_from_slice(messages);
                seeded
            }
            _ => messages.to_vec(),
        }
    }

    fn completion_prompt(&self, prompt: &str, formatted: bool) -> String {
        if formatted {
            return prompt.to_owned();
        }
        match &self.completion_to_prompt {
            Some(formatter) => formatter(prompt),
            None => prompt.to_owned(),
        }
    }
}
