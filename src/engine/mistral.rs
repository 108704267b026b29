//! Production engine backed by `mistralrs`.
//!
//! Loads a GGUF model once at construction and serves completion requests
//! over it. The model handle is shared via `Arc`; mistralrs schedules up
//! to the configured number of concurrent sequences internally.

use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use mistralrs::{
    GgufModelBuilder, MemoryGpuConfig, Model, PagedAttentionMetaBuilder, RequestBuilder,
    Response, TextMessageRole, TokenSource,
};
use tracing::{debug, info};

use crate::engine::{
    ChunkChoice, CompletionChunk, CompletionChunkStream, CompletionEngine, CompletionRequest,
    CompletionResponse, EngineConfig, Message, ModelSource, RequestInput, ResponseChoice, Role,
};
use crate::error::{AdapterError, Result};

/// A [`CompletionEngine`] over an in-process `mistralrs` model.
pub struct MistralRsEngine {
    model: Arc<Model>,
}

impl std::fmt::Debug for MistralRsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralRsEngine").finish_non_exhaustive()
    }
}

impl MistralRsEngine {
    /// Load the model described by `config`.
    ///
    /// Downloads the GGUF file (if not cached), then loads it onto the best
    /// available device. Paged attention is sized from `context_window`.
    ///
    /// # Errors
    ///
    /// Returns an error when the token source is unparseable or model
    /// loading fails.
    pub async fn load(config: &EngineConfig, context_window: usize) -> Result<Self> {
        let ModelSource::Gguf {
            model_id,
            files,
            tok_model_id,
        } = &config.model;

        info!("loading local model: {model_id} ({} file(s))", files.len());

        let token_source = config
            .token_source
            .parse::<TokenSource>()
            .map_err(|e| {
                AdapterError::Config(format!(
                    "invalid token source {:?}: {e}",
                    config.token_source
                ))
            })?;

        let mut builder = GgufModelBuilder::new(model_id, files.clone())
            .with_token_source(token_source)
            .with_max_num_seqs(config.max_seqs)
            .with_prefix_cache_n(Some(config.prefix_cache_n))
            .with_logging();

        if let Some(tok) = tok_model_id {
            builder = builder.with_tok_model_id(tok);
        }
        if let Some(template) = &config.chat_template {
            builder = builder.with_chat_template(template);
        }
        if config.no_kv_cache {
            builder = builder.with_no_kv_cache();
        }

        info!("local model context window: {context_window} tokens");

        let model = builder
            .with_paged_attn(|| {
                PagedAttentionMetaBuilder::default()
                    .with_gpu_memory(MemoryGpuConfig::ContextSize(context_window))
                    .build()
            })
            .map_err(|e| AdapterError::Engine(format!("paged attention config failed: {e}")))?
            .build()
            .await
            .map_err(|e| AdapterError::Engine(format!("model build failed: {e}")))?;

        info!("local model loaded");
        Ok(Self {
            model: Arc::new(model),
        })
    }

    /// Wrap an already-loaded model handle.
    pub fn from_model(model: Arc<Model>) -> Self {
        Self { model }
    }

    fn to_engine_request(request: &CompletionRequest) -> RequestBuilder {
        let mut builder = RequestBuilder::new();

        match &request.input {
            RequestInput::Messages(messages) => {
                debug!("building engine request with {} messages", messages.len());
                for msg in messages {
                    builder = builder.add_message(map_text_role(msg.role), &msg.content);
                }
            }
            RequestInput::Prompt(prompt) => {
                // The high-level API has no raw-completion entry point; the
                // chat template wraps a bare prompt as a single user turn.
                debug!("building engine request from raw prompt ({} chars)", prompt.len());
                builder = builder.add_message(TextMessageRole::User, prompt);
            }
        }

        builder
            .set_sampler_temperature(request.params.temperature)
            .set_sampler_topk(request.params.top_k)
            .set_sampler_topp(request.params.top_p)
            .set_sampler_max_len(request.params.max_tokens)
    }
}

fn map_text_role(role: Role) -> TextMessageRole {
    match role {
        Role::System => TextMessageRole::System,
        Role::User => TextMessageRole::User,
        Role::Assistant => TextMessageRole::Assistant,
    }
}

#[async_trait]
impl CompletionEngine for MistralRsEngine {
    async fn send_completion_request(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse> {
        let engine_request = Self::to_engine_request(&request);
        let response = self
            .model
            .send_chat_request(engine_request)
            .await
            .map_err(|e| AdapterError::Engine(format!("chat request failed: {e}")))?;

        let choices = response
            .choices
            .iter()
            .map(|choice| ResponseChoice {
                message: Message::new(
                    Role::Assistant,
                    choice.message.content.clone().unwrap_or_default(),
                ),
                finish_reason: Some(choice.finish_reason.clone()),
            })
            .collect();

        Ok(CompletionResponse { choices })
    }

    async fn stream_completion_request(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionChunkStream> {
        let engine_request = Self::to_engine_request(&request);

        // The mistralrs stream borrows the model handle, so the Arc moves
        // into the generator and both live for as long as the caller keeps
        // polling. Dropping the stream drops both.
        let model = Arc::clone(&self.model);
        let chunks = stream! {
            let mut inner = match model.stream_chat_request(engine_request).await {
                Ok(s) => s,
                Err(e) => {
                    yield Err(AdapterError::Engine(format!("stream request failed: {e}")));
                    return;
                }
            };

            while let Some(response) = inner.next().await {
                match response {
                    Response::Chunk(chunk) => {
                        let choices = chunk
                            .choices
                            .iter()
                            .map(|choice| ChunkChoice {
                                delta: choice.delta.content.clone().unwrap_or_default(),
                                finish_reason: choice.finish_reason.clone(),
                            })
                            .collect();
                        yield Ok(CompletionChunk { choices });
                    }
                    Response::Done(_) => break,
                    Response::ModelError(msg, _) => {
                        yield Err(AdapterError::Engine(msg));
                        break;
                    }
                    Response::InternalError(e) => {
                        yield Err(AdapterError::Engine(e.to_string()));
                        break;
                    }
                    Response::ValidationError(e) => {
                        yield Err(AdapterError::Engine(e.to_string()));
                        break;
                    }
                    _ => continue,
                }
            }
        };

        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_map_one_to_one() {
        assert!(matches!(map_text_role(Role::System), TextMessageRole::System));
        assert!(matches!(map_text_role(Role::User), TextMessageRole::User));
        assert!(matches!(
            map_text_role(Role::Assistant),
            TextMessageRole::Assistant
        ));
    }
}
