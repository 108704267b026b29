//! Adapter Contract Tests
//!
//! Drive the full adapter surface against a scripted in-memory engine that
//! records every request it receives. These tests pin down translation,
//! parameter layering, request shape, normalization, and streaming
//! behavior end-to-end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::StreamExt;

use mistralrs_adapter::adapter::AdapterBuilder;
use mistralrs_adapter::engine::{
    ChunkChoice, CompletionChunk, CompletionChunkStream, CompletionEngine, CompletionRequest,
    CompletionResponse, Message, RequestInput, ResponseChoice, Role,
};
use mistralrs_adapter::error::AdapterError;
use mistralrs_adapter::message::{ChatMessage, MessageRole};
use mistralrs_adapter::params::{
    DEFAULT_TEMPERATURE, DEFAULT_TOP_K, DEFAULT_TOP_P, ParamOverrides,
};

// ────────────────────────────────────────────────────────────────────────────
// Scripted engine
// ────────────────────────────────────────────────────────────────────────────

/// In-memory engine that records every request and replays a script.
#[derive(Clone)]
struct ScriptedEngine {
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Reply text for non-streaming calls; `None` replays a zero-choice
    /// response.
    reply: Option<String>,
    /// Delta fragments for streaming calls.
    deltas: Vec<String>,
    /// Engine failure injected after the scripted deltas.
    stream_error: Option<String>,
}

impl ScriptedEngine {
    fn replying(reply: &str) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            reply: Some(reply.to_owned()),
            deltas: Vec::new(),
            stream_error: None,
        }
    }

    fn empty_response() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            reply: None,
            deltas: Vec::new(),
            stream_error: None,
        }
    }

    fn streaming(deltas: &[&str]) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            reply: Some(String::new()),
            deltas: deltas.iter().map(|d| (*d).to_owned()).collect(),
            stream_error: None,
        }
    }

    fn failing_stream(deltas: &[&str], error: &str) -> Self {
        Self {
            stream_error: Some(error.to_owned()),
            ..Self::streaming(deltas)
        }
    }

    fn recorded(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, request: &CompletionRequest) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
    }
}

#[async_trait]
impl CompletionEngine for ScriptedEngine {
    async fn send_completion_request(
        &self,
        request: CompletionRequest,
    ) -> mistralrs_adapter::Result<CompletionResponse> {
        self.record(&request);
        let choices = match &self.reply {
            Some(text) => vec![ResponseChoice {
                message: Message::new(Role::Assistant, text),
                finish_reason: Some("stop".into()),
            }],
            None => Vec::new(),
        };
        Ok(CompletionResponse { choices })
    }

    async fn stream_completion_request(
        &self,
        request: CompletionRequest,
    ) -> mistralrs_adapter::Result<CompletionChunkStream> {
        self.record(&request);
        let mut items: Vec<mistralrs_adapter::Result<CompletionChunk>> = self
            .deltas
            .iter()
            .map(|delta| {
                Ok(CompletionChunk {
                    choices: vec![ChunkChoice {
                        delta: delta.clone(),
                        finish_reason: None,
                    }],
                })
            })
            .collect();
        if let Some(error) = &self.stream_error {
            items.push(Err(AdapterError::Engine(error.clone())));
        }
        Ok(Box::pin(tokio_stream::iter(items)))
    }
}

fn build_adapter(engine: &ScriptedEngine) -> mistralrs_adapter::MistralRsAdapter {
    AdapterBuilder::new()
        .build(Box::new(engine.clone()))
        .unwrap_or_else(|e| panic!("builder rejected defaults: {e}"))
}

// ────────────────────────────────────────────────────────────────────────────
// Translation
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_translates_roles_and_preserves_order() {
    let engine = ScriptedEngine::replying("ok");
    let adapter = build_adapter(&engine);

    let messages = vec![
        ChatMessage::system("be brief"),
        ChatMessage::user("hello"),
        ChatMessage::assistant("hi"),
        ChatMessage::user("and now?"),
    ];
    let result = adapter.chat(&messages, &ParamOverrides::new()).await;
    assert!(result.is_ok());

    let recorded = engine.recorded();
    assert_eq!(recorded.len(), 1);
    let RequestInput::Messages(sent) = &recorded[0].input else {
        panic!("chat should submit messages, got {:?}", recorded[0].input);
    };
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[0].role, Role::System);
    assert_eq!(sent[0].content, "be brief");
    assert_eq!(sent[1].role, Role::User);
    assert_eq!(sent[2].role, Role::Assistant);
    assert_eq!(sent[3].role, Role::User);
    assert_eq!(sent[3].content, "and now?");
}

#[tokio::test]
async fn unsupported_role_fails_before_reaching_the_engine() {
    let engine = ScriptedEngine::replying("ok");
    let adapter = build_adapter(&engine);

    let messages = vec![
        ChatMessage::user("hello"),
        ChatMessage::new(MessageRole::Function, "result"),
    ];
    let result = adapter.chat(&messages, &ParamOverrides::new()).await;

    let err = result.err();
    assert!(
        matches!(&err, Some(AdapterError::UnsupportedRole { role }) if role == "function")
    );
    if let Some(e) = err {
        assert_eq!(e.code(), "UNSUPPORTED_ROLE");
    }
    assert!(engine.recorded().is_empty(), "engine must not be called");
}

// ────────────────────────────────────────────────────────────────────────────
// Parameter layering
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn call_overrides_beat_constructor_overrides_beat_defaults() {
    let engine = ScriptedEngine::replying("ok");
    let adapter = AdapterBuilder::new()
        .with_max_new_tokens(512)
        .with_overrides(
            ParamOverrides::new()
                .with_temperature(0.8)
                .with_top_k(50),
        )
        .build(Box::new(engine.clone()))
        .unwrap_or_else(|e| panic!("builder rejected config: {e}"));

    let call = ParamOverrides::new().with_temperature(0.2);
    let result = adapter.chat(&[ChatMessage::user("hi")], &call).await;
    assert!(result.is_ok());

    let recorded = engine.recorded();
    let params = &recorded[0].params;
    assert_eq!(params.temperature, 0.2, "call layer wins");
    assert_eq!(params.top_k, 50, "ctor layer fills unset call fields");
    assert_eq!(params.top_p, DEFAULT_TOP_P, "defaults fill the rest");
    assert_eq!(params.max_tokens, 512);
}

#[tokio::test]
async fn per_call_overrides_do_not_leak_into_later_calls() {
    let engine = ScriptedEngine::replying("ok");
    let adapter = build_adapter(&engine);

    let first = adapter
        .chat(
            &[ChatMessage::user("hi")],
            &ParamOverrides::new().with_temperature(0.9).with_top_k(5),
        )
        .await;
    assert!(first.is_ok());

    let second = adapter
        .chat(&[ChatMessage::user("hi again")], &ParamOverrides::new())
        .await;
    assert!(second.is_ok());

    let recorded = engine.recorded();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[0].params.temperature, 0.9);
    assert_eq!(recorded[1].params.temperature, DEFAULT_TEMPERATURE);
    assert_eq!(recorded[1].params.top_k, DEFAULT_TOP_K);
}

#[tokio::test]
async fn streaming_flag_follows_the_call_path() {
    let engine = ScriptedEngine::streaming(&["x"]);
    let adapter = build_adapter(&engine);

    let completion = adapter
        .chat(&[ChatMessage::user("hi")], &ParamOverrides::new())
        .await;
    assert!(completion.is_ok());

    let stream = adapter
        .stream_chat(&[ChatMessage::user("hi")], &ParamOverrides::new())
        .await;
    assert!(stream.is_ok());

    let recorded = engine.recorded();
    assert_eq!(recorded.len(), 2);
    assert!(!recorded[0].params.stream, "chat is non-streaming");
    assert!(recorded[1].params.stream, "stream_chat is streaming");
}

// ────────────────────────────────────────────────────────────────────────────
// Request shape
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn requests_carry_the_fixed_protocol_fields() {
    let engine = ScriptedEngine::replying("ok");
    let adapter = build_adapter(&engine);

    let result = adapter
        .chat(&[ChatMessage::user("hi")], &ParamOverrides::new())
        .await;
    assert!(result.is_ok());

    let recorded = engine.recorded();
    assert_eq!(recorded[0].model, "local");
    assert!(recorded[0].logit_bias.is_none());
    assert!(!recorded[0].logprobs);
}

// ────────────────────────────────────────────────────────────────────────────
// Normalization
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_choice_response_passes_through() {
    let engine = ScriptedEngine::replying("ok");
    let adapter = build_adapter(&engine);

    let result = adapter
        .complete("prompt", true, &ParamOverrides::new())
        .await;
    assert!(result.is_ok());
    assert_eq!(result.map(|c| c.text).unwrap_or_default(), "ok");
}

#[tokio::test]
async fn zero_choice_response_is_a_typed_error() {
    let engine = ScriptedEngine::empty_response();
    let adapter = build_adapter(&engine);

    let result = adapter
        .chat(&[ChatMessage::user("hi")], &ParamOverrides::new())
        .await;
    let err = result.err();
    assert!(matches!(&err, Some(AdapterError::EmptyResponse(_))));
    if let Some(e) = err {
        assert_eq!(e.code(), "EMPTY_RESPONSE");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Streaming
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_chat_accumulates_deltas() {
    let engine = ScriptedEngine::streaming(&["Hel", "lo", ", world"]);
    let adapter = build_adapter(&engine);

    let stream = adapter
        .stream_chat(&[ChatMessage::user("hi")], &ParamOverrides::new())
        .await;
    assert!(stream.is_ok());
    let Ok(stream) = stream else {
        return;
    };
    let events: Vec<_> = stream.collect().await;

    assert_eq!(events.len(), 3);
    let pairs: Vec<(String, String)> = events
        .iter()
        .filter_map(|e| e.as_ref().ok())
        .map(|e| (e.delta.clone(), e.accumulated.clone()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("Hel".into(), "Hel".into()),
            ("lo".into(), "Hello".into()),
            (", world".into(), "Hello, world".into()),
        ]
    );
}

#[tokio::test]
async fn mid_stream_engine_failure_surfaces_after_partial_deltas() {
    let engine = ScriptedEngine::failing_stream(&["par", "tial"], "sequence aborted");
    let adapter = build_adapter(&engine);

    let stream = adapter
        .stream_complete("prompt", true, &ParamOverrides::new())
        .await;
    assert!(stream.is_ok());
    let Ok(stream) = stream else {
        return;
    };
    let events: Vec<_> = stream.collect().await;

    assert_eq!(events.len(), 3);
    assert!(events[0].is_ok());
    assert!(events[1].is_ok());
    match &events[2] {
        Err(AdapterError::Engine(msg)) => assert_eq!(msg, "sequence aborted"),
        other => panic!("expected engine error as final item, got {other:?}"),
    }
}

#[tokio::test]
async fn each_call_gets_a_fresh_accumulator() {
    let engine = ScriptedEngine::streaming(&["abc"]);
    let adapter = build_adapter(&engine);

    for _ in 0..2 {
        let stream = adapter
            .stream_chat(&[ChatMessage::user("hi")], &ParamOverrides::new())
            .await;
        let Ok(stream) = stream else {
            panic!("stream setup failed");
        };
        let events: Vec<_> = stream.collect().await;
        let last = events.last().and_then(|e| e.as_ref().ok());
        assert_eq!(last.map(|e| e.accumulated.as_str()), Some("abc"));
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Formatters and system prompt
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn formatted_prompt_bypasses_the_completion_formatter() {
    let engine = ScriptedEngine::replying("ok");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let adapter = AdapterBuilder::new()
        .with_completion_to_prompt(move |p| {
            counter.fetch_add(1, Ordering::SeqCst);
            format!("<|user|>{p}<|assistant|>")
        })
        .build(Box::new(engine.clone()))
        .unwrap_or_else(|e| panic!("builder rejected config: {e}"));

    let result = adapter.complete("hi", true, &ParamOverrides::new()).await;
    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let recorded = engine.recorded();
    assert_eq!(recorded[0].input, RequestInput::Prompt("hi".into()));
}

#[tokio::test]
async fn unformatted_prompt_invokes_the_formatter_exactly_once() {
    let engine = ScriptedEngine::replying("ok");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let adapter = AdapterBuilder::new()
        .with_completion_to_prompt(move |p| {
            counter.fetch_add(1, Ordering::SeqCst);
            format!("<|user|>{p}<|assistant|>")
        })
        .build(Box::new(engine.clone()))
        .unwrap_or_else(|e| panic!("builder rejected config: {e}"));

    let result = adapter.complete("hi", false, &ParamOverrides::new()).await;
    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let recorded = engine.recorded();
    assert_eq!(
        recorded[0].input,
        RequestInput::Prompt("<|user|>hi<|assistant|>".into())
    );
}

#[tokio::test]
async fn messages_formatter_routes_chat_to_a_raw_prompt() {
    let engine = ScriptedEngine::replying("ok");
    let adapter = AdapterBuilder::new()
        .with_messages_to_prompt(|msgs| {
            msgs.iter()
                .map(|m| format!("{}: {}", m.role, m.content))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .build(Box::new(engine.clone()))
        .unwrap_or_else(|e| panic!("builder rejected config: {e}"));

    let messages = vec![ChatMessage::user("hello"), ChatMessage::assistant("hi")];
    let result = adapter.chat(&messages, &ParamOverrides::new()).await;
    assert!(result.is_ok());

    let recorded = engine.recorded();
    assert_eq!(
        recorded[0].input,
        RequestInput::Prompt("user: hello\nassistant: hi".into())
    );
}

#[tokio::test]
async fn system_prompt_is_prepended_exactly_once() {
    let engine = ScriptedEngine::replying("ok");
    let adapter = AdapterBuilder::new()
        .with_system_prompt("you are terse")
        .build(Box::new(engine.clone()))
        .unwrap_or_else(|e| panic!("builder rejected config: {e}"));

    let result = adapter
        .chat(&[ChatMessage::user("hi")], &ParamOverrides::new())
        .await;
    assert!(result.is_ok());

    let recorded = engine.recorded();
    let RequestInput::Messages(sent) = &recorded[0].input else {
        panic!("chat should submit messages");
    };
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].role, Role::System);
    assert_eq!(sent[0].content, "you are terse");
}

#[tokio::test]
async fn existing_system_message_suppresses_the_configured_prompt() {
    let engine = ScriptedEngine::replying("ok");
    let adapter = AdapterBuilder::new()
        .with_system_prompt("you are terse")
        .build(Box::new(engine.clone()))
        .unwrap_or_else(|e| panic!("builder rejected config: {e}"));

    let messages = vec![
        ChatMessage::system("you are verbose"),
        ChatMessage::user("hi"),
    ];
    let result = adapter.chat(&messages, &ParamOverrides::new()).await;
    assert!(result.is_ok());

    let recorded = engine.recorded();
    let RequestInput::Messages(sent) = &recorded[0].input else {
        panic!("chat should submit messages");
    };
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].content, "you are verbose");
}

// ────────────────────────────────────────────────────────────────────────────
// Metadata
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn metadata_reports_the_configured_budget() {
    let engine = ScriptedEngine::replying("ok");
    let adapter = AdapterBuilder::new()
        .with_context_window(8192)
        .with_max_new_tokens(1024)
        .build(Box::new(engine))
        .unwrap_or_else(|e| panic!("builder rejected config: {e}"));

    let meta = adapter.metadata();
    assert_eq!(meta.context_window, 8192);
    assert_eq!(meta.max_output_tokens, 1024);
    assert_eq!(meta.model_id, "local");
}
