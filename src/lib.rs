//! mistralrs-adapter: a chat/completion adapter over a local `mistralrs`
//! inference engine.
//!
//! Orchestration frameworks speak a generic chat protocol; the engine
//! speaks its own completion protocol. This crate is the bidirectional
//! translation between them: role and message mapping, layered generation
//! parameters, request assembly, response normalization, and streaming
//! delta accumulation.
//!
//! # Submodules
//!
//! - [`error`] — Error types with stable error codes
//! - [`message`] — Generic chat protocol messages
//! - [`params`] — Layered generation parameters
//! - [`metadata`] — Capability metadata
//! - [`translate`] — Role and message translation
//! - [`request`] — Request assembly
//! - [`response`] — Response normalization
//! - [`events`] — Streaming delta accumulation
//! - [`engine`] — Engine boundary trait, protocol types, mistralrs backend
//! - [`adapter`] — The public adapter facade and its builder
//!
//! # Error Codes
//!
//! All errors carry a stable code (e.g. `CONFIG_INVALID`,
//! `UNSUPPORTED_ROLE`) that is safe to match on programmatically.

// Fail early with a clear message when the metal feature is enabled but the
// Metal Toolchain is not installed. Without this, mistralrs panics deep in a
// build script with an opaque error.
#[cfg(missing_metal_toolchain)]
compile_error!(
    "The `metal` feature requires Apple's Metal Toolchain. Install it with:\n\n    \
     xcodebuild -downloadComponent MetalToolchain\n\n\
     This is a one-time ~700 MB download."
);

pub mod adapter;
pub mod engine;
pub mod error;
pub mod events;
pub mod message;
pub mod metadata;
pub mod params;
pub mod request;
pub mod response;
pub mod translate;

pub use adapter::{AdapterBuilder, MistralRsAdapter};
pub use engine::{
    CompletionChunkStream, CompletionEngine, CompletionRequest, EngineConfig, ModelSource,
    RequestInput,
};
pub use engine::mistral::MistralRsEngine;
pub use error::{AdapterError, Result};
pub use events::{DeltaEvent, DeltaStream};
pub use message::{ChatMessage, MessageRole};
pub use metadata::LlmMetadata;
pub use params::{GenerationParams, ParamOverrides};
pub use response::Completion;
