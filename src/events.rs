//! Streaming delta accumulation.
//!
//! Wraps an engine chunk stream into a stream of [`DeltaEvent`]s carrying
//! both the new fragment and the text accumulated so far. The wrapper is
//! lazy and pull-driven: nothing advances until the caller polls, and
//! dropping the stream abandons the call.

use std::pin::Pin;

use async_stream::stream;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::engine::CompletionChunkStream;
use crate::error::AdapterError;

/// One streaming event: the newest fragment plus everything so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaEvent {
    /// The text fragment added by this event.
    pub delta: String,
    /// All text generated up to and including this event.
    pub accumulated: String,
}

/// A boxed stream of delta events.
///
/// One fresh stream per call; never shared or replayed.
pub type DeltaStream =
    Pin<Box<dyn Stream<Item = std::result::Result<DeltaEvent, AdapterError>> + Send>>;

/// Accumulate an engine chunk stream into a [`DeltaStream`].
///
/// Per chunk, the first choice's delta is appended to a call-scoped
/// accumulator. Chunks with no choices and empty-fragment deltas are
/// skipped. An engine error is yielded as an `Err` item and ends the
/// stream; deltas already yielded stay with the caller, but the call never
/// resolves into a partial success.
pub fn accumulate(chunks: CompletionChunkStream) -> DeltaStream {
    Box::pin(stream! {
        let mut chunks = chunks;
        let mut accumulated = String::new();
        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => {
                    let Some(choice) = chunk.choices.first() else {
                        continue;
                    };
                    if choice.delta.is_empty() {
                        continue;
                    }
                    accumulated.push_str(&choice.delta);
                    yield Ok(DeltaEvent {
                        delta: choice.delta.clone(),
                        accumulated: accumulated.clone(),
                    });
                }
                Err(err) => {
                    yield Err(err);
                    break;
                }
            }
        }
    })
}
