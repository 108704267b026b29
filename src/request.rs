//! Completion request assembly.

use crate::engine::{CompletionRequest, RequestInput};
use crate::metadata::LOCAL_MODEL_ID;
use crate::params::GenerationParams;

/// Build a provider-protocol request from translated input and merged
/// parameters.
///
/// The model field is the fixed [`LOCAL_MODEL_ID`] placeholder; logit
/// biases and logprob tensors are never requested. Parameters are carried
/// verbatim, including the streaming flag the call path already forced.
/// No validation happens here; token budgeting is the engine's concern.
pub fn build_request(input: RequestInput, params: GenerationParams) -> CompletionRequest {
    CompletionRequest {
        input,
        model: LOCAL_MODEL_ID.to_owned(),
        logit_bias: None,
        logprobs: false,
        params,
    }
}
