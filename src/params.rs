//! Generation parameter layering.
//!
//! Three layers feed every request: built-in defaults, constructor
//! overrides, per-call overrides. [`GenerationParams::merged`] folds them
//! with call > constructor > defaults precedence and allocates a fresh
//! value each time; no layer is ever mutated, so concurrent calls cannot
//! observe each other's parameters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.1;
/// Default top-k sampling cutoff.
pub const DEFAULT_TOP_K: usize = 32;
/// Default nucleus sampling threshold.
pub const DEFAULT_TOP_P: f64 = 0.1;
/// Default number of top logprobs carried in the protocol.
pub const DEFAULT_TOP_LOGPROBS: usize = 10;
/// Default generation budget when the adapter is not configured.
pub const DEFAULT_MAX_NEW_TOKENS: usize = 256;

/// Fully-resolved generation parameters for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature in `[0.0, 1.0]`.
    pub temperature: f64,
    /// Maximum number of tokens to generate.
    pub max_tokens: usize,
    /// Top-k sampling cutoff.
    pub top_k: usize,
    /// Nucleus sampling threshold.
    pub top_p: f64,
    /// Number of top logprobs to request, when the engine supports it.
    pub top_logprobs: Option<usize>,
    /// Whether the response is streamed. Forced by the call path.
    pub stream: bool,
    /// Engine-specific passthrough values, keyed by parameter name.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_NEW_TOKENS,
            top_k: DEFAULT_TOP_K,
            top_p: DEFAULT_TOP_P,
            top_logprobs: Some(DEFAULT_TOP_LOGPROBS),
            stream: false,
            extra: BTreeMap::new(),
        }
    }
}

impl GenerationParams {
    /// Built-in defaults with the given generation budget.
    pub fn defaults(max_new_tokens: usize) -> Self {
        Self {
            max_tokens: max_new_tokens,
            ..Self::default()
        }
    }

    /// Merge three parameter layers into a fresh value.
    ///
    /// Precedence is call > constructor > defaults, field by field. The
    /// `extra` maps union with the same precedence. All three inputs are
    /// read-only; every call allocates its own result.
    pub fn merged(defaults: &Self, ctor: &ParamOverrides, call: &ParamOverrides) -> Self {
        let mut params = defaults.clone();
        ctor.apply_to(&mut params);
        call.apply_to(&mut params);
        params
    }

    /// Force the streaming flag. The call path applies this after merging,
    /// so it always wins over anything a layer carried.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// A single layer of parameter overrides.
///
/// All fields are optional; unset fields leave the lower layer's value in
/// place. Built with `with_*` methods.
///
/// # Examples
///
/// ```
/// use mistralrs_adapter::params::ParamOverrides;
///
/// let overrides = ParamOverrides::new()
///     .with_temperature(0.7)
///     .with_max_tokens(1024);
/// assert_eq!(overrides.temperature, Some(0.7));
/// assert_eq!(overrides.max_tokens, Some(1024));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamOverrides {
    /// Override for the sampling temperature.
    pub temperature: Option<f64>,
    /// Override for the generation budget.
    pub max_tokens: Option<usize>,
    /// Override for the top-k cutoff.
    pub top_k: Option<usize>,
    /// Override for the nucleus threshold.
    pub top_p: Option<f64>,
    /// Override for the logprob count.
    pub top_logprobs: Option<usize>,
    /// Engine-specific passthrough values added at this layer.
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ParamOverrides {
    /// Create an empty override layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the generation budget.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the top-k cutoff.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Set the nucleus threshold.
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the logprob count.
    pub fn with_top_logprobs(mut self, top_logprobs: usize) -> Self {
        self.top_logprobs = Some(top_logprobs);
        self
    }

    /// Add an engine-specific passthrough value.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Returns true if no field is set at this layer.
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.max_tokens.is_none()
            && self.top_k.is_none()
            && self.top_p.is_none()
            && self.top_logprobs.is_none()
            && self.extra.is_empty()
    }

    fn apply_to(&self, params: &mut GenerationParams) {
        if let Some(temperature) = self.temperature {
            params.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            params.max_tokens = max_tokens;
        }
        if let Some(top_k) = self.top_k {
            params.top_k = top_k;
        }
        if let Some(top_p) = self.top_p {
            params.top_p = top_p;
        }
        if let Some(top_logprobs) = self.top_logprobs {
            params.top_logprobs = Some(top_logprobs);
        }
        for (key, value) in &self.extra {
            params.extra.insert(key.clone(), value.clone());
        }
    }
}
