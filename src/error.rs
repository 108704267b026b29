//! Error types for the adapter.
//!
//! Each error variant carries a stable error code (SCREAMING_SNAKE_CASE)
//! that is included in the Display output and accessible via [`AdapterError::code()`].
//! Codes are part of the public API contract and will not change.

/// Stable error codes for programmatic error handling.
///
/// These codes never change and form part of the public API contract.
/// Use these for distinguishing errors rather than parsing Display output.
pub mod error_codes {
    /// Invalid or missing configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// A chat message carried a role the engine cannot accept.
    pub const UNSUPPORTED_ROLE: &str = "UNSUPPORTED_ROLE";

    /// The engine returned a response with no choices.
    pub const EMPTY_RESPONSE: &str = "EMPTY_RESPONSE";

    /// The inference engine reported a failure.
    pub const ENGINE_FAILED: &str = "ENGINE_FAILED";
}

/// Roles the engine protocol accepts, named in unsupported-role errors.
pub const ACCEPTED_ROLES: &str = "system, user, assistant";

/// Errors produced by the adapter.
///
/// Each variant includes a stable error code accessible via [`AdapterError::code()`].
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Invalid or missing configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),

    /// A chat message carried a role the engine cannot accept.
    #[error(
        "[{}] unsupported chat message role {role:?}, expected one of: {}",
        error_codes::UNSUPPORTED_ROLE,
        ACCEPTED_ROLES
    )]
    UnsupportedRole {
        /// The offending role, as its lowercase protocol tag.
        role: String,
    },

    /// The engine returned a response with no choices.
    #[error("[{}] {}", error_codes::EMPTY_RESPONSE, .0)]
    EmptyResponse(String),

    /// The inference engine reported a failure.
    #[error("[{}] {}", error_codes::ENGINE_FAILED, .0)]
    Engine(String),
}

impl AdapterError {
    /// Returns the stable error code for this error.
    ///
    /// Codes are SCREAMING_SNAKE_CASE strings that remain stable across releases.
    /// Use these for programmatic error handling rather than parsing Display output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::UnsupportedRole { .. } => error_codes::UNSUPPORTED_ROLE,
            Self::EmptyResponse(_) => error_codes::EMPTY_RESPONSE,
            Self::Engine(_) => error_codes::ENGINE_FAILED,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Config(m) | Self::EmptyResponse(m) | Self::Engine(m) => m.clone(),
            Self::UnsupportedRole { role } => {
                format!("unsupported chat message role {role:?}, expected one of: {ACCEPTED_ROLES}")
            }
        }
    }
}

/// Convenience alias for adapter results.
pub type Result<T> = std::result::Result<T, AdapterError>;
