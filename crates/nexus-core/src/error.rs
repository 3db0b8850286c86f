//! Error types shared across the invocation pipeline.

use thiserror::Error;

/// Errors raised by the agent registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A registration arrived without a usable `id`.
    #[error("id required")]
    Validation,

    #[error("Agent {0} not registered")]
    NotFound(String),
}

/// Errors raised by a session service.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session not found: {app_name}/{user_id}/{session_id}")]
    NotFound {
        app_name: String,
        user_id: String,
        session_id: String,
    },

    #[error("session already exists: {app_name}/{user_id}/{session_id}")]
    AlreadyExists {
        app_name: String,
        user_id: String,
        session_id: String,
    },
}

/// Reasons a runtime agent could not be constructed. These never reach the
/// caller; the builder logs them and reports "nothing built".
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid agent name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("failed to create {provider} client: {reason}")]
    Client { provider: String, reason: String },
}

/// Failure reported by a model adapter.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("completion failed for {address}: {reason}")]
    Completion { address: String, reason: String },
}

/// Any failure on the session-aware runtime path. The router absorbs these
/// and degrades to the direct-completion path.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Failure of the stateless direct-completion call.
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}: {body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    #[error("invalid response from {url}: {reason}")]
    Decode { url: String, reason: String },
}
