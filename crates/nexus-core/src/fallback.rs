//! Stateless single-turn completion used when the agent runtime is
//! unavailable or fails. Never returns an error to the caller: failures are
//! rendered into the result text.

use std::time::Duration;

use async_trait::async_trait;
use nexus_config::AgentDefaults;
use serde::Serialize;
use tracing::{debug, warn};

use crate::agent::{openai_compatible_base, AgentConfig, Provider};
use crate::error::FallbackError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionRoute {
    /// Native ollama chat endpoint.
    Ollama,
    /// `/v1/chat/completions` on any OpenAI-compatible server.
    OpenAiCompatible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub route: CompletionRoute,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    /// Build the request for `message`: an optional system entry from the
    /// agent's `system_prompt` (only when non-empty) then the user entry.
    pub fn for_config(config: &AgentConfig, defaults: &AgentDefaults, message: &str) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(prompt) = config.system_prompt().filter(|p| !p.is_empty()) {
            messages.push(ChatMessage::new("system", prompt));
        }
        messages.push(ChatMessage::new("user", message));

        let route = match config.provider(defaults) {
            Provider::Ollama => CompletionRoute::Ollama,
            Provider::Litellm | Provider::Other(_) => CompletionRoute::OpenAiCompatible,
        };

        Self {
            route,
            model: config.model(defaults).to_string(),
            base_url: config.base_url(defaults).to_string(),
            api_key: config.api_key_or_placeholder(defaults).to_string(),
            messages,
        }
    }

    pub fn address(&self) -> String {
        match self.route {
            CompletionRoute::Ollama => format!("ollama/{}", self.model),
            CompletionRoute::OpenAiCompatible => format!("openai/{}", self.model),
        }
    }
}

#[async_trait]
pub trait DirectCompletion: Send + Sync {
    /// Return the first choice's text, or `""` when the reply carries none.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, FallbackError>;
}

/// [`DirectCompletion`] over HTTP with reqwest.
pub struct HttpCompletion {
    client: reqwest::Client,
}

impl HttpCompletion {
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn post_json(
        &self,
        url: &str,
        api_key: Option<&str>,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, FallbackError> {
        let mut request = self.client.post(url).json(&body);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.map_err(|e| FallbackError::Request {
            url: url.to_string(),
            source: e,
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FallbackError::Http {
                url: url.to_string(),
                status,
                body,
            });
        }

        resp.json().await.map_err(|e| FallbackError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl DirectCompletion for HttpCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, FallbackError> {
        let (url, api_key, pointer) = match request.route {
            CompletionRoute::Ollama => (
                format!("{}/api/chat", request.base_url.trim_end_matches('/')),
                None,
                "/message/content",
            ),
            CompletionRoute::OpenAiCompatible => (
                format!("{}/chat/completions", openai_compatible_base(&request.base_url)),
                Some(request.api_key.as_str()),
                "/choices/0/message/content",
            ),
        };

        let body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "stream": false,
        });
        let data = self.post_json(&url, api_key, body).await?;

        Ok(data
            .pointer(pointer)
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

/// Run a direct completion for `config`, rendering any failure as
/// `"Error: <description>"`.
pub async fn run_fallback(
    completion: &dyn DirectCompletion,
    config: &AgentConfig,
    defaults: &AgentDefaults,
    message: &str,
) -> String {
    let request = CompletionRequest::for_config(config, defaults, message);
    debug!(
        "Direct completion for agent '{}' via {} ({} messages)",
        config.id(),
        request.address(),
        request.messages.len()
    );

    match completion.complete(&request).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Direct completion failed for agent '{}': {e}", config.id());
            format!("Error: {e}")
        }
    }
}
