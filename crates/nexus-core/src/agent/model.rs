use std::sync::Arc;

use async_trait::async_trait;
use nexus_config::AgentDefaults;

use crate::agent::config::{AgentConfig, Provider};
use crate::error::{BuildError, ModelError};
use crate::runtime::{Content, Part};

/// How a model address is resolved against a serving backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRoute {
    /// `ollama/<model>` against the configured base url.
    Ollama,
    /// `openai/<model>` against an OpenAI-compatible base url.
    OpenAiCompatible,
    /// The raw model string with the backend's own default endpoint.
    Raw,
}

/// Description of the model adapter an agent should use. Building one does
/// no I/O; a [`ModelFactory`] turns it into a live adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub route: ModelRoute,
    pub model: String,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
}

impl ModelSpec {
    pub fn for_config(config: &AgentConfig, defaults: &AgentDefaults) -> Self {
        let model = config.model(defaults).to_string();
        match config.provider(defaults) {
            Provider::Ollama => Self {
                route: ModelRoute::Ollama,
                model,
                api_base: Some(config.base_url(defaults).to_string()),
                api_key: None,
            },
            Provider::Litellm => Self {
                route: ModelRoute::OpenAiCompatible,
                model,
                api_base: Some(config.base_url(defaults).to_string()),
                api_key: Some(config.api_key_or_placeholder(defaults).to_string()),
            },
            Provider::Other(_) => Self {
                route: ModelRoute::Raw,
                model,
                api_base: None,
                api_key: None,
            },
        }
    }

    /// Provider-qualified model address, e.g. `ollama/gemma3:latest`.
    pub fn address(&self) -> String {
        match self.route {
            ModelRoute::Ollama => format!("ollama/{}", self.model),
            ModelRoute::OpenAiCompatible => format!("openai/{}", self.model),
            ModelRoute::Raw => self.model.clone(),
        }
    }
}

/// One generation request: instruction, prior turns, and the new message.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub instruction: String,
    pub history: Vec<Content>,
    pub message: Content,
}

/// A live model backend used by runtime agents.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    fn address(&self) -> &str;
    async fn generate(&self, request: ModelRequest) -> Result<Vec<Part>, ModelError>;
}

/// Materializes [`ModelSpec`]s into adapters.
pub trait ModelFactory: Send + Sync {
    fn create(&self, spec: &ModelSpec) -> Result<Arc<dyn ModelAdapter>, BuildError>;
}

/// The factory compiled into this build, if the runtime feature is enabled.
pub fn default_model_factory() -> Option<Arc<dyn ModelFactory>> {
    #[cfg(feature = "runtime")]
    {
        Some(Arc::new(crate::agent::rig_model::RigModelFactory) as Arc<dyn ModelFactory>)
    }
    #[cfg(not(feature = "runtime"))]
    {
        None
    }
}

/// Normalize an OpenAI-compatible base url so it ends in `/v1`.
pub fn openai_compatible_base(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}
