use nexus_config::AgentDefaults;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Model-serving backend family named by a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    /// Any OpenAI-compatible endpoint, typically a LiteLLM proxy.
    Litellm,
    Other(String),
}

impl From<&str> for Provider {
    fn from(value: &str) -> Self {
        match value {
            "ollama" => Provider::Ollama,
            "litellm" => Provider::Litellm,
            other => Provider::Other(other.to_string()),
        }
    }
}

/// A registered agent exactly as supplied by the host application.
///
/// The record is the caller's JSON object. Known keys (`id`, `name`,
/// `provider`, `model`, `baseUrl`, `apiKey`, `system_prompt`, `description`)
/// are read leniently: a missing, `null` or non-string value counts as
/// absent. Keys starting with `_` are internal and hidden from listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentConfig {
    fields: Map<String, Value>,
}

impl AgentConfig {
    pub fn new(id: &str) -> Self {
        Self::default().with("id", id)
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Empty when the caller sent no string id.
    pub fn id(&self) -> &str {
        self.text("id").unwrap_or_default()
    }

    pub fn name(&self) -> Option<&str> {
        self.text("name")
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.text("system_prompt")
    }

    pub fn description(&self) -> Option<&str> {
        self.text("description")
    }

    pub fn provider(&self, defaults: &AgentDefaults) -> Provider {
        Provider::from(self.text("provider").unwrap_or(&defaults.provider))
    }

    pub fn model<'a>(&'a self, defaults: &'a AgentDefaults) -> &'a str {
        self.text("model").unwrap_or(&defaults.model)
    }

    pub fn base_url<'a>(&'a self, defaults: &'a AgentDefaults) -> &'a str {
        self.text("baseUrl").unwrap_or(&defaults.base_url)
    }

    /// The configured key, or the placeholder when absent or empty.
    pub fn api_key_or_placeholder<'a>(&'a self, defaults: &'a AgentDefaults) -> &'a str {
        self.text("apiKey")
            .filter(|k| !k.is_empty())
            .unwrap_or(&defaults.api_key)
    }

    /// Copy safe for external display: internal (`_`-prefixed) fields removed.
    pub fn public_view(&self) -> AgentConfig {
        let mut view = self.clone();
        view.fields.retain(|key, _| !key.starts_with('_'));
        view
    }
}
