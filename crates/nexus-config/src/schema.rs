use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub server: ServerConfig,
    pub defaults: AgentDefaults,
    pub runtime: RuntimeConfig,
    pub fallback: FallbackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7891,
        }
    }
}

/// Values used when an agent registration leaves a field out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentDefaults {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    /// Placeholder credential for backends that ignore auth (ollama, local proxies).
    pub api_key: String,
    pub name: String,
    pub description: String,
    /// Instruction given to the runtime agent when `system_prompt` is absent.
    /// The direct-completion path never uses it.
    pub instruction: String,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            model: "gemma3:latest".into(),
            base_url: "http://localhost:11434".into(),
            api_key: "dummy".into(),
            name: "agent".into(),
            description: "A helpful assistant".into(),
            instruction: "You are a helpful assistant.".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    /// Allow the session-aware runtime. Has no effect when the binary was
    /// built without the `runtime` feature.
    pub enabled: bool,
    /// Prefix of the per-agent session namespace (`<prefix>_<id[..8]>`).
    pub app_prefix: String,
    pub user_id: String,
    pub default_session_id: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            app_prefix: "zunery_nexus".into(),
            user_id: "user".into(),
            default_session_id: "default".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackConfig {
    /// Request timeout for direct completions. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}
