use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::agent::builder::{AgentBuilder, RuntimeAgent};
use crate::agent::config::AgentConfig;
use crate::error::RegistryError;

/// A registry entry: the registration plus its lazily built runtime agent.
pub struct AgentSlot {
    config: AgentConfig,
    /// Guards the build so at most one runs per agent at a time.
    runtime: Mutex<Option<Arc<RuntimeAgent>>>,
    sessions: Mutex<()>,
}

impl AgentSlot {
    fn new(config: AgentConfig) -> Self {
        Self {
            config,
            runtime: Mutex::new(None),
            sessions: Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        self.config.id()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Return the cached runtime agent, building it on first use. A failed
    /// build is not cached, so the next invocation tries again.
    pub async fn runtime_agent(&self, builder: &AgentBuilder) -> Option<Arc<RuntimeAgent>> {
        let mut cached = self.runtime.lock().await;
        if let Some(agent) = cached.as_ref() {
            return Some(agent.clone());
        }
        let agent = Arc::new(builder.build_agent(&self.config)?);
        *cached = Some(agent.clone());
        Some(agent)
    }

    /// Serializes session get-or-create for this agent, so concurrent first
    /// requests on one session id create it once.
    pub async fn lock_sessions(&self) -> MutexGuard<'_, ()> {
        self.sessions.lock().await
    }

    pub async fn has_runtime_agent(&self) -> bool {
        self.runtime.lock().await.is_some()
    }
}

/// In-memory map of registered agents, keyed by caller-supplied id.
///
/// Re-registering an id replaces its slot, which drops any cached runtime
/// agent. Concurrent registrations of the same id are last-writer-wins.
#[derive(Default)]
pub struct AgentRegistry {
    agents: DashMap<String, Arc<AgentSlot>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails only when the record has no non-empty string `id`.
    pub fn register(&self, config: AgentConfig) -> Result<Arc<AgentSlot>, RegistryError> {
        if config.id().is_empty() {
            return Err(RegistryError::Validation);
        }
        info!(
            "Registered agent: {}",
            config.name().unwrap_or(config.id())
        );
        let slot = Arc::new(AgentSlot::new(config));
        self.agents.insert(slot.id().to_string(), slot.clone());
        Ok(slot)
    }

    pub fn get(&self, id: &str) -> Result<Arc<AgentSlot>, RegistryError> {
        self.agents
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn remove(&self, id: &str) -> Result<AgentConfig, RegistryError> {
        let (_, slot) = self
            .agents
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        info!("Removed agent: {id}");
        Ok(slot.config.clone())
    }

    /// All registrations, without internal fields, ordered by id.
    pub fn list(&self) -> BTreeMap<String, AgentConfig> {
        self.agents
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().config.public_view()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
