//! Routes an agent invocation through the session-aware runtime, degrading
//! to a direct completion whenever the runtime is unavailable or fails.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use nexus_config::{Config, RuntimeConfig};
use tracing::{debug, warn};

use crate::agent::{default_model_factory, AgentBuilder, AgentSlot};
use crate::capability::Capabilities;
use crate::error::RuntimeError;
use crate::fallback::{run_fallback, DirectCompletion, HttpCompletion};
use crate::runtime::{Content, Part, Runner};
use crate::session::{self, InMemorySessionService, SessionKey, SessionService};

/// Result text when a runtime turn finished without any response text.
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response generated.";

/// Session namespace for an agent: all of its sessions live under it, so
/// session ids only need to be unique per agent.
pub fn app_namespace(prefix: &str, agent_id: &str) -> String {
    let short: String = agent_id.chars().take(8).collect();
    format!("{prefix}_{short}")
}

#[derive(Clone)]
pub struct Invoker {
    builder: AgentBuilder,
    sessions: Option<Arc<dyn SessionService>>,
    fallback: Arc<dyn DirectCompletion>,
    capabilities: Capabilities,
    settings: RuntimeConfig,
}

impl Invoker {
    pub fn new(
        builder: AgentBuilder,
        sessions: Option<Arc<dyn SessionService>>,
        fallback: Arc<dyn DirectCompletion>,
        capabilities: Capabilities,
        settings: RuntimeConfig,
    ) -> Self {
        Self {
            builder,
            sessions,
            fallback,
            capabilities,
            settings,
        }
    }

    /// Wire the production collaborators. Capabilities are probed here, once.
    pub fn from_config(config: &Config) -> Result<Self> {
        let capabilities = Capabilities::probe(&config.runtime);
        let factory = if capabilities.runtime {
            default_model_factory()
        } else {
            None
        };
        let sessions = if capabilities.runtime {
            Some(Arc::new(InMemorySessionService::new()) as Arc<dyn SessionService>)
        } else {
            None
        };
        let fallback = HttpCompletion::new(config.fallback.timeout_secs.map(Duration::from_secs))
            .context("failed to create HTTP client for direct completions")?;

        Ok(Self::new(
            AgentBuilder::new(factory, config.defaults.clone()),
            sessions,
            Arc::new(fallback),
            capabilities,
            config.runtime.clone(),
        ))
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn default_session_id(&self) -> &str {
        &self.settings.default_session_id
    }

    /// Produce the reply text for `message`. Never fails: runtime errors fall
    /// back to a direct completion, whose own errors become the reply text.
    pub async fn invoke(&self, slot: &AgentSlot, session_id: &str, message: &str) -> String {
        let sessions = match &self.sessions {
            Some(sessions) if self.capabilities.runtime => sessions.clone(),
            _ => return self.direct(slot, message).await,
        };

        match self.run_runtime(slot, sessions, session_id, message).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(
                    "No runtime agent for '{}', using direct completion",
                    slot.id()
                );
                self.direct(slot, message).await
            }
            Err(e) => {
                warn!("Runtime run error for agent '{}': {e}", slot.id());
                self.direct(slot, message).await
            }
        }
    }

    /// `Ok(None)` when no runtime agent could be built for the slot.
    async fn run_runtime(
        &self,
        slot: &AgentSlot,
        sessions: Arc<dyn SessionService>,
        session_id: &str,
        message: &str,
    ) -> Result<Option<String>, RuntimeError> {
        let Some(agent) = slot.runtime_agent(&self.builder).await else {
            return Ok(None);
        };

        let app_name = app_namespace(&self.settings.app_prefix, slot.id());
        let user_id = &self.settings.user_id;
        let key = SessionKey::new(&app_name, user_id, session_id);
        {
            let _guard = slot.lock_sessions().await;
            session::get_or_create(sessions.as_ref(), &key).await?;
        }

        let runner = Runner::new(agent, app_name, sessions);
        let mut events = runner.run(user_id, session_id, Content::user_text(message));

        let mut fragments: Vec<String> = Vec::new();
        while let Some(event) = events.next().await {
            let event = event?;
            if !event.is_final_response() {
                debug!("Runtime event from '{}' ({:?})", event.author, event.kind);
                continue;
            }
            if let Some(content) = &event.content {
                fragments.extend(content.parts.iter().filter_map(Part::text).map(str::to_string));
            }
        }

        if fragments.is_empty() {
            Ok(Some(NO_RESPONSE_PLACEHOLDER.to_string()))
        } else {
            Ok(Some(fragments.concat()))
        }
    }

    async fn direct(&self, slot: &AgentSlot, message: &str) -> String {
        run_fallback(
            self.fallback.as_ref(),
            slot.config(),
            self.builder.defaults(),
            message,
        )
        .await
    }
}
