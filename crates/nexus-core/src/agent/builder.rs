use std::fmt;
use std::sync::Arc;

use nexus_config::AgentDefaults;
use tracing::{debug, warn};

use crate::agent::config::AgentConfig;
use crate::agent::model::{ModelAdapter, ModelFactory, ModelSpec};
use crate::error::BuildError;

/// Lowercase the display name and replace spaces with underscores.
pub fn normalize_agent_name(name: &str) -> String {
    name.replace(' ', "_").to_lowercase()
}

fn validate_agent_name(name: &str) -> Result<(), BuildError> {
    let invalid = |reason: &str| BuildError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid("name is empty")),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            return Err(invalid("must start with a letter or underscore"))
        }
        _ => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("only letters, digits and underscores are allowed"));
    }
    // The user role is the author of every input event.
    if name == "user" {
        return Err(invalid("'user' is reserved"));
    }
    Ok(())
}

/// An agent ready to run turns on the session-aware runtime.
pub struct RuntimeAgent {
    name: String,
    description: String,
    instruction: String,
    model: Arc<dyn ModelAdapter>,
}

impl RuntimeAgent {
    pub fn new(
        name: String,
        model: Arc<dyn ModelAdapter>,
        description: String,
        instruction: String,
    ) -> Result<Self, BuildError> {
        validate_agent_name(&name)?;
        Ok(Self {
            name,
            description,
            instruction,
            model,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn model(&self) -> &Arc<dyn ModelAdapter> {
        &self.model
    }
}

impl fmt::Debug for RuntimeAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeAgent")
            .field("name", &self.name)
            .field("model", &self.model.address())
            .finish()
    }
}

/// Builds runtime agents from registrations.
///
/// Holds no factory when the runtime capability is unavailable, in which case
/// every build yields `None` and callers take the direct-completion path.
#[derive(Clone)]
pub struct AgentBuilder {
    factory: Option<Arc<dyn ModelFactory>>,
    defaults: AgentDefaults,
}

impl AgentBuilder {
    pub fn new(factory: Option<Arc<dyn ModelFactory>>, defaults: AgentDefaults) -> Self {
        Self { factory, defaults }
    }

    pub fn defaults(&self) -> &AgentDefaults {
        &self.defaults
    }

    pub fn build_model(&self, config: &AgentConfig) -> Option<ModelSpec> {
        self.factory.as_ref()?;
        Some(ModelSpec::for_config(config, &self.defaults))
    }

    /// Build the runtime agent for `config`. Construction failures are logged
    /// and reported as `None`.
    pub fn build_agent(&self, config: &AgentConfig) -> Option<RuntimeAgent> {
        let factory = self.factory.as_ref()?;
        let spec = self.build_model(config)?;

        let model = match factory.create(&spec) {
            Ok(m) => m,
            Err(e) => {
                warn!("Error building agent '{}': {e}", config.id());
                return None;
            }
        };

        let name = normalize_agent_name(config.name().unwrap_or(&self.defaults.name));
        let description = config
            .description()
            .unwrap_or(&self.defaults.description)
            .to_string();
        let instruction = config
            .system_prompt()
            .unwrap_or(&self.defaults.instruction)
            .to_string();

        match RuntimeAgent::new(name, model, description, instruction) {
            Ok(agent) => {
                debug!(
                    "Built runtime agent '{}' for id={} ({})",
                    agent.name(),
                    config.id(),
                    spec.address()
                );
                Some(agent)
            }
            Err(e) => {
                warn!("Error building agent '{}': {e}", config.id());
                None
            }
        }
    }
}
