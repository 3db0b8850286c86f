pub mod agent;
pub mod capability;
pub mod error;
pub mod fallback;
pub mod invoke;
pub mod runtime;
pub mod session;

#[cfg(test)]
mod testing;

// Re-export key types
pub use agent::{AgentBuilder, AgentConfig, AgentRegistry, AgentSlot, Provider, RuntimeAgent};
pub use capability::Capabilities;
pub use error::{BuildError, FallbackError, ModelError, RegistryError, RuntimeError, SessionError};
pub use fallback::{DirectCompletion, HttpCompletion};
pub use invoke::{Invoker, NO_RESPONSE_PLACEHOLDER};
pub use session::{InMemorySessionService, SessionKey, SessionService};
