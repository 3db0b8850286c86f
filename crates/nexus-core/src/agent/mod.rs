pub mod builder;
pub mod config;
pub mod model;
pub mod registry;
#[cfg(feature = "runtime")]
pub mod rig_model;

pub use builder::{normalize_agent_name, AgentBuilder, RuntimeAgent};
pub use config::{AgentConfig, Provider};
pub use model::{
    default_model_factory, openai_compatible_base, ModelAdapter, ModelFactory, ModelRequest,
    ModelRoute, ModelSpec,
};
pub use registry::{AgentRegistry, AgentSlot};
