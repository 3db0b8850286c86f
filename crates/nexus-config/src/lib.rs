pub mod loader;
pub mod schema;

pub use loader::{find_config_path, load_config};
pub use schema::{AgentDefaults, Config, FallbackConfig, RuntimeConfig, ServerConfig};
