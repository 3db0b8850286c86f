use nexus_config::RuntimeConfig;
use tracing::info;

/// Optional capabilities of this process, probed once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Session-aware agent runtime. When false every invocation uses the
    /// direct-completion path.
    pub runtime: bool,
}

impl Capabilities {
    pub fn probe(config: &RuntimeConfig) -> Self {
        let compiled = cfg!(feature = "runtime");
        let runtime = compiled && config.enabled;
        if !compiled {
            info!("Agent runtime not compiled in; using direct completions only");
        } else if !config.enabled {
            info!("Agent runtime disabled by configuration; using direct completions only");
        }
        Self { runtime }
    }
}
