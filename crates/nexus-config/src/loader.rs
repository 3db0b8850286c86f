use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::Config;

const CONFIG_FILE: &str = "agent-server.json";

/// Places searched for the config file, most specific first: the working
/// directory, then `~/.zunery/`.
fn config_candidates(home: Option<&Path>) -> Vec<PathBuf> {
    std::iter::once(PathBuf::from(CONFIG_FILE))
        .chain(home.map(|h| h.join(".zunery").join(CONFIG_FILE)))
        .collect()
}

/// First candidate that exists, else the last one (loading it yields defaults).
fn first_existing(candidates: &[PathBuf]) -> PathBuf {
    candidates
        .iter()
        .find(|p| p.exists())
        .or_else(|| candidates.last())
        .cloned()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

pub fn find_config_path() -> PathBuf {
    first_existing(&config_candidates(dirs::home_dir().as_deref()))
}

/// Load configuration from a JSON file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read config '{}'", path.display()))
        }
    };
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config '{}'", path.display()))
}
