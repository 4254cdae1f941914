use anyhow::{Context, Result};
use qwiic_relay_core::RelayConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BUS: &str = "/dev/i2c-1";

/// Contents of `config.json`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub bus: Option<PathBuf>,
    pub relay: RelayConfig,
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("qwiic-relay").join("config.json"))
}

/// Reads `path`, or the default location when it exists. No file means defaults.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(AppConfig::default()),
        },
    };
    let text = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let cfg = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    log::debug!("loaded config from {}", path.display());
    Ok(cfg)
}
