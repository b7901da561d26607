// Path: crates/manager/src/config.rs
use anyhow::{anyhow, Context, Result};
use mnlist_types::config::RegistryConfig;
use std::fs;
use std::path::Path;

/// Reads and validates a registry configuration file.
pub fn load_config(path: &Path) -> Result<RegistryConfig> {
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("reading registry config {}", path.display()))?;
    let config: RegistryConfig = toml::from_str(&config_str)
        .with_context(|| format!("parsing registry config {}", path.display()))?;
    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}
