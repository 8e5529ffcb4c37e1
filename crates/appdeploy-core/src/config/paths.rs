//! Config path resolution helpers.

use std::path::PathBuf;

pub const CONFIG_FILE_NAME: &str = "appdeploy.toml";

/// Default location: `<config dir>/appdeploy/appdeploy.toml`
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("appdeploy").join(CONFIG_FILE_NAME))
}
