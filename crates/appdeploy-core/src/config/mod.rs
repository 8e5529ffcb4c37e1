//! Configuration loading and validation
//!
//! The configuration is read once before a run and then passed by reference
//! into the orchestrator; nothing mutates it afterwards.

pub mod parser;
pub mod paths;
pub mod schema;

use std::path::Path;

pub use parser::{parse_config, parse_config_str};
pub use paths::default_config_path;
pub use schema::{
    ALL_DISTRIBUTION_POINTS, AdminConfig, AppDeployConfig, DeploymentConfig, DistributionConfig,
    MailConfig, PurposeSetting,
};

/// Load the configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppDeployConfig> {
    match path {
        Some(path) => parse_config(path),
        None => {
            let path = default_config_path()?;
            if !path.exists() {
                anyhow::bail!(
                    "No configuration found at {} (use --config to point at one)",
                    path.display()
                );
            }
            parse_config(&path)
        }
    }
}
