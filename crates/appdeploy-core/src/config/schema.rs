//! Configuration schema for appdeploy.toml
//!
//! Everything a run needs is static and loaded before the batch is read:
//! site identity, administration service endpoint, distribution points,
//! deployment policy and mail settings.

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::types::{DeployPurpose, UserExperience};

/// Distribution point keyword that expands to every distribution point.
pub const ALL_DISTRIBUTION_POINTS: &str = "All";

/// Root configuration structure for appdeploy.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDeployConfig {
    /// Site code of the management site
    pub site_code: String,

    /// Where processed batch files are copied
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,

    /// Administration service connection
    pub admin: AdminConfig,

    /// Content distribution settings
    pub distribution: DistributionConfig,

    /// Deployment policy
    #[serde(default)]
    pub deployment: DeploymentConfig,

    /// Notification mail settings
    #[serde(default)]
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Base URL of the administration service, e.g. https://cm01/AdminService
    pub url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Basic auth user name
    #[serde(default)]
    pub username: Option<String>,

    /// Environment variable holding the password for `username`
    #[serde(default)]
    pub password_env: Option<String>,
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Distribution point names, or the single keyword "All"
    pub points: Vec<String>,
}

impl DistributionConfig {
    pub fn is_all(&self) -> bool {
        matches!(self.points.as_slice(), [only] if only.eq_ignore_ascii_case(ALL_DISTRIBUTION_POINTS))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PurposeSetting {
    #[default]
    Available,
    Required,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub purpose: PurposeSetting,

    #[serde(default)]
    pub user_experience: UserExperience,

    /// Install outside maintenance windows (required deployments only)
    #[serde(default)]
    pub override_service_window: bool,

    /// Allow restarts outside maintenance windows (required deployments only)
    #[serde(default)]
    pub reboot_outside_service_window: bool,

    /// Deploy superseding apps to the collections the superseded app is deployed to
    #[serde(default = "default_inherit")]
    pub inherit_superseded_collections: bool,

    /// Collections every new application is deployed to
    #[serde(default)]
    pub new_app_collections: Vec<String>,

    /// Collections every superseding application is deployed to
    #[serde(default)]
    pub superseding_app_collections: Vec<String>,
}

fn default_inherit() -> bool {
    true
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            purpose: PurposeSetting::default(),
            user_experience: UserExperience::default(),
            override_service_window: false,
            reboot_outside_service_window: false,
            inherit_superseded_collections: default_inherit(),
            new_app_collections: Vec::new(),
            superseding_app_collections: Vec::new(),
        }
    }
}

impl DeploymentConfig {
    pub fn deploy_purpose(&self) -> DeployPurpose {
        match self.purpose {
            PurposeSetting::Available => DeployPurpose::Available,
            PurposeSetting::Required => DeployPurpose::Required {
                override_service_window: self.override_service_window,
                reboot_outside_service_window: self.reboot_outside_service_window,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub from: Option<String>,

    #[serde(default)]
    pub to: Vec<String>,

    /// SMTP pickup directory watched by the mail server
    #[serde(default)]
    pub pickup_dir: Option<PathBuf>,

    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

fn default_subject_prefix() -> String {
    "[appdeploy]".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            from: None,
            to: Vec::new(),
            pickup_dir: None,
            subject_prefix: default_subject_prefix(),
        }
    }
}

impl AppDeployConfig {
    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.site_code.trim().is_empty() {
            anyhow::bail!("site_code must not be empty");
        }

        self.validate_admin().context("Invalid [admin] configuration")?;
        self.validate_distribution()
            .context("Invalid [distribution] configuration")?;
        self.validate_deployment()
            .context("Invalid [deployment] configuration")?;
        if self.mail.enabled {
            self.validate_mail().context("Invalid [mail] configuration")?;
        }

        Ok(())
    }

    fn validate_admin(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.admin.url)
            .with_context(|| format!("url is not a valid URL: '{}'", self.admin.url))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            anyhow::bail!("url must use http or https, got '{}'", url.scheme());
        }
        if self.admin.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if self.admin.password_env.is_some() && self.admin.username.is_none() {
            anyhow::bail!("password_env requires username");
        }
        Ok(())
    }

    fn validate_distribution(&self) -> anyhow::Result<()> {
        if self.distribution.points.is_empty() {
            anyhow::bail!("points must list at least one distribution point or \"All\"");
        }
        if self.distribution.points.iter().any(|p| p.trim().is_empty()) {
            anyhow::bail!("points must not contain empty names");
        }
        if !self.distribution.is_all()
            && self
                .distribution
                .points
                .iter()
                .any(|p| p.eq_ignore_ascii_case(ALL_DISTRIBUTION_POINTS))
        {
            anyhow::bail!("\"All\" cannot be combined with named distribution points");
        }
        Ok(())
    }

    fn validate_deployment(&self) -> anyhow::Result<()> {
        let deployment = &self.deployment;
        if deployment.purpose == PurposeSetting::Available
            && (deployment.override_service_window || deployment.reboot_outside_service_window)
        {
            anyhow::bail!(
                "override_service_window and reboot_outside_service_window only apply to purpose = \"required\""
            );
        }
        let all = deployment
            .new_app_collections
            .iter()
            .chain(&deployment.superseding_app_collections);
        for collection in all {
            if collection.trim().is_empty() {
                anyhow::bail!("collection names must not be empty");
            }
        }
        Ok(())
    }

    fn validate_mail(&self) -> anyhow::Result<()> {
        if self.mail.from.as_deref().is_none_or(|f| f.trim().is_empty()) {
            anyhow::bail!("from is required when mail is enabled");
        }
        if self.mail.to.is_empty() {
            anyhow::bail!("to must list at least one recipient when mail is enabled");
        }
        if self.mail.pickup_dir.is_none() {
            anyhow::bail!("pickup_dir is required when mail is enabled");
        }
        Ok(())
    }
}
