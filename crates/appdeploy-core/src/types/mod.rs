//! Shared core types used across batch ingestion, deployment and notification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to an application in the packaging pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeAction {
    /// A brand new application was created.
    Create,
    /// The application was superseded by another application.
    Supersede,
    /// Any other action; never actionable.
    Other(String),
}

impl ChangeAction {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "create" => Self::Create,
            "supersede" => Self::Supersede,
            _ => Self::Other(value.trim().to_string()),
        }
    }
}

/// Result reported by the packaging pipeline for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    Ok,
    Fail,
}

/// A single entry of a batch descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub application_name: String,
    pub action: ChangeAction,
    pub status: RecordStatus,
    /// Application that supersedes this one (only meaningful for `Supersede`).
    pub superseded_by: Option<String>,
    /// Free-text comment as it appeared in the batch file.
    pub comment: Option<String>,
}

impl ChangeRecord {
    pub fn is_ok(&self) -> bool {
        self.status == RecordStatus::Ok
    }
}

/// An application that another application supersedes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersededApplication {
    pub name: String,
    pub date_created: DateTime<Utc>,
    pub is_deployed: bool,
}

/// Deployment purpose. Service window overrides only exist for required deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "purpose", rename_all = "kebab-case")]
pub enum DeployPurpose {
    Available,
    Required {
        override_service_window: bool,
        reboot_outside_service_window: bool,
    },
}

impl DeployPurpose {
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Required { .. } => "Required",
        }
    }
}

/// How much of the deployment the end user sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserExperience {
    #[default]
    DisplayAll,
    DisplaySoftwareCenterOnly,
    HideAll,
}

/// Whether an application is processed as a new app or as a superseding app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppRole {
    New,
    Superseding,
}

/// A collection and the policy a deployment to it uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    pub collection_name: String,
    pub purpose: DeployPurpose,
    pub user_experience: UserExperience,
}

/// Arguments of a single deployment creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub application_name: String,
    pub target: DeploymentTarget,
    pub comment: String,
}
