//! Execute the per-application deployment sequence.
//!
//! For every application: distribute content, then resolve target
//! collections, then create one deployment per collection. A distribution
//! failure ends processing of that application; a deployment failure only
//! skips its collection.

use std::cell::RefCell;

use chrono::{DateTime, Local};

use crate::admin::{AdminApi, AdminError};
use crate::config::AppDeployConfig;
use crate::deploy::outcome::{ApplicationReport, CollectionDeployment, DistributionStatus};
use crate::deploy::resolver::resolve_latest_superseded;
use crate::deploy::targeting::TargetingPolicy;
use crate::types::{
    AppRole, DeployPurpose, DeploymentRequest, DeploymentTarget, SupersededApplication,
    UserExperience,
};

const COMMENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Where content is distributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributionPoints {
    /// Every distribution point the site knows about
    All,
    Named(Vec<String>),
}

/// Immutable settings of a deployment run.
#[derive(Debug, Clone)]
pub struct DeploymentSettings {
    pub distribution_points: DistributionPoints,
    pub purpose: DeployPurpose,
    pub user_experience: UserExperience,
    pub targeting: TargetingPolicy,
    /// Stamped into every deployment comment
    pub run_started: DateTime<Local>,
}

impl DeploymentSettings {
    pub fn from_config(config: &AppDeployConfig, run_started: DateTime<Local>) -> Self {
        let distribution_points = if config.distribution.is_all() {
            DistributionPoints::All
        } else {
            DistributionPoints::Named(config.distribution.points.clone())
        };

        Self {
            distribution_points,
            purpose: config.deployment.deploy_purpose(),
            user_experience: config.deployment.user_experience,
            targeting: TargetingPolicy::from_config(&config.deployment),
            run_started,
        }
    }
}

pub struct DeploymentOrchestrator<'a> {
    api: &'a dyn AdminApi,
    settings: DeploymentSettings,
    all_points: RefCell<Option<Vec<String>>>,
}

impl<'a> DeploymentOrchestrator<'a> {
    pub fn new(api: &'a dyn AdminApi, settings: DeploymentSettings) -> Self {
        Self {
            api,
            settings,
            all_points: RefCell::new(None),
        }
    }

    pub fn settings(&self) -> &DeploymentSettings {
        &self.settings
    }

    /// Run the full sequence for one application.
    pub fn process_application(&self, application: &str, role: AppRole) -> ApplicationReport {
        let mut report = ApplicationReport::new(application, role);
        tracing::info!(app = application, ?role, "processing application");

        if let Err(error) = self.distribute(application) {
            tracing::error!(
                app = application,
                %error,
                "content distribution failed, skipping deployments"
            );
            report.distribution = DistributionStatus::Failed(error.to_string());
            return report;
        }
        tracing::info!(app = application, "content distributed");

        if role == AppRole::Superseding {
            report.superseded = self.resolve_superseded(application);
        }

        let collections = self.settings.targeting.resolve_target_collections(
            self.api,
            application,
            role,
            report.superseded.as_ref(),
        );
        if collections.is_empty() {
            tracing::info!(app = application, "no target collections, nothing to deploy");
            return report;
        }

        let comment = deployment_comment(
            role,
            report.superseded.as_ref(),
            self.settings.run_started,
        );
        for collection in collections {
            report
                .deployments
                .push(self.deploy_to(application, collection, &comment));
        }

        report
    }

    fn distribute(&self, application: &str) -> Result<(), AdminError> {
        let points = self.distribution_points()?;
        tracing::debug!(app = application, points = points.len(), "distributing content");
        self.api.distribute_content(application, &points)
    }

    fn distribution_points(&self) -> Result<Vec<String>, AdminError> {
        match &self.settings.distribution_points {
            DistributionPoints::Named(points) => Ok(points.clone()),
            DistributionPoints::All => {
                if let Some(points) = self.all_points.borrow().as_ref() {
                    return Ok(points.clone());
                }
                let points = self.api.list_distribution_points()?;
                if points.is_empty() {
                    return Err(AdminError::NotFound {
                        kind: "distribution point",
                        name: crate::config::ALL_DISTRIBUTION_POINTS.to_string(),
                    });
                }
                *self.all_points.borrow_mut() = Some(points.clone());
                Ok(points)
            }
        }
    }

    fn resolve_superseded(&self, application: &str) -> Option<SupersededApplication> {
        match resolve_latest_superseded(self.api, application) {
            Ok(Some(superseded)) => {
                if superseded.is_deployed {
                    tracing::info!(
                        app = application,
                        superseded = %superseded.name,
                        "supersedes deployed application"
                    );
                } else {
                    tracing::info!(
                        app = application,
                        superseded = %superseded.name,
                        "superseded application is not deployed"
                    );
                }
                Some(superseded)
            }
            Ok(None) => {
                tracing::info!(app = application, "no superseded application found");
                None
            }
            Err(error) => {
                tracing::warn!(
                    app = application,
                    %error,
                    "could not resolve superseded application"
                );
                None
            }
        }
    }

    fn deploy_to(&self, application: &str, collection: String, comment: &str) -> CollectionDeployment {
        let request = DeploymentRequest {
            application_name: application.to_string(),
            target: DeploymentTarget {
                collection_name: collection.clone(),
                purpose: self.settings.purpose,
                user_experience: self.settings.user_experience,
            },
            comment: comment.to_string(),
        };

        match self.api.create_deployment(&request) {
            Ok(()) => {
                tracing::info!(
                    app = application,
                    collection = %collection,
                    purpose = self.settings.purpose.label(),
                    "deployment created"
                );
                CollectionDeployment {
                    collection,
                    error: None,
                }
            }
            Err(error) => {
                tracing::error!(
                    app = application,
                    collection = %collection,
                    %error,
                    "deployment failed"
                );
                CollectionDeployment {
                    collection,
                    error: Some(error.to_string()),
                }
            }
        }
    }
}

/// Description attached to every deployment created in a run.
pub fn deployment_comment(
    role: AppRole,
    superseded: Option<&SupersededApplication>,
    run_started: DateTime<Local>,
) -> String {
    let stamp = run_started.format(COMMENT_TIME_FORMAT);
    match (role, superseded) {
        (AppRole::Superseding, Some(old)) => {
            format!("Supersedes {}. Deployed by appdeploy on {}", old.name, stamp)
        }
        (AppRole::Superseding, None) => {
            format!("Superseding application. Deployed by appdeploy on {}", stamp)
        }
        (AppRole::New, _) => format!("New application. Deployed by appdeploy on {}", stamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_comment_names_superseded_app() {
        let ts = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        let old = SupersededApplication {
            name: "Foo 1.0".to_string(),
            date_created: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            is_deployed: true,
        };

        assert_eq!(
            deployment_comment(AppRole::Superseding, Some(&old), ts),
            "Supersedes Foo 1.0. Deployed by appdeploy on 2024-03-05 14:07"
        );
        assert_eq!(
            deployment_comment(AppRole::New, None, ts),
            "New application. Deployed by appdeploy on 2024-03-05 14:07"
        );
        assert!(deployment_comment(AppRole::Superseding, None, ts).starts_with("Superseding"));
    }
}
