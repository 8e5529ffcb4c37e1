//! Collection targeting policy for new and superseding applications.

use crate::admin::AdminApi;
use crate::config::DeploymentConfig;
use crate::types::{AppRole, SupersededApplication};

/// Policy for determining which collections an application is deployed to.
#[derive(Debug, Clone, Default)]
pub struct TargetingPolicy {
    /// Copy the superseded app's deployments onto the superseding app
    inherit_superseded_collections: bool,
    /// Static targets for new applications
    new_app_collections: Vec<String>,
    /// Static targets added for every superseding application
    superseding_app_collections: Vec<String>,
}

impl TargetingPolicy {
    pub fn new(
        inherit_superseded_collections: bool,
        new_app_collections: Vec<String>,
        superseding_app_collections: Vec<String>,
    ) -> Self {
        Self {
            inherit_superseded_collections,
            new_app_collections,
            superseding_app_collections,
        }
    }

    pub fn from_config(config: &DeploymentConfig) -> Self {
        Self::new(
            config.inherit_superseded_collections,
            config.new_app_collections.clone(),
            config.superseding_app_collections.clone(),
        )
    }

    /// Collections `application` should be deployed to. An empty list means
    /// no deployments.
    pub fn resolve_target_collections(
        &self,
        api: &dyn AdminApi,
        application: &str,
        role: AppRole,
        superseded: Option<&SupersededApplication>,
    ) -> Vec<String> {
        match role {
            AppRole::New => dedupe_collections(self.new_app_collections.iter().cloned()),
            AppRole::Superseding => {
                let inherited = self.inherited_collections(api, application, superseded);
                dedupe_collections(
                    inherited
                        .into_iter()
                        .chain(self.superseding_app_collections.iter().cloned()),
                )
            }
        }
    }

    fn inherited_collections(
        &self,
        api: &dyn AdminApi,
        application: &str,
        superseded: Option<&SupersededApplication>,
    ) -> Vec<String> {
        if !self.inherit_superseded_collections {
            return Vec::new();
        }
        let Some(superseded) = superseded.filter(|s| s.is_deployed) else {
            return Vec::new();
        };

        match api.deployment_collections(&superseded.name) {
            Ok(collections) => {
                tracing::info!(
                    app = application,
                    superseded = %superseded.name,
                    count = collections.len(),
                    "inheriting deployment collections"
                );
                collections
            }
            Err(error) => {
                tracing::warn!(
                    app = application,
                    superseded = %superseded.name,
                    %error,
                    "could not read deployments of superseded application"
                );
                Vec::new()
            }
        }
    }
}

/// Drop blank and repeated collection names (case-insensitive), keeping the
/// first spelling and the original order.
pub fn dedupe_collections(collections: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for collection in collections {
        let collection = collection.trim().to_string();
        if collection.is_empty() {
            continue;
        }
        if result.iter().any(|c| c.eq_ignore_ascii_case(&collection)) {
            continue;
        }
        result.push(collection);
    }
    result
}
