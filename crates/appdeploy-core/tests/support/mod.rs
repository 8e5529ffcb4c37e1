#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use appdeploy_core::admin::{AdminApi, AdminError};
use appdeploy_core::config::{AppDeployConfig, parse_config_str};
use appdeploy_core::types::{DeploymentRequest, SupersededApplication};
use chrono::{TimeZone, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Distribute { app: String, points: Vec<String> },
    Superseded(String),
    Collections(String),
    Deploy(DeploymentRequest),
    ListPoints,
}

/// In-memory site that records every call.
#[derive(Debug, Default)]
pub struct FakeAdminApi {
    points: Vec<String>,
    superseded: HashMap<String, Vec<SupersededApplication>>,
    deployed_collections: HashMap<String, Vec<String>>,
    failing_distribution: HashSet<String>,
    failing_deployments: HashSet<(String, String)>,
    failing_supersedence: HashSet<String>,
    failing_collection_lookup: HashSet<String>,
    calls: Mutex<Vec<Call>>,
}

impl FakeAdminApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_points(mut self, points: &[&str]) -> Self {
        self.points = points.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_superseded(mut self, app: &str, superseded: Vec<SupersededApplication>) -> Self {
        self.superseded.insert(app.to_string(), superseded);
        self
    }

    pub fn with_deployments(mut self, app: &str, collections: &[&str]) -> Self {
        self.deployed_collections.insert(
            app.to_string(),
            collections.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    pub fn fail_distribution(mut self, app: &str) -> Self {
        self.failing_distribution.insert(app.to_string());
        self
    }

    pub fn fail_deployment(mut self, app: &str, collection: &str) -> Self {
        self.failing_deployments
            .insert((app.to_string(), collection.to_string()));
        self
    }

    pub fn fail_supersedence(mut self, app: &str) -> Self {
        self.failing_supersedence.insert(app.to_string());
        self
    }

    pub fn fail_collection_lookup(mut self, app: &str) -> Self {
        self.failing_collection_lookup.insert(app.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deployments(&self) -> Vec<DeploymentRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Deploy(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn deployments_for(&self, app: &str) -> Vec<DeploymentRequest> {
        self.deployments()
            .into_iter()
            .filter(|d| d.application_name == app)
            .collect()
    }

    pub fn distributions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Distribute { app, .. } => Some(app),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl AdminApi for FakeAdminApi {
    fn distribute_content(
        &self,
        application: &str,
        distribution_points: &[String],
    ) -> Result<(), AdminError> {
        self.record(Call::Distribute {
            app: application.to_string(),
            points: distribution_points.to_vec(),
        });
        if self.failing_distribution.contains(application) {
            return Err(AdminError::Timeout {
                operation: "distribute content",
                secs: 120,
            });
        }
        Ok(())
    }

    fn superseded_applications(
        &self,
        application: &str,
    ) -> Result<Vec<SupersededApplication>, AdminError> {
        self.record(Call::Superseded(application.to_string()));
        if self.failing_supersedence.contains(application) {
            return Err(AdminError::Request {
                operation: "supersedence lookup",
                message: "connection reset".to_string(),
            });
        }
        Ok(self.superseded.get(application).cloned().unwrap_or_default())
    }

    fn deployment_collections(&self, application: &str) -> Result<Vec<String>, AdminError> {
        self.record(Call::Collections(application.to_string()));
        if self.failing_collection_lookup.contains(application) {
            return Err(AdminError::Status {
                operation: "deployment lookup",
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        Ok(self
            .deployed_collections
            .get(application)
            .cloned()
            .unwrap_or_default())
    }

    fn create_deployment(&self, request: &DeploymentRequest) -> Result<(), AdminError> {
        self.record(Call::Deploy(request.clone()));
        let key = (
            request.application_name.clone(),
            request.target.collection_name.clone(),
        );
        if self.failing_deployments.contains(&key) {
            return Err(AdminError::NotFound {
                kind: "collection",
                name: request.target.collection_name.clone(),
            });
        }
        Ok(())
    }

    fn list_distribution_points(&self) -> Result<Vec<String>, AdminError> {
        self.record(Call::ListPoints);
        Ok(self.points.clone())
    }
}

pub fn superseded(name: &str, day: u32, is_deployed: bool) -> SupersededApplication {
    SupersededApplication {
        name: name.to_string(),
        date_created: Utc.with_ymd_and_hms(2024, 1, day, 8, 30, 0).unwrap(),
        is_deployed,
    }
}

/// Configuration with named distribution points and the given `[deployment]` body.
pub fn config_with_deployment(deployment: &str) -> AppDeployConfig {
    let toml = format!(
        r#"
site_code = "PS1"

[admin]
url = "https://cm01.example.com/AdminService"

[distribution]
points = ["dp01.example.com", "dp02.example.com"]

[deployment]
{deployment}
"#
    );
    parse_config_str(&toml).unwrap()
}
