//! Results of processing applications and whole batches.

use serde::{Deserialize, Serialize};

use crate::types::{AppRole, ChangeRecord, SupersededApplication};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "error", rename_all = "kebab-case")]
pub enum DistributionStatus {
    Distributed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDeployment {
    pub collection: String,
    /// `None` when the deployment was created
    pub error: Option<String>,
}

impl CollectionDeployment {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// What happened to one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationReport {
    pub application: String,
    pub role: AppRole,
    pub distribution: DistributionStatus,
    pub superseded: Option<SupersededApplication>,
    pub deployments: Vec<CollectionDeployment>,
}

impl ApplicationReport {
    pub fn new(application: impl Into<String>, role: AppRole) -> Self {
        Self {
            application: application.into(),
            role,
            distribution: DistributionStatus::Distributed,
            superseded: None,
            deployments: Vec::new(),
        }
    }

    /// Content was distributed and every attempted deployment was created.
    pub fn succeeded(&self) -> bool {
        self.distribution == DistributionStatus::Distributed
            && self.deployments.iter().all(CollectionDeployment::succeeded)
    }

    pub fn failed_deployments(&self) -> impl Iterator<Item = &CollectionDeployment> {
        self.deployments.iter().filter(|d| !d.succeeded())
    }
}

/// Accumulated results of a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutcome {
    pub superseded_success: Vec<String>,
    pub superseded_failed: Vec<String>,
    pub new_success: Vec<String>,
    pub new_failed: Vec<String>,
    /// Batch records reported as failed by the packaging pipeline
    pub failed_records: Vec<ChangeRecord>,
    /// Successful supersede records that name no superseding application
    #[serde(default)]
    pub unresolved_records: Vec<ChangeRecord>,
    pub reports: Vec<ApplicationReport>,
}

impl RunOutcome {
    pub fn record(&mut self, report: ApplicationReport) {
        let name = report.application.clone();
        match (report.role, report.succeeded()) {
            (AppRole::Superseding, true) => self.superseded_success.push(name),
            (AppRole::Superseding, false) => self.superseded_failed.push(name),
            (AppRole::New, true) => self.new_success.push(name),
            (AppRole::New, false) => self.new_failed.push(name),
        }
        self.reports.push(report);
    }

    pub fn processed_count(&self) -> usize {
        self.reports.len()
    }

    /// Any application that failed to distribute or deploy.
    pub fn has_failures(&self) -> bool {
        !self.superseded_failed.is_empty() || !self.new_failed.is_empty()
    }

    /// Nothing processed and nothing to report.
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
            && self.failed_records.is_empty()
            && self.unresolved_records.is_empty()
    }

    pub fn report_for(&self, application: &str) -> Option<&ApplicationReport> {
        self.reports.iter().find(|r| r.application == application)
    }
}
