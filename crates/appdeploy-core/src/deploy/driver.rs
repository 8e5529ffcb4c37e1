//! Batch driver: decide which applications to process and in which role.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::deploy::executor::DeploymentOrchestrator;
use crate::deploy::outcome::RunOutcome;
use crate::types::{AppRole, ChangeAction, ChangeRecord, RecordStatus};

/// The work a batch implies, before anything is sent to the site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    /// Applications that supersede something, processed first
    pub superseding: Vec<String>,
    /// Newly created applications not already in `superseding`
    pub new_apps: Vec<String>,
    /// Records the packaging pipeline reported as failed
    pub failed: Vec<ChangeRecord>,
    /// Successful supersede records without a superseding application
    pub unresolved: Vec<ChangeRecord>,
}

impl BatchPlan {
    pub fn from_records(records: &[ChangeRecord]) -> Self {
        let mut plan = BatchPlan::default();
        let mut seen = HashSet::new();

        for record in records.iter().filter(|r| r.is_ok()) {
            if record.action != ChangeAction::Supersede {
                continue;
            }
            match &record.superseded_by {
                Some(name) => {
                    if seen.insert(name.to_lowercase()) {
                        plan.superseding.push(name.clone());
                    }
                }
                None => {
                    tracing::warn!(
                        app = %record.application_name,
                        "superseded record does not name its superseding application"
                    );
                    plan.unresolved.push(record.clone());
                }
            }
        }

        for record in records.iter().filter(|r| r.is_ok()) {
            if record.action != ChangeAction::Create {
                continue;
            }
            if seen.insert(record.application_name.to_lowercase()) {
                plan.new_apps.push(record.application_name.clone());
            } else {
                tracing::debug!(
                    app = %record.application_name,
                    "already handled as superseding application"
                );
            }
        }

        plan.failed = records
            .iter()
            .filter(|r| r.status == RecordStatus::Fail)
            .cloned()
            .collect();

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.superseding.is_empty()
            && self.new_apps.is_empty()
            && self.failed.is_empty()
            && self.unresolved.is_empty()
    }
}

pub struct BatchDriver<'a> {
    orchestrator: DeploymentOrchestrator<'a>,
}

impl<'a> BatchDriver<'a> {
    pub fn new(orchestrator: DeploymentOrchestrator<'a>) -> Self {
        Self { orchestrator }
    }

    /// Process superseding applications, then new applications.
    pub fn run(&self, plan: &BatchPlan) -> RunOutcome {
        let mut outcome = RunOutcome {
            failed_records: plan.failed.clone(),
            unresolved_records: plan.unresolved.clone(),
            ..RunOutcome::default()
        };

        tracing::info!(
            superseding = plan.superseding.len(),
            new = plan.new_apps.len(),
            failed = plan.failed.len(),
            unresolved = plan.unresolved.len(),
            "starting batch"
        );

        for application in &plan.superseding {
            outcome.record(
                self.orchestrator
                    .process_application(application, AppRole::Superseding),
            );
        }
        for application in &plan.new_apps {
            outcome.record(self.orchestrator.process_application(application, AppRole::New));
        }

        tracing::info!(
            succeeded = outcome.superseded_success.len() + outcome.new_success.len(),
            failed = outcome.superseded_failed.len() + outcome.new_failed.len(),
            "batch finished"
        );
        outcome
    }
}
