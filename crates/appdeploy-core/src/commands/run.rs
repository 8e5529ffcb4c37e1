//! Run command implementation.
//!
//! Drives a loaded batch through the deployment orchestrator, keeps a backup
//! of the batch file and sends the summary notification.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::admin::AdminApi;
use crate::batch::backup_batch_file;
use crate::commands::plan::PlanReport;
use crate::config::AppDeployConfig;
use crate::deploy::{BatchDriver, DeploymentOrchestrator, DeploymentSettings, RunOutcome};
use crate::notify::{Notifier, compose_notification};

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub backup_path: Option<PathBuf>,
    pub notification_sent: bool,
}

pub struct RunCommand<'a> {
    config: &'a AppDeployConfig,
    run_started: DateTime<Local>,
}

impl<'a> RunCommand<'a> {
    pub fn new(config: &'a AppDeployConfig) -> Self {
        Self {
            config,
            run_started: Local::now(),
        }
    }

    /// Pin the run timestamp used in comments and backup names.
    pub fn with_run_started(mut self, run_started: DateTime<Local>) -> Self {
        self.run_started = run_started;
        self
    }

    /// Process the batch. Per-application failures are part of the report;
    /// backup and notification failures are logged and do not fail the run.
    pub fn execute(
        &self,
        batch: &PlanReport,
        api: &dyn AdminApi,
        notifier: Option<&dyn Notifier>,
    ) -> anyhow::Result<RunReport> {
        let backup_path = self.backup(batch);

        let settings = DeploymentSettings::from_config(self.config, self.run_started);
        let driver = BatchDriver::new(DeploymentOrchestrator::new(api, settings));
        let outcome = driver.run(&batch.plan);

        let notification_sent = match notifier {
            Some(notifier) => self.notify(&outcome, notifier),
            None => false,
        };

        Ok(RunReport {
            outcome,
            backup_path,
            notification_sent,
        })
    }

    fn backup(&self, batch: &PlanReport) -> Option<PathBuf> {
        let backup_dir = self.config.backup_dir.as_ref()?;
        match backup_batch_file(&batch.batch_path, backup_dir, self.run_started) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "batch file backed up");
                Some(path)
            }
            Err(error) => {
                tracing::warn!(error = %format!("{error:#}"), "could not back up batch file");
                None
            }
        }
    }

    fn notify(&self, outcome: &RunOutcome, notifier: &dyn Notifier) -> bool {
        let Some(notification) = compose_notification(
            outcome,
            &self.config.site_code,
            &self.config.mail.subject_prefix,
        ) else {
            tracing::info!("nothing to report, no notification sent");
            return false;
        };

        match notifier.send(&notification) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(error = %format!("{error:#}"), "could not send notification");
                false
            }
        }
    }
}
