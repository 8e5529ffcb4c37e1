//! Run summary notifications.

pub mod pickup;

use std::fmt::Write as _;

use crate::deploy::{ApplicationReport, DistributionStatus, RunOutcome};
use crate::types::{AppRole, ChangeRecord};

pub use pickup::PickupDirNotifier;

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

/// Delivers notifications.
pub trait Notifier {
    fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Summarise a run. Returns `None` when there is nothing to report.
pub fn compose_notification(
    outcome: &RunOutcome,
    site_code: &str,
    subject_prefix: &str,
) -> Option<Notification> {
    if outcome.is_empty() {
        return None;
    }

    let superseding = outcome.superseded_success.len() + outcome.superseded_failed.len();
    let new = outcome.new_success.len() + outcome.new_failed.len();
    let failed = outcome.superseded_failed.len()
        + outcome.new_failed.len()
        + outcome.failed_records.len();

    let mut subject = format!(
        "{} {}: {} superseding, {} new, {} failed",
        subject_prefix, site_code, superseding, new, failed
    )
    .trim()
    .to_string();
    if !outcome.unresolved_records.is_empty() {
        let _ = write!(subject, ", {} unresolved", outcome.unresolved_records.len());
    }

    let mut body = String::new();
    let _ = writeln!(body, "Deployment run on site {site_code}");
    let _ = writeln!(body);

    write_section(
        &mut body,
        "Superseding applications",
        outcome
            .reports
            .iter()
            .filter(|r| r.role == AppRole::Superseding),
    );
    write_section(
        &mut body,
        "New applications",
        outcome
            .reports
            .iter()
            .filter(|r| r.role == AppRole::New),
    );

    write_records(&mut body, "Failed in packaging", &outcome.failed_records);
    write_records(
        &mut body,
        "Superseded without a named replacement",
        &outcome.unresolved_records,
    );

    Some(Notification { subject, body })
}

fn write_records(body: &mut String, title: &str, records: &[ChangeRecord]) {
    if records.is_empty() {
        return;
    }

    let _ = writeln!(body, "{} ({}):", title, records.len());
    for record in records {
        match &record.comment {
            Some(comment) => {
                let _ = writeln!(body, "  - {} ({})", record.application_name, comment);
            }
            None => {
                let _ = writeln!(body, "  - {}", record.application_name);
            }
        }
    }
    let _ = writeln!(body);
}

fn write_section<'a>(
    body: &mut String,
    title: &str,
    reports: impl Iterator<Item = &'a ApplicationReport>,
) {
    let reports: Vec<_> = reports.collect();
    if reports.is_empty() {
        return;
    }

    let _ = writeln!(body, "{} ({}):", title, reports.len());
    for report in reports {
        let status = if report.succeeded() { "OK" } else { "FAILED" };
        let _ = writeln!(body, "  - {} [{}]", report.application, status);

        if let Some(old) = &report.superseded {
            let _ = writeln!(body, "      supersedes: {}", old.name);
        }
        if let DistributionStatus::Failed(error) = &report.distribution {
            let _ = writeln!(body, "      content distribution failed: {}", error);
            continue;
        }
        if report.deployments.is_empty() {
            let _ = writeln!(body, "      no target collections");
        }
        for deployment in &report.deployments {
            match &deployment.error {
                None => {
                    let _ = writeln!(body, "      deployed to {}", deployment.collection);
                }
                Some(error) => {
                    let _ = writeln!(
                        body,
                        "      deployment to {} failed: {}",
                        deployment.collection, error
                    );
                }
            }
        }
    }
    let _ = writeln!(body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::CollectionDeployment;
    use crate::types::{ChangeAction, RecordStatus};

    #[test]
    fn test_empty_outcome_sends_nothing() {
        assert!(compose_notification(&RunOutcome::default(), "PS1", "[appdeploy]").is_none());
    }

    #[test]
    fn test_summary_lists_every_group() {
        let mut outcome = RunOutcome::default();

        let mut bar = ApplicationReport::new("Bar 2.0", AppRole::Superseding);
        bar.deployments.push(CollectionDeployment {
            collection: "Pilot".to_string(),
            error: None,
        });
        outcome.record(bar);

        let mut baz = ApplicationReport::new("Baz", AppRole::New);
        baz.distribution = DistributionStatus::Failed("HTTP 503".to_string());
        outcome.record(baz);

        outcome.failed_records.push(ChangeRecord {
            application_name: "Qux".to_string(),
            action: ChangeAction::Create,
            status: RecordStatus::Fail,
            superseded_by: None,
            comment: Some("MSI missing".to_string()),
        });

        let notification = compose_notification(&outcome, "PS1", "[appdeploy]").unwrap();
        assert_eq!(
            notification.subject,
            "[appdeploy] PS1: 1 superseding, 1 new, 2 failed"
        );
        assert!(notification.body.contains("Bar 2.0 [OK]"));
        assert!(notification.body.contains("deployed to Pilot"));
        assert!(notification.body.contains("Baz [FAILED]"));
        assert!(notification.body.contains("content distribution failed: HTTP 503"));
        assert!(notification.body.contains("Qux (MSI missing)"));
        assert!(!notification.body.contains("without a named replacement"));
    }

    #[test]
    fn test_unresolved_records_alone_are_reported() {
        let outcome = RunOutcome {
            unresolved_records: vec![ChangeRecord {
                application_name: "Foo".to_string(),
                action: ChangeAction::Supersede,
                status: RecordStatus::Ok,
                superseded_by: None,
                comment: Some("Replaced by Bar".to_string()),
            }],
            ..RunOutcome::default()
        };

        let notification = compose_notification(&outcome, "PS1", "[appdeploy]").unwrap();
        assert_eq!(
            notification.subject,
            "[appdeploy] PS1: 0 superseding, 0 new, 0 failed, 1 unresolved"
        );
        assert!(
            notification
                .body
                .contains("Superseded without a named replacement (1):")
        );
        assert!(notification.body.contains("Foo (Replaced by Bar)"));
    }
}
