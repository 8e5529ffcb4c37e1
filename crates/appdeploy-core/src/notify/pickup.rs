//! Deliver mail through an SMTP pickup directory.
//!
//! The message is written under a temporary name and renamed into place so
//! the mail server never picks up a partial file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, Utc};

use super::{Notification, Notifier};
use crate::config::MailConfig;

#[derive(Debug, Clone)]
pub struct PickupDirNotifier {
    pickup_dir: PathBuf,
    from: String,
    to: Vec<String>,
}

impl PickupDirNotifier {
    pub fn new(pickup_dir: PathBuf, from: impl Into<String>, to: Vec<String>) -> Self {
        Self {
            pickup_dir,
            from: from.into(),
            to,
        }
    }

    /// Build from mail settings. `None` when mail is disabled.
    pub fn from_config(config: &MailConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        Some(Self::new(
            config.pickup_dir.clone()?,
            config.from.clone()?,
            config.to.clone(),
        ))
    }

    pub fn pickup_dir(&self) -> &Path {
        &self.pickup_dir
    }

    /// Render an RFC 5322 message.
    pub fn render(&self, notification: &Notification) -> String {
        let now = Local::now();
        let message_id = format!(
            "<appdeploy.{}@{}>",
            Utc::now().format("%Y%m%d%H%M%S%f"),
            domain_of(&self.from)
        );

        let to = self.to.join(", ");
        let date = now.to_rfc2822();

        let mut message = String::new();
        for (name, value) in [
            ("From", self.from.as_str()),
            ("To", to.as_str()),
            ("Subject", notification.subject.as_str()),
            ("Date", date.as_str()),
            ("Message-ID", message_id.as_str()),
            ("MIME-Version", "1.0"),
            ("Content-Type", "text/plain; charset=utf-8"),
            ("Content-Transfer-Encoding", "8bit"),
        ] {
            message.push_str(name);
            message.push_str(": ");
            message.push_str(&sanitize_header(value));
            message.push_str("\r\n");
        }
        message.push_str("\r\n");
        for line in notification.body.lines() {
            // Dot-stuffing for servers that relay the file verbatim
            if line.starts_with('.') {
                message.push('.');
            }
            message.push_str(line);
            message.push_str("\r\n");
        }
        message
    }
}

impl Notifier for PickupDirNotifier {
    fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.pickup_dir).with_context(|| {
            format!(
                "Failed to create pickup directory: {}",
                self.pickup_dir.display()
            )
        })?;

        let stem = format!("appdeploy-{}", Utc::now().format("%Y%m%d%H%M%S%f"));
        let tmp_path = self.pickup_dir.join(format!("{stem}.tmp"));
        let eml_path = self.pickup_dir.join(format!("{stem}.eml"));

        std::fs::write(&tmp_path, self.render(notification))
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &eml_path)
            .with_context(|| format!("Failed to move mail into {}", eml_path.display()))?;

        tracing::info!(path = %eml_path.display(), recipients = self.to.len(), "notification queued");
        Ok(())
    }
}

fn sanitize_header(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn domain_of(address: &str) -> &str {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim_end_matches('>'))
        .filter(|d| !d.is_empty())
        .unwrap_or("localhost")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn notification() -> Notification {
        Notification {
            subject: "[appdeploy] PS1: 1 superseding, 0 new, 0 failed".to_string(),
            body: "Line one\n.hidden\n".to_string(),
        }
    }

    #[test]
    fn test_render_headers_and_body() {
        let notifier = PickupDirNotifier::new(
            PathBuf::from("/unused"),
            "appdeploy@example.com",
            vec!["ops@example.com".to_string(), "dev@example.com".to_string()],
        );

        let message = notifier.render(&notification());
        assert!(message.starts_with("From: appdeploy@example.com\r\n"));
        assert!(message.contains("To: ops@example.com, dev@example.com\r\n"));
        assert!(message.contains("Subject: [appdeploy] PS1: 1 superseding, 0 new, 0 failed\r\n"));
        assert!(message.contains("@example.com>\r\n"));
        assert!(message.contains("\r\n\r\nLine one\r\n..hidden\r\n"));
    }

    #[test]
    fn test_header_injection_is_flattened() {
        assert_eq!(sanitize_header("a\r\nBcc: x"), "a  Bcc: x");
    }

    #[test]
    fn test_send_writes_eml_file() {
        let temp = TempDir::new().unwrap();
        let pickup = temp.path().join("pickup");
        let notifier = PickupDirNotifier::new(
            pickup.clone(),
            "appdeploy@example.com",
            vec!["ops@example.com".to_string()],
        );

        notifier.send(&notification()).unwrap();

        let files: Vec<_> = std::fs::read_dir(&pickup)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].extension().unwrap(), "eml");
    }

    #[test]
    fn test_from_config_disabled() {
        let config = MailConfig::default();
        assert!(PickupDirNotifier::from_config(&config).is_none());
    }
}
