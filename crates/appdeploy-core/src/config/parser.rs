//! TOML parser with helpful error messages

use super::schema::AppDeployConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse appdeploy.toml with detailed error messages
pub fn parse_config(path: &Path) -> Result<AppDeployConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse appdeploy.toml content from string
pub fn parse_config_str(content: &str) -> Result<AppDeployConfig> {
    let config: AppDeployConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate()?;

    Ok(config)
}

/// Enhance TOML parsing errors with the offending lines
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.to_string();

    let line_hint = error.span().map(|span| {
        content[..span.start.min(content.len())]
            .chars()
            .filter(|c| *c == '\n')
            .count()
            + 1
    });

    if let Some(line_num) = line_hint {
        let context = get_line_context(content, line_num);
        anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            context,
            error_msg
        )
    } else {
        anyhow::anyhow!("TOML parsing error: {}", error_msg)
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2).min(lines.len());
    let end = (line_num + 2).min(lines.len());

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::PurposeSetting;
    use crate::types::{DeployPurpose, UserExperience};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
site_code = "PS1"

[admin]
url = "https://cm01.example.com/AdminService"

[distribution]
points = ["All"]
"#;

    #[test]
    fn test_parse_minimal_config() {
        let config = parse_config_str(MINIMAL).unwrap();
        assert_eq!(config.site_code, "PS1");
        assert_eq!(config.admin.timeout_secs, 120);
        assert!(config.distribution.is_all());
        assert_eq!(config.deployment.purpose, PurposeSetting::Available);
        assert_eq!(config.deployment.user_experience, UserExperience::DisplayAll);
        assert!(config.deployment.inherit_superseded_collections);
        assert!(!config.mail.enabled);
        assert_eq!(config.mail.subject_prefix, "[appdeploy]");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
site_code = "PS1"
backup_dir = "/var/lib/appdeploy/backup"

[admin]
url = "https://cm01.example.com/AdminService"
timeout_secs = 30
username = "svc-deploy"
password_env = "APPDEPLOY_PASSWORD"

[distribution]
points = ["dp01.example.com", "dp02.example.com"]

[deployment]
purpose = "required"
user_experience = "hide-all"
override_service_window = true
reboot_outside_service_window = false
inherit_superseded_collections = false
new_app_collections = ["Pilot Users"]
superseding_app_collections = ["All Workstations"]

[mail]
enabled = true
from = "appdeploy@example.com"
to = ["ops@example.com"]
pickup_dir = "/var/spool/pickup"
"#;

        let config = parse_config_str(toml).unwrap();
        assert!(!config.distribution.is_all());
        assert_eq!(config.distribution.points.len(), 2);
        assert_eq!(config.deployment.user_experience, UserExperience::HideAll);
        assert_eq!(
            config.deployment.deploy_purpose(),
            DeployPurpose::Required {
                override_service_window: true,
                reboot_outside_service_window: false,
            }
        );
        assert_eq!(config.deployment.new_app_collections, vec!["Pilot Users"]);
        assert!(config.mail.enabled);
    }

    #[test]
    fn test_override_flags_rejected_for_available() {
        let toml = format!(
            "{MINIMAL}\n[deployment]\npurpose = \"available\"\noverride_service_window = true\n"
        );
        let err = format!("{:#}", parse_config_str(&toml).unwrap_err());
        assert!(err.contains("only apply to purpose"), "{err}");
    }

    #[test]
    fn test_empty_site_code_rejected() {
        let toml = MINIMAL.replace("\"PS1\"", "\"  \"");
        assert!(parse_config_str(&toml).is_err());
    }

    #[test]
    fn test_invalid_admin_url_rejected() {
        let toml = MINIMAL.replace("https://cm01.example.com/AdminService", "not a url");
        let err = format!("{:#}", parse_config_str(&toml).unwrap_err());
        assert!(err.contains("[admin]"), "{err}");
    }

    #[test]
    fn test_all_mixed_with_named_points_rejected() {
        let toml = MINIMAL.replace("[\"All\"]", "[\"All\", \"dp01\"]");
        assert!(parse_config_str(&toml).is_err());
    }

    #[test]
    fn test_enabled_mail_requires_recipients() {
        let toml = format!(
            "{MINIMAL}\n[mail]\nenabled = true\nfrom = \"a@example.com\"\npickup_dir = \"/tmp\"\n"
        );
        let err = format!("{:#}", parse_config_str(&toml).unwrap_err());
        assert!(err.contains("recipient"), "{err}");
    }

    #[test]
    fn test_missing_section_rejected() {
        let toml = "site_code = \"PS1\"\n";
        assert!(parse_config_str(toml).is_err());
    }

    #[test]
    fn test_enhance_toml_error() {
        let toml = "site_code = \"PS1\"\ninvalid = [unclosed";
        let err = parse_config_str(toml).unwrap_err().to_string();
        assert!(err.contains("line ") || err.contains("TOML parsing error"));
    }

    #[test]
    fn test_parse_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{MINIMAL}").unwrap();

        let config = parse_config(temp_file.path()).unwrap();
        assert_eq!(config.site_code, "PS1");
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = parse_config(Path::new("/nonexistent/path/appdeploy.toml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
