//! Administration service REST client.
//!
//! Talks to the site's OData `wmi/` routes. The client owns a current-thread
//! tokio runtime and blocks on every request, so callers stay synchronous.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Value, json};
use url::Url;

use super::{AdminApi, AdminError};
use crate::config::AppDeployConfig;
use crate::types::{DeployPurpose, DeploymentRequest, SupersededApplication, UserExperience};

const USER_AGENT: &str = concat!("appdeploy/", env!("CARGO_PKG_VERSION"));

/// `RelationType` of a supersedence edge between deployment types.
const SUPERSEDES_RELATION: u32 = 15;

const MAX_ERROR_BODY: usize = 300;

#[derive(Debug, Deserialize)]
struct ODataList<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApplicationRow {
    #[serde(rename = "CI_ID")]
    ci_id: u64,
    localized_display_name: String,
    date_created: String,
    is_deployed: bool,
    #[serde(rename = "PackageID", default)]
    package_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelationRow {
    #[serde(rename = "ToApplicationCIID", default)]
    to_application_ci_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssignmentRow {
    collection_name: String,
}

#[derive(Debug, Deserialize)]
struct CollectionRow {
    #[serde(rename = "CollectionID")]
    collection_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DistributionPointRow {
    server_name: String,
}

#[derive(Debug, Clone)]
struct Credentials {
    username: String,
    password: Option<String>,
}

#[derive(Debug)]
pub struct AdminServiceClient {
    http: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    base_url: Url,
    site_code: String,
    timeout_secs: u64,
    credentials: Option<Credentials>,
}

impl AdminServiceClient {
    /// Build a client from configuration without contacting the site.
    pub fn new(config: &AppDeployConfig) -> anyhow::Result<Self> {
        let mut base_url = Url::parse(&config.admin.url)
            .with_context(|| format!("Invalid admin URL: {}", config.admin.url))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let credentials = match &config.admin.username {
            Some(username) => {
                let password = match &config.admin.password_env {
                    Some(var) => Some(std::env::var(var).with_context(|| {
                        format!("Environment variable {} (admin password) is not set", var)
                    })?),
                    None => None,
                };
                Some(Credentials {
                    username: username.clone(),
                    password,
                })
            }
            None => None,
        };

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.admin.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create tokio runtime: {}", e))?;

        Ok(Self {
            http,
            runtime,
            base_url,
            site_code: config.site_code.clone(),
            timeout_secs: config.admin.timeout_secs,
            credentials,
        })
    }

    /// Build a client and check that the configured site answers.
    pub fn connect(config: &AppDeployConfig) -> anyhow::Result<Self> {
        let client = Self::new(config)?;
        client.verify_site().with_context(|| {
            format!(
                "Failed to connect to site {} at {}",
                client.site_code, client.base_url
            )
        })?;
        tracing::info!(site = %client.site_code, url = %client.base_url, "connected to administration service");
        Ok(client)
    }

    fn verify_site(&self) -> Result<(), AdminError> {
        let rows: Vec<IgnoredAny> = self.query(
            "site lookup",
            "SMS_Site",
            Some(&format!("SiteCode eq {}", odata_string(&self.site_code))),
        )?;
        if rows.is_empty() {
            return Err(AdminError::NotFound {
                kind: "site",
                name: self.site_code.clone(),
            });
        }
        Ok(())
    }

    fn endpoint(&self, class: &str, filter: Option<&str>) -> Result<Url, AdminError> {
        let mut url =
            self.base_url
                .join(&format!("wmi/{class}"))
                .map_err(|e| AdminError::Request {
                    operation: "build URL",
                    message: e.to_string(),
                })?;
        if let Some(filter) = filter {
            url.query_pairs_mut().append_pair("$filter", filter);
        }
        Ok(url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some(c) => builder.basic_auth(&c.username, c.password.as_ref()),
            None => builder,
        }
    }

    fn transport_error(&self, operation: &'static str, error: reqwest::Error) -> AdminError {
        if error.is_timeout() {
            AdminError::Timeout {
                operation,
                secs: self.timeout_secs,
            }
        } else {
            AdminError::Request {
                operation,
                message: error.to_string(),
            }
        }
    }

    fn query<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        class: &str,
        filter: Option<&str>,
    ) -> Result<Vec<T>, AdminError> {
        let url = self.endpoint(class, filter)?;
        tracing::debug!(%url, operation, "GET");
        let request = self.authorize(self.http.get(url));

        let list: ODataList<T> = self.runtime.block_on(async {
            let response = request
                .send()
                .await
                .map_err(|e| self.transport_error(operation, e))?;
            let response = check_status(operation, response).await?;
            response.json::<ODataList<T>>().await.map_err(|e| {
                if e.is_timeout() {
                    self.transport_error(operation, e)
                } else {
                    AdminError::Decode {
                        operation,
                        message: e.to_string(),
                    }
                }
            })
        })?;

        Ok(list.value)
    }

    fn post(
        &self,
        operation: &'static str,
        class: &str,
        body: &Value,
        accept_conflict: bool,
    ) -> Result<(), AdminError> {
        let url = self.endpoint(class, None)?;
        tracing::debug!(%url, operation, "POST");
        let request = self.authorize(self.http.post(url)).json(body);

        self.runtime.block_on(async {
            let response = request
                .send()
                .await
                .map_err(|e| self.transport_error(operation, e))?;
            if accept_conflict && response.status() == reqwest::StatusCode::CONFLICT {
                tracing::debug!(operation, "already exists");
                return Ok(());
            }
            check_status(operation, response).await.map(|_| ())
        })
    }

    fn find_application(&self, name: &str) -> Result<ApplicationRow, AdminError> {
        let filter = format!(
            "LocalizedDisplayName eq {} and IsLatest eq true",
            odata_string(name)
        );
        self.query::<ApplicationRow>("application lookup", "SMS_Application", Some(&filter))?
            .into_iter()
            .next()
            .ok_or_else(|| AdminError::NotFound {
                kind: "application",
                name: name.to_string(),
            })
    }

    fn application_by_id(&self, ci_id: u64) -> Result<Option<ApplicationRow>, AdminError> {
        let filter = format!("CI_ID eq {ci_id} and IsLatest eq true");
        Ok(self
            .query::<ApplicationRow>("application lookup", "SMS_Application", Some(&filter))?
            .into_iter()
            .next())
    }
}

impl AdminApi for AdminServiceClient {
    fn distribute_content(
        &self,
        application: &str,
        distribution_points: &[String],
    ) -> Result<(), AdminError> {
        let app = self.find_application(application)?;
        let package_id = app.package_id.ok_or_else(|| AdminError::NotFound {
            kind: "content package",
            name: application.to_string(),
        })?;

        for dp in distribution_points {
            let body = json!({
                "PackageID": package_id,
                "ServerNALPath": nal_path(dp, &self.site_code),
                "SiteCode": self.site_code,
            });
            self.post("distribute content", "SMS_DistributionPoint", &body, true)?;
            tracing::debug!(app = application, dp = %dp, "content queued");
        }
        Ok(())
    }

    fn superseded_applications(
        &self,
        application: &str,
    ) -> Result<Vec<SupersededApplication>, AdminError> {
        let app = self.find_application(application)?;
        let filter = format!(
            "FromApplicationCIID eq {} and RelationType eq {}",
            app.ci_id, SUPERSEDES_RELATION
        );
        let relations: Vec<RelationRow> =
            self.query("supersedence lookup", "SMS_AppDependenceRelation", Some(&filter))?;

        let mut seen = Vec::new();
        let mut superseded = Vec::new();
        for relation in relations {
            let Some(id) = relation.to_application_ci_id else {
                tracing::debug!(app = application, "supersedence relation without target skipped");
                continue;
            };
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);

            let Some(row) = self.application_by_id(id)? else {
                tracing::debug!(app = application, ci_id = id, "superseded application no longer exists");
                continue;
            };
            superseded.push(SupersededApplication {
                date_created: parse_wmi_datetime(&row.date_created)?,
                name: row.localized_display_name,
                is_deployed: row.is_deployed,
            });
        }
        Ok(superseded)
    }

    fn deployment_collections(&self, application: &str) -> Result<Vec<String>, AdminError> {
        let filter = format!("ApplicationName eq {}", odata_string(application));
        let rows: Vec<AssignmentRow> =
            self.query("deployment lookup", "SMS_ApplicationAssignment", Some(&filter))?;

        let mut collections: Vec<String> = Vec::new();
        for row in rows {
            if !collections.contains(&row.collection_name) {
                collections.push(row.collection_name);
            }
        }
        Ok(collections)
    }

    fn create_deployment(&self, request: &DeploymentRequest) -> Result<(), AdminError> {
        let app = self.find_application(&request.application_name)?;
        let collection_name = &request.target.collection_name;
        let filter = format!("Name eq {}", odata_string(collection_name));
        let collection = self
            .query::<CollectionRow>("collection lookup", "SMS_Collection", Some(&filter))?
            .into_iter()
            .next()
            .ok_or_else(|| AdminError::NotFound {
                kind: "collection",
                name: collection_name.clone(),
            })?;

        let body = assignment_body(
            request,
            app.ci_id,
            &collection.collection_id,
            &self.site_code,
            Utc::now(),
        );
        self.post("create deployment", "SMS_ApplicationAssignment", &body, false)
    }

    fn list_distribution_points(&self) -> Result<Vec<String>, AdminError> {
        let rows: Vec<DistributionPointRow> =
            self.query("distribution point lookup", "SMS_DistributionPointInfo", None)?;
        Ok(rows.into_iter().map(|r| r.server_name).collect())
    }
}

async fn check_status(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, AdminError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let mut message: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
    if message.is_empty() {
        message = status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string();
    }
    Err(AdminError::Status {
        operation,
        status: status.as_u16(),
        message,
    })
}

/// Quote a value as an OData string literal.
fn odata_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn nal_path(server: &str, site_code: &str) -> String {
    format!(r#"["Display=\\{server}\"]MSWNET:["SMS_SITE={site_code}"]\\{server}\"#)
}

/// Request body for a new application assignment.
fn assignment_body(
    request: &DeploymentRequest,
    ci_id: u64,
    collection_id: &str,
    site_code: &str,
    start: DateTime<Utc>,
) -> Value {
    let target = &request.target;
    let (user_ui, notify_user) = match target.user_experience {
        UserExperience::DisplayAll => (true, true),
        UserExperience::DisplaySoftwareCenterOnly => (true, false),
        UserExperience::HideAll => (false, false),
    };

    let mut body = json!({
        "AssignmentName": format!("{}_{}_Install", request.application_name, target.collection_name),
        "ApplicationName": request.application_name,
        "AssignedCIs": [ci_id],
        "CollectionName": target.collection_name,
        "TargetCollectionID": collection_id,
        "SourceSite": site_code,
        "AssignmentDescription": request.comment,
        "DesiredConfigType": 1,
        "OfferTypeID": if target.purpose.is_required() { 0 } else { 2 },
        "UserUIExperience": user_ui,
        "NotifyUser": notify_user,
        "StartTime": start.to_rfc3339(),
        "Enabled": true,
    });

    if let DeployPurpose::Required {
        override_service_window,
        reboot_outside_service_window,
    } = target.purpose
    {
        body["EnforcementDeadline"] = json!(start.to_rfc3339());
        body["OverrideServiceWindows"] = json!(override_service_window);
        body["RebootOutsideOfServiceWindows"] = json!(reboot_outside_service_window);
    }

    body
}

/// Parse the timestamp formats the administration service emits.
fn parse_wmi_datetime(value: &str) -> Result<DateTime<Utc>, AdminError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    // DMTF: yyyymmddHHMMSS.mmmmmm+UUU, UUU is the offset from UTC in minutes
    if let Some(head) = value.get(..14) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(head, "%Y%m%d%H%M%S") {
            let offset_minutes = match value.get(21..) {
                Some(offset) if !offset.is_empty() => {
                    offset.parse::<i32>().map_err(|_| AdminError::Decode {
                        operation: "application lookup",
                        message: format!("unrecognised UTC offset in DateCreated '{value}'"),
                    })?
                }
                _ => 0,
            };
            return Ok(naive.and_utc() - chrono::Duration::minutes(i64::from(offset_minutes)));
        }
    }
    Err(AdminError::Decode {
        operation: "application lookup",
        message: format!("unrecognised DateCreated '{value}'"),
    })
}
