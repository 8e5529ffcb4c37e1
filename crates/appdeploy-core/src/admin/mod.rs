//! Administrative API of the management site.
//!
//! The orchestrator only talks to the site through [`AdminApi`]. Every call
//! returns an explicit [`AdminError`] on failure so callers decide whether a
//! failure skips an application, a collection, or nothing at all.

pub mod http;

use thiserror::Error;

use crate::types::{DeploymentRequest, SupersededApplication};

pub use http::AdminServiceClient;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("{operation} failed: HTTP {status}: {message}")]
    Status {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("{operation} request failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("failed to decode {operation} response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

/// Operations the deployment run needs from the management site.
pub trait AdminApi: Send + Sync {
    /// Distribute the application's content to the given distribution points.
    fn distribute_content(
        &self,
        application: &str,
        distribution_points: &[String],
    ) -> Result<(), AdminError>;

    /// Applications superseded by any deployment type of `application`.
    fn superseded_applications(
        &self,
        application: &str,
    ) -> Result<Vec<SupersededApplication>, AdminError>;

    /// Names of the collections `application` is currently deployed to.
    fn deployment_collections(&self, application: &str) -> Result<Vec<String>, AdminError>;

    /// Create one deployment of an application to one collection.
    fn create_deployment(&self, request: &DeploymentRequest) -> Result<(), AdminError>;

    /// Every distribution point known to the site.
    fn list_distribution_points(&self) -> Result<Vec<String>, AdminError>;
}
