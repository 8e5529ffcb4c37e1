//! appdeploy Core Library
//!
//! Post-packaging automation for a software deployment site: distributes
//! content for new and superseding applications, deploys them to target
//! collections and summarises the run.

pub mod admin;
pub mod batch;
pub mod commands;
pub mod config;
pub mod deploy;
pub mod notify;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{AppDeployConfig, DeploymentConfig, MailConfig, load_config};

    // Administrative API
    pub use crate::admin::{AdminApi, AdminError, AdminServiceClient};

    // Batch input
    pub use crate::batch::{BatchError, parse_batch_file};

    // Deployment
    pub use crate::deploy::{
        ApplicationReport, BatchDriver, BatchPlan, DeploymentOrchestrator, DeploymentSettings,
        RunOutcome, TargetingPolicy,
    };

    // Notification
    pub use crate::notify::{Notification, Notifier, PickupDirNotifier};

    // Types
    pub use crate::types::{
        AppRole, ChangeAction, ChangeRecord, DeployPurpose, DeploymentRequest, DeploymentTarget,
        RecordStatus, SupersededApplication, UserExperience,
    };
}
