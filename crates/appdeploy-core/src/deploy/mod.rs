//! Deploy coordination: supersedence resolution, collection targeting and
//! the per-application deployment sequence.

pub mod driver;
pub mod executor;
pub mod outcome;
pub mod resolver;
pub mod targeting;

pub use driver::{BatchDriver, BatchPlan};
pub use executor::{
    DeploymentOrchestrator, DeploymentSettings, DistributionPoints, deployment_comment,
};
pub use outcome::{ApplicationReport, CollectionDeployment, DistributionStatus, RunOutcome};
pub use resolver::{latest_superseded, resolve_latest_superseded};
pub use targeting::{TargetingPolicy, dedupe_collections};
