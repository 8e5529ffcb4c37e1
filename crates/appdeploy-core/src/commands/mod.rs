//! High-level commands for appdeploy operations.
//!
//! These are the entry points the CLI calls; each wires configuration,
//! batch input and the administrative API together.

pub mod plan;
pub mod run;

pub use plan::{PlanCommand, PlanReport};
pub use run::{RunCommand, RunReport};
