//! Plan command implementation.
//!
//! Loads a batch file and partitions it into the work a run would do,
//! without contacting the site.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::batch::parse_batch_file;
use crate::deploy::BatchPlan;
use crate::types::ChangeRecord;

/// A loaded and partitioned batch
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub batch_path: PathBuf,
    pub record_count: usize,
    pub plan: BatchPlan,
    #[serde(skip)]
    pub records: Vec<ChangeRecord>,
}

#[derive(Debug, Default)]
pub struct PlanCommand;

impl PlanCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, batch_path: &Path) -> anyhow::Result<PlanReport> {
        let records = parse_batch_file(batch_path)
            .with_context(|| format!("Failed to load batch file: {}", batch_path.display()))?;
        let plan = BatchPlan::from_records(&records);

        tracing::debug!(
            records = records.len(),
            superseding = plan.superseding.len(),
            new = plan.new_apps.len(),
            "batch loaded"
        );

        Ok(PlanReport {
            batch_path: batch_path.to_path_buf(),
            record_count: records.len(),
            plan,
            records,
        })
    }
}
