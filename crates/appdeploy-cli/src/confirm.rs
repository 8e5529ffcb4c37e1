//! Interactive confirmation before a run touches the site.

use std::io::Write;

use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};

use appdeploy_core::config::AppDeployConfig;
use appdeploy_core::deploy::BatchPlan;

pub struct ConfirmFlow<W: Write> {
    writer: W,
    theme: ColorfulTheme,
}

impl ConfirmFlow<std::io::Stdout> {
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }
}

impl<W: Write> ConfirmFlow<W> {
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            theme: ColorfulTheme::default(),
        }
    }

    /// Print what the run will do.
    pub fn write_summary(&mut self, config: &AppDeployConfig, plan: &BatchPlan) -> anyhow::Result<()> {
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", style("  appdeploy run").bold().cyan())?;
        writeln!(self.writer)?;
        writeln!(self.writer, "  Site:        {}", style(&config.site_code).green())?;
        writeln!(
            self.writer,
            "  Purpose:     {}",
            style(config.deployment.deploy_purpose().label()).green()
        )?;
        writeln!(
            self.writer,
            "  Superseding: {}",
            style(list_or_none(&plan.superseding)).green()
        )?;
        writeln!(
            self.writer,
            "  New:         {}",
            style(list_or_none(&plan.new_apps)).green()
        )?;
        if !plan.failed.is_empty() {
            writeln!(
                self.writer,
                "  Failed:      {}",
                style(plan.failed.len()).yellow()
            )?;
        }
        if !plan.unresolved.is_empty() {
            writeln!(
                self.writer,
                "  Unresolved:  {}",
                style(plan.unresolved.len()).yellow()
            )?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn confirm(&mut self, config: &AppDeployConfig, plan: &BatchPlan) -> anyhow::Result<bool> {
        self.write_summary(config, plan)?;

        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt("Proceed with distribution and deployment?")
            .default(false)
            .interact()?;

        Ok(confirmed)
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
