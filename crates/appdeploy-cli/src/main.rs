//! appdeploy - post-packaging deployment automation
//!
//! Usage:
//!   appdeploy run <BATCH>       # distribute content, deploy, notify
//!   appdeploy plan <BATCH>      # show what a run would do
//!   appdeploy check-config      # validate the configuration file

mod confirm;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appdeploy_core::admin::AdminServiceClient;
use appdeploy_core::commands::{PlanCommand, PlanReport, RunCommand, RunReport};
use appdeploy_core::config::{AppDeployConfig, load_config};
use appdeploy_core::deploy::{ApplicationReport, DistributionStatus};
use appdeploy_core::notify::{Notifier, PickupDirNotifier};
use appdeploy_core::types::AppRole;

use crate::confirm::ConfirmFlow;

/// Exit code when `--strict` is set and an application failed
const EXIT_APPLICATION_FAILURES: i32 = 2;

#[derive(Parser)]
#[command(name = "appdeploy")]
#[command(about = "Distribute and deploy new and superseding applications", long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/appdeploy/appdeploy.toml)
    #[arg(long, short, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a batch file: distribute content, create deployments, notify
    Run {
        /// Batch file produced by the packaging pipeline
        batch: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,

        /// Exit with code 2 if any application failed
        #[arg(long)]
        strict: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show what a run would do without contacting the site
    Plan {
        /// Batch file produced by the packaging pipeline
        batch: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Load and validate the configuration file
    CheckConfig,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// No output
    Quiet,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Run {
            batch,
            yes,
            strict,
            format,
        } => {
            let failed = run_batch(cli.config.as_deref(), &batch, yes, format)?;
            if strict && failed {
                std::process::exit(EXIT_APPLICATION_FAILURES);
            }
        }
        Commands::Plan { batch, format } => {
            let report = PlanCommand::new().execute(&batch)?;
            print_plan(&report, format)?;
        }
        Commands::CheckConfig => {
            let config = load_config(cli.config.as_deref())?;
            print_config_summary(&config);
        }
    }

    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "appdeploy=info,appdeploy_core=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

/// Returns whether any application failed.
fn run_batch(
    config_path: Option<&Path>,
    batch_path: &Path,
    yes: bool,
    format: OutputFormat,
) -> Result<bool> {
    let config = load_config(config_path)?;
    let batch = PlanCommand::new().execute(batch_path)?;

    if batch.plan.is_empty() {
        tracing::info!(batch = %batch_path.display(), "batch contains nothing to process");
        if matches!(format, OutputFormat::Table) {
            println!("• Nothing to process in {}", batch_path.display());
        }
        return Ok(false);
    }

    if !yes && console::Term::stdout().is_term() {
        let confirmed = ConfirmFlow::new().confirm(&config, &batch.plan)?;
        if !confirmed {
            println!("Run cancelled.");
            return Ok(false);
        }
    }

    let api = AdminServiceClient::connect(&config)?;
    let notifier = PickupDirNotifier::from_config(&config.mail);

    let report = RunCommand::new(&config).execute(
        &batch,
        &api,
        notifier.as_ref().map(|n| n as &dyn Notifier),
    )?;

    print_run_report(&report, format)?;
    Ok(report.outcome.has_failures())
}

fn print_run_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            for app in &report.outcome.reports {
                print_application(app);
            }
            for record in &report.outcome.failed_records {
                println!(
                    "{} {} (failed in packaging)",
                    style("!").yellow(),
                    record.application_name
                );
            }
            for record in &report.outcome.unresolved_records {
                println!(
                    "{} {} (superseded, no replacement named)",
                    style("!").yellow(),
                    record.application_name
                );
            }
            if let Some(path) = &report.backup_path {
                println!("  Batch backed up to {}", path.display());
            }
            if report.notification_sent {
                println!("  Notification queued");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Quiet => {}
    }
    Ok(())
}

fn print_application(app: &ApplicationReport) {
    let role = match app.role {
        AppRole::Superseding => "superseding",
        AppRole::New => "new",
    };
    let marker = if app.succeeded() {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!("{} {} ({})", marker, app.application, role);

    if let Some(old) = &app.superseded {
        println!("    supersedes {}", old.name);
    }
    if let DistributionStatus::Failed(error) = &app.distribution {
        println!("    content distribution failed: {}", error);
        return;
    }
    if app.deployments.is_empty() {
        println!("    no target collections");
    }
    for deployment in &app.deployments {
        match &deployment.error {
            None => println!("    → {}", deployment.collection),
            Some(error) => println!("    ⚠ {}: {}", deployment.collection, error),
        }
    }
}

fn print_plan(report: &PlanReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            let plan = &report.plan;
            println!(
                "{} ({} records)",
                style(report.batch_path.display()).bold(),
                report.record_count
            );
            print_names("Superseding", &plan.superseding);
            print_names("New", &plan.new_apps);
            let failed: Vec<String> = plan
                .failed
                .iter()
                .map(|r| r.application_name.clone())
                .collect();
            print_names("Failed", &failed);
            for record in &plan.unresolved {
                println!(
                    "  {} {} is superseded but names no replacement",
                    style("⚠").yellow(),
                    record.application_name
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Quiet => {}
    }
    Ok(())
}

fn print_names(title: &str, names: &[String]) {
    println!("  {:<12} {}", format!("{}:", title), names.len());
    for name in names {
        println!("    - {}", name);
    }
}

fn print_config_summary(config: &AppDeployConfig) {
    println!("✓ Configuration is valid");
    println!("  Site:          {}", config.site_code);
    println!("  Admin service: {}", config.admin.url);
    println!(
        "  Distribution:  {}",
        config.distribution.points.join(", ")
    );
    println!(
        "  Purpose:       {}",
        config.deployment.deploy_purpose().label()
    );
    println!(
        "  Mail:          {}",
        if config.mail.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
}
