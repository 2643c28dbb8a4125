//! Power BI Migrator CLI
//!
//! Copies every report of a workspace in the source tenant into the workspace
//! of the same name in the destination tenant, backing each one up to Cloud
//! Storage on the way. Reports already present in the destination, or on the
//! ignore list, are left alone.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use powerbi_migrator_core::config::{
    ENVIRONMENT_VARIABLES, generate_example_config, get_config_file_path_string,
};
use powerbi_migrator_core::{
    GcsArchive, MigrationConfig, MigrationSummary, Migrator, PlannedAction, PlannedReport,
    PowerBiClient, SecretManagerClient,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "powerbi-migrator")]
#[command(version)]
#[command(about = "Migrate Power BI reports between two tenants' workspaces")]
#[command(long_about = "
Copies the reports of a workspace in the source tenant into the workspace of
the same name in the destination tenant. Each exported report is backed up to
Cloud Storage before it is imported.

Quick start:
  1. Preview the run:   powerbi-migrator plan
  2. Migrate:           powerbi-migrator migrate

Settings come from environment variables (a .env file is honoured) and
~/.config/powerbi-migrator/config.toml. See: powerbi-migrator config
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Migrate every missing report to the destination workspace
    #[command(alias = "run")]
    Migrate,

    /// Show what a migration would do without transferring anything
    #[command(alias = "dry-run")]
    Plan,

    /// Show configuration paths and settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "powerbi_migrator={},powerbi_migrator_core={}",
                    log_level, log_level
                )
                .into()
            }),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Migrate => cmd_migrate(&cli).await,
        Commands::Plan => cmd_plan(&cli).await,
        Commands::Config => cmd_config(&cli),
    }
}

async fn cmd_migrate(cli: &Cli) -> Result<()> {
    let config = MigrationConfig::load(cli.config.as_deref())?;

    let secrets = SecretManagerClient::new(&config)?;
    let powerbi = PowerBiClient::new(&config)?;
    let archive = GcsArchive::new(&config)?;

    if let OutputFormat::Text = cli.format {
        println!(
            "Migrating workspace '{}' (backups to gs://{}/{})",
            config.workspace_name, config.bucket_name, config.bucket_directory
        );
    }

    let summary = Migrator::new(&config, &secrets, &powerbi, &archive)
        .run()
        .await?;

    match cli.format {
        OutputFormat::Text => print_summary(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(())
}

fn print_summary(summary: &MigrationSummary) {
    println!();
    println!(
        "Source reports: {}  Destination reports: {}",
        summary.source_reports, summary.destination_reports
    );
    println!();
    for record in &summary.records {
        let time_str = record
            .elapsed_secs
            .map(|t| format!("{:.2}s", t))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<40} {:>8}  {}",
            record.report.name,
            time_str,
            record.outcome.label()
        );
    }

    let counts = summary.counts();
    println!();
    println!(
        "Imported {}, failed {}, skipped {} (ignored {}, already present {}, duplicates {})",
        counts.imported,
        summary.failures(),
        counts.ignored + counts.already_present + counts.duplicate_in_run,
        counts.ignored,
        counts.already_present,
        counts.duplicate_in_run
    );
}

async fn cmd_plan(cli: &Cli) -> Result<()> {
    let config = MigrationConfig::load(cli.config.as_deref())?;

    let secrets = SecretManagerClient::new(&config)?;
    let powerbi = PowerBiClient::new(&config)?;
    let archive = GcsArchive::new(&config)?;

    let planned = Migrator::new(&config, &secrets, &powerbi, &archive)
        .plan()
        .await?;

    match cli.format {
        OutputFormat::Text => print_plan(&config, &planned),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&planned)?),
    }

    Ok(())
}

fn print_plan(config: &MigrationConfig, planned: &[PlannedReport]) {
    println!("Plan for workspace '{}':", config.workspace_name);
    println!();
    for entry in planned {
        let action = match entry.action {
            PlannedAction::Migrate => "migrate",
            PlannedAction::Ignored => "skip (ignored)",
            PlannedAction::AlreadyPresent => "skip (already in destination)",
            PlannedAction::DuplicateInRun => "skip (duplicate name)",
        };
        println!("  {:<40} {}", entry.report.name, action);
    }

    let to_migrate = planned
        .iter()
        .filter(|p| p.action == PlannedAction::Migrate)
        .count();
    println!();
    println!("{} of {} reports would be migrated", to_migrate, planned.len());
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let loaded = MigrationConfig::load(cli.config.as_deref());
    // The file that actually contributed values, when one did
    let config_path = match &loaded {
        Ok(config) => match &config.config_file {
            Some(path) => path.display().to_string(),
            None => format!("{} (not present)", get_config_file_path_string()),
        },
        Err(_) => cli
            .config
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(get_config_file_path_string),
    };

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file:      {}", config_path);
            match &loaded {
                Ok(config) => {
                    println!("Workspace:        {}", config.workspace_name);
                    println!(
                        "Ignored reports:  {}",
                        config
                            .ignore_reports
                            .iter()
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                    println!("Secret:           projects/{}/secrets/{}", config.project_id, config.secret_name);
                    println!("Backup location:  gs://{}/{}", config.bucket_name, config.bucket_directory);
                    println!("Power BI API:     {}", config.endpoints.powerbi_api_url);
                    println!("Identity:         {}", config.endpoints.authority_url);
                    let google_credentials = match (&config.google_access_token, &config.google_credentials_file) {
                        (Some(_), _) => "static token".to_string(),
                        (None, Some(path)) => format!("service account key {}", path.display()),
                        (None, None) => "application default credentials".to_string(),
                    };
                    println!("Google auth:      {}", google_credentials);
                    println!("Request timeout:  {}s", config.request_timeout.as_secs());
                }
                Err(e) => println!("Not usable yet:   {:#}", e),
            }
            println!();
            println!("Environment variables:");
            for (name, description) in ENVIRONMENT_VARIABLES {
                println!("  {:<30} - {}", name, description);
            }
            println!();
            println!("Example config.toml:");
            println!();
            println!("{}", generate_example_config());
        }
        OutputFormat::Json => {
            let resolved = match &loaded {
                Ok(config) => serde_json::json!({
                    "workspace_name": config.workspace_name,
                    "ignore_reports": config.ignore_reports,
                    "project_id": config.project_id,
                    "secret_name": config.secret_name,
                    "bucket_name": config.bucket_name,
                    "bucket_directory": config.bucket_directory,
                    "powerbi_api_url": config.endpoints.powerbi_api_url,
                    "authority_url": config.endpoints.authority_url,
                    "request_timeout_secs": config.request_timeout.as_secs(),
                }),
                Err(e) => serde_json::json!({ "error": format!("{:#}", e) }),
            };
            println!(
                "{}",
                serde_json::json!({
                    "config_file": config_path,
                    "resolved": resolved,
                    "environment_variables": ENVIRONMENT_VARIABLES
                        .iter()
                        .map(|(name, _)| *name)
                        .collect::<Vec<_>>(),
                })
            );
        }
    }

    Ok(())
}
