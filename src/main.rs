//! Dashboard provisioner (v1)
//!
//! Provisions observability for the fitness assistant against the dashboard
//! server's management API.
//!
//! # Architecture Overview
//!
//! ```text
//!   .env / environment ──┐
//!   provisioner.toml ────┼─▶ config ──▶ ProvisionConfig
//!                        │
//!                        ▼
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                     Provisioner (orchestrator)               │
//!   │                                                              │
//!   │  credentials ──token──▶ datasource ──uid──▶ dashboard         │
//!   │  (basic auth)           (bearer)           (bearer)          │
//!   └──────────────┬───────────────────────────────────────────────┘
//!                  │ api::ManagementClient (timeouts, retries)
//!                  ▼
//!          management API (HTTP+JSON)
//! ```
//!
//! # Exit Codes
//! - 0: all steps succeeded
//! - 1: a provisioning step failed (or `validate` found a bad template)
//! - 2: configuration or startup error

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use dashboard_provisioner::config::{load_config_with, ProvisionConfig};
use dashboard_provisioner::observability::logging::init_logging;
use dashboard_provisioner::provision::dashboard::{load_template, rewrite_datasource_refs};
use dashboard_provisioner::Provisioner;

const EXIT_STEP_FAILED: u8 = 1;
const EXIT_CONFIG: u8 = 2;

#[derive(Parser)]
#[command(name = "dashboard-provisioner")]
#[command(about = "Provision the service account, datasource and dashboard for the fitness assistant", long_about = None)]
struct Cli {
    /// TOML config file. Environment variables override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dotenv file loaded into the environment before configuration is read.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Dashboard template path, overriding config and environment.
    #[arg(short, long)]
    template: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision credentials, datasource and dashboard (default)
    Run,
    /// Check configuration and the dashboard template without contacting the server
    Validate,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let dotenv = dotenvy::from_path(&cli.env_file);

    let template = cli.template.as_ref().map(|path| path.display().to_string());
    let config = match load_config_with(cli.config.as_deref(), |config| {
        if let Some(template) = template {
            config.dashboard.template_path = template;
        }
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    init_logging(&config.observability.log_level);
    match dotenv {
        Ok(()) => tracing::debug!(path = %cli.env_file.display(), "Loaded env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(path = %cli.env_file.display(), error = %e, "Failed to load env file"),
    }

    tracing::info!(
        grafana_url = %config.grafana.url,
        service_account = %config.service_account.name,
        datasource = %config.datasource.name,
        template = %config.dashboard.template_path,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Validate => validate(&config),
    }
}

async fn run(config: ProvisionConfig) -> ExitCode {
    let provisioner = match Provisioner::new(config) {
        Ok(provisioner) => provisioner,
        Err(e) => {
            eprintln!("Startup error: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let report = provisioner.run().await;
    print!("{}", report);

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_STEP_FAILED)
    }
}

fn validate(config: &ProvisionConfig) -> ExitCode {
    let path = Path::new(&config.dashboard.template_path);
    match load_template(path) {
        Ok(mut document) => {
            let references = rewrite_datasource_refs(&mut document, "<datasource-uid>");
            println!("Configuration OK");
            println!(
                "Template {}: {} datasource reference(s) would be rewritten",
                path.display(),
                references
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(EXIT_STEP_FAILED)
        }
    }
}
