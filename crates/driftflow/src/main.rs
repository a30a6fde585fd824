mod commands;
mod inputs;
mod providers;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use colored::Colorize;
use driftflow_cloud::{ActionResult, EnvCredentials, Operation, ResultStatus};
use driftflow_config::Settings;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "drift")]
#[command(about = "Reconcile declared cloud resources against provider APIs", long_about = None)]
struct Cli {
    /// Settings file (defaults to driftflow.yaml discovery)
    #[arg(long, global = true, env = "DRIFTFLOW_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one operation against one component and print the result as JSON
    Run {
        /// create, refresh, update, delete, import or discover
        operation: Operation,
        /// Component file (JSON, or YAML with a .yaml/.yml extension)
        #[arg(short, long)]
        component: PathBuf,
        /// JSON object of secret key to value
        #[arg(long, env = "DRIFTFLOW_SECRETS_FILE")]
        secrets: Option<PathBuf>,
    },
    /// Run one operation against many components and print a JSON array
    Batch {
        /// create, refresh, update, delete, import or discover
        operation: Operation,
        /// Component files, results keep this order
        #[arg(required = true)]
        components: Vec<PathBuf>,
        /// Components executed in parallel
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
        /// JSON object of secret key to value
        #[arg(long, env = "DRIFTFLOW_SECRETS_FILE")]
        secrets: Option<PathBuf>,
    },
    /// List resource-type prefixes with a registered provider
    Providers,
    /// Show version information
    Version,
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    let settings = match path {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => driftflow_config::load()?,
    };
    Ok(settings)
}

fn context(settings: Settings, secrets: Option<PathBuf>) -> anyhow::Result<commands::Context> {
    let secrets_file = secrets.or_else(|| settings.secrets_file.clone());
    let secrets = inputs::load_secrets(secrets_file.as_deref())?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling in-flight operations");
            on_interrupt.cancel();
        }
    });

    Ok(commands::Context {
        registry: providers::registry(),
        settings,
        secrets: Arc::new(secrets),
        credentials: Box::new(EnvCredentials),
        cancel,
    })
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_failures(results: &[ActionResult]) {
    let failed = results
        .iter()
        .filter(|r| r.status == ResultStatus::Error)
        .count();
    if failed > 0 {
        eprintln!(
            "{} {} of {} operations failed",
            "✗".red().bold(),
            failed,
            results.len()
        );
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries results; logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    match cli.command {
        Commands::Version => {
            println!("driftflow {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Providers => {
            let registry = providers::registry();
            let prefixes: Vec<Value> = registry.prefixes().map(Value::from).collect();
            print_json(&prefixes)?;
        }
        Commands::Run {
            operation,
            component,
            secrets,
        } => {
            let settings = load_settings(cli.config.as_ref())?;
            let ctx = context(settings, secrets)?;
            let result = commands::run(&ctx, operation, component).await?;
            print_json(&result)?;
            report_failures(std::slice::from_ref(&result));
        }
        Commands::Batch {
            operation,
            components,
            concurrency,
            secrets,
        } => {
            let settings = load_settings(cli.config.as_ref())?;
            let concurrency = concurrency.unwrap_or(settings.concurrency);
            let ctx = context(settings, secrets)?;
            let results = commands::batch(&ctx, operation, &components, concurrency).await?;
            print_json(&results)?;
            report_failures(&results);
        }
    }

    Ok(())
}
