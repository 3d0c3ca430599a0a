//! Alauda pipeline step runner
//!
//! Runs one pipeline step (build, service deploy, component deploy or a
//! lookup) against the Alauda platform and prints the result as JSON.
//! Progress lines go to stderr; Ctrl-C stops waiting without cancelling
//! the remote operation.
//!
//! Usage:
//!   cargo run --bin alauda-step -- --config alauda.yaml --step deploy.yaml
//!
//! Example step file:
//!   step: deploy_component
//!   application_name: shop
//!   resource_type: Deployment
//!   component_name: web
//!   rollback: true
//!   payload: { ... }

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;

use alauda_pipeline::client::HttpPlatformClient;
use alauda_pipeline::sink::WriterSink;
use alauda_pipeline::steps::StepRequest;
use alauda_pipeline::{Platform, PlatformConfig, TokioClock};

/// Run an Alauda pipeline step
#[derive(Parser, Debug)]
#[command(name = "alauda-step")]
#[command(about = "Drive an Alauda build or deployment to completion")]
struct Args {
    /// Platform configuration file (YAML). ALAUDA_* variables override it.
    #[arg(long, short = 'c', env = "ALAUDA_CONFIG")]
    config: Option<PathBuf>,

    /// Step document (YAML or JSON)
    #[arg(long, short = 's')]
    step: PathBuf,

    /// Debug-level logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let config = match &args.config {
        Some(path) => PlatformConfig::load_from_file(path)?,
        None => PlatformConfig::default(),
    }
    .with_env_overrides();

    let text = std::fs::read_to_string(&args.step)
        .with_context(|| format!("Reading step {}", args.step.display()))?;
    let step = StepRequest::parse(&text)?;

    let client = HttpPlatformClient::new(&config).context("Building HTTP client")?;
    let (interrupt_tx, interrupt_rx) = watch::channel(false);
    let platform = Platform::new(
        config,
        Arc::new(client),
        Arc::new(TokioClock),
        Arc::new(WriterSink::new(std::io::stderr())),
    )?
    .with_interrupt(interrupt_rx);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stop waiting");
            let _ = interrupt_tx.send(true);
        }
    });

    match step.execute(&platform).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} failed: {}", step.name(), e);
            std::process::exit(1);
        }
    }
}
