mod config;
mod error;
mod kea;
mod loader;
mod models;
mod provision;
mod utils;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, RunMode};
use kea::{HttpTransport, KeaClient};
use provision::ProvisionOptions;

/// DAS Kea provisioning - builds DHCPv4 subnets and host reservations for an activated device
#[derive(Parser)]
#[command(name = "das-kea")]
#[command(about = "Provision Kea DHCPv4 subnets and reservations from a device workflow")]
struct Cli {
    /// Run mode; dry-run only sends read-only commands (or set `DAS_MODE`)
    #[arg(long, value_enum)]
    mode: Option<RunMode>,

    /// Workflow JSON describing the device
    #[arg(long, default_value = "workflow.json")]
    workflow: PathBuf,

    /// Stencil JSON for the device model. Defaults to `<DAS_STENCIL_DIR>/<vendor>/<model>.json`
    /// when a stencil directory is configured, else `template.json`.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Log request and response payloads (or set `KEA_DEBUG`)
    #[arg(short, long)]
    debug: bool,

    /// Print the commands the server supports before provisioning (one extra request)
    #[arg(long)]
    list_commands: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut cfg = Config::load()?;
    cfg.debug |= cli.debug;
    if let Some(mode) = cli.mode {
        cfg.mode = mode;
    }

    let default_filter = if cfg.debug { "das_kea=debug" } else { "das_kea=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting DAS Kea provisioning");
    tracing::info!("Kea API: {}", cfg.api_url);
    tracing::info!("Mode: {}", cfg.mode);

    let workflow = loader::load_workflow(&cli.workflow).await?;
    tracing::debug!("Workflow:\n{}", serde_json::to_string_pretty(&workflow)?);
    tracing::info!(
        "Will create {} subnet(s) for {}",
        workflow.subnets.len(),
        workflow.hostname
    );

    let stencil_path =
        loader::resolve_stencil_path(cli.template.as_deref(), cfg.stencil_dir.as_deref(), &workflow)?;
    let stencil = loader::load_stencil(&stencil_path, &workflow.subnets)
        .await
        .with_context(|| format!("loading stencil for {} {}", workflow.vendor, workflow.model))?;
    tracing::debug!("Stencil {}:\n{}", stencil_path.display(), serde_json::to_string_pretty(&stencil)?);
    if stencil.is_empty() {
        tracing::warn!("Stencil {} has no ports, no reservations will be made", stencil_path.display());
    } else {
        tracing::info!("Stencil {} has {} port(s)", stencil_path.display(), stencil.len());
    }

    let client = KeaClient::new(Box::new(HttpTransport::new(&cfg)?), cfg.mode);

    if cli.list_commands {
        let commands = client.list_commands().await?;
        tracing::info!("Kea API commands available: {}", commands.join(", "));
    }

    match provision::provision(&workflow, &stencil, &client, &ProvisionOptions::from(&cfg)).await {
        Ok(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Err(failed) => {
            println!("{}", serde_json::to_string_pretty(&failed.summary)?);
            Err(failed.into())
        }
    }
}
