//! # apiservice-operator
//!
//! Keeps the configured aggregated APIServices registered and reports their
//! combined availability as the `APIServicesAvailable` operator condition.
//!
//! ## State
//!
//! Everything lives under `--state-dir`:
//! - `apiservices/<name>.json`: one document per APIService
//! - `status.json`: operator management state, conditions and versions
//!
//! ## Commands
//!
//! - `sync`: one reconciliation pass
//! - `run`: passes on `sync_interval_secs` until Ctrl+C
//! - `status`: print the stored condition as JSON

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

mod app;
mod cli;

use anyhow::{Context, Result};
use apiservice_core::OperatorConfig;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::App;
use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_deref());

    let config = OperatorConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    info!(
        component = %config.component,
        api_services = config.api_services.len(),
        state_dir = %cli.state_dir.display(),
        "apiservice-operator starting"
    );

    let app = App::new(&config, &cli.state_dir)?;

    match cli.command {
        Commands::Sync => {
            let converged = app.sync().await?;
            println!("{}", if converged { "available" } else { "not available" });
        }
        Commands::Run => {
            app.run().await?;
            info!("apiservice-operator stopped gracefully");
        }
        Commands::Status => match app.status().await? {
            Some(condition) => {
                let rendered = serde_json::to_string_pretty(&condition)
                    .context("Failed to render condition")?;
                println!("{rendered}");
            }
            None => println!("no APIServicesAvailable condition recorded"),
        },
    }

    Ok(())
}

/// Initialize tracing subscriber with environment filter.
///
/// `--log-level` wins over `RUST_LOG`; the fallback is `info`.
fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
