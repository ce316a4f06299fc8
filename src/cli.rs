//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// APIService availability operator
#[derive(Parser, Debug)]
#[command(name = "apiservice-operator")]
#[command(version)]
#[command(about = "Keeps aggregated APIServices registered and reports their availability")]
#[command(
    long_about = "Creates every declared APIService that is missing, reads each one back, and writes a single APIServicesAvailable condition to the operator status."
)]
pub struct Cli {
    /// Operator config file (.toml, .yaml or .yml)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Directory holding the APIService objects and the operator status
    #[arg(short, long, default_value = ".apiservice-operator")]
    pub state_dir: PathBuf,

    /// Log filter, overrides RUST_LOG (e.g. "debug" or "apiservice_reconciler=trace")
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run a single reconciliation pass
    Sync,

    /// Reconcile on an interval until Ctrl+C
    Run,

    /// Print the stored APIServicesAvailable condition
    Status,
}
