//! rmqscaled — the autoscaler daemon.
//!
//! Assembles the subsystems:
//! - Manifest discovery source (register/deregister events)
//! - RabbitMQ management-API metrics provider
//! - Reconciler (registry + decision engine + tick loop)
//! - Manifest replica updater + log event sink
//!
//! # Usage
//!
//! ```text
//! rmqscaled run --rabbit-url http://rmq:15672 --rabbit-user guest \
//!     --rabbit-password guest --manifest-dir /etc/rmqscale/workloads
//! ```

mod manifests;
mod sink;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tracing::info;

use rmqscale_autoscale::Reconciler;
use rmqscale_rabbit::RabbitClient;

use crate::manifests::{ManifestSource, ManifestUpdater};
use crate::sink::LogSink;

#[derive(Parser)]
#[command(name = "rmqscaled", about = "RabbitMQ queue-depth autoscaler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the autoscaler loop against a manifest directory.
    Run {
        /// RabbitMQ management API base URL.
        #[arg(long)]
        rabbit_url: String,

        /// Management API username.
        #[arg(long)]
        rabbit_user: String,

        /// Management API password.
        #[arg(long)]
        rabbit_password: String,

        /// Seconds between scaling evaluations.
        #[arg(long, default_value = "10")]
        tick: u64,

        /// Seconds between manifest directory polls.
        #[arg(long, default_value = "5")]
        discover_interval: u64,

        /// Directory of workload manifest files.
        #[arg(long)]
        manifest_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rmqscaled=debug,rmqscale=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            rabbit_url,
            rabbit_user,
            rabbit_password,
            tick,
            discover_interval,
            manifest_dir,
        } => {
            run(
                rabbit_url,
                rabbit_user,
                rabbit_password,
                tick,
                discover_interval,
                manifest_dir,
            )
            .await
        }
    }
}

async fn run(
    rabbit_url: String,
    rabbit_user: String,
    rabbit_password: String,
    tick: u64,
    discover_interval: u64,
    manifest_dir: PathBuf,
) -> anyhow::Result<()> {
    info!("rmqscaled starting");

    let rabbit = RabbitClient::new(&rabbit_url, &rabbit_user, &rabbit_password)?;
    info!(url = %rabbit_url, "rabbit client initialized");

    let source = ManifestSource::new(&manifest_dir);
    let updater = ManifestUpdater::new(&manifest_dir);
    let reconciler = Reconciler::new(rabbit, updater, LogSink);
    info!(dir = %manifest_dir.display(), tick, "reconciler initialized");

    let (event_tx, event_rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let source_shutdown = shutdown_rx.clone();

    let source_handle = tokio::spawn(async move {
        source
            .run(
                Duration::from_secs(discover_interval),
                event_tx,
                source_shutdown,
            )
            .await;
    });

    let reconciler_handle = tokio::spawn(async move {
        reconciler
            .run(Duration::from_secs(tick), event_rx, shutdown_rx)
            .await;
    });

    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = source_handle.await;
    let _ = reconciler_handle.await;

    info!("rmqscaled stopped");
    Ok(())
}
