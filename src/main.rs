//! # chorus
//!
//! Server binary: loads settings, initializes logging and metrics, and runs
//! either the session server or the `wander` demo client.

#![deny(unsafe_code)]

mod cli;
mod telemetry;
mod wander;

use std::sync::Arc;

use anyhow::{Context, Result};
use chorus_server::{ChorusServer, ServerConfig};
use chorus_settings::ChorusSettings;
use chorus_synth::HeadlessSink;
use clap::Parser;

use crate::cli::{Cli, Command};
use crate::wander::WanderPlan;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli
        .config
        .clone()
        .unwrap_or_else(chorus_settings::settings_path);
    let mut settings = chorus_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("failed to load settings from {}", settings_path.display()))?;

    let command = cli.command.unwrap_or_default();
    if let Command::Serve(args) = &command {
        args.apply(&mut settings);
    }
    if cli.log_json {
        settings.logging.json = true;
    }

    telemetry::init(&settings.logging.level, settings.logging.json);
    tracing::debug!(path = %settings_path.display(), "settings loaded");

    match command {
        Command::Serve(_) => serve(&settings).await,
        Command::Wander(args) => {
            let plan = WanderPlan::from(&args);
            tokio::select! {
                result = wander::run(&args.url, plan) => {
                    let rounds = result?;
                    tracing::info!(rounds, "wander finished");
                }
                _ = tokio::signal::ctrl_c() => tracing::info!("wander interrupted"),
            }
            Ok(())
        }
    }
}

async fn serve(settings: &ChorusSettings) -> Result<()> {
    let metrics = chorus_server::metrics::install_recorder()
        .context("failed to install metrics recorder")?;

    let config = ServerConfig::from_settings(settings);
    let server = ChorusServer::new(config, Arc::new(HeadlessSink::new())).with_metrics(metrics);

    let (addr, handle) = server.listen().await.context("failed to bind server")?;
    tracing::info!("chorus listening on http://{addr} (websocket at ws://{addr}/ws)");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("shutting down...");
    server.shutdown().track(handle);
    server.shutdown().graceful_shutdown(None).await;

    tracing::info!("shutdown complete");
    Ok(())
}
