mod evaluation_loop;
mod registry;
mod routes;
mod services;
mod state;

#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mower_core::{MowerConfig, DEFAULT_MOWER_NAME};
use mower_store::{JsonFileBackend, MowerStores};

use crate::evaluation_loop::run_evaluation_loop;
use crate::routes::make_router_with_cors;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "mower_daemon", about = "Infers mower activity from a smart plug")]
struct Cli {
    /// Source reporting the plug's power draw in watts.
    #[arg(long)]
    power_source: String,
    /// Source reporting the plug's on/off state.
    #[arg(long)]
    switch_source: String,
    #[arg(long, default_value = DEFAULT_MOWER_NAME)]
    name: String,
    #[arg(long, default_value = "./mower_state.json")]
    state_file: PathBuf,
    #[arg(long, default_value_t = 3001)]
    port: u16,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
    /// Overrides `RUST_LOG`.
    #[arg(long)]
    log_level: Option<String>,
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info".into()),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = MowerConfig::new(&cli.name, &cli.power_source, &cli.switch_source)
        .context("invalid mower configuration")?;
    let backend = JsonFileBackend::open(&cli.state_file)
        .with_context(|| format!("opening state file {}", cli.state_file.display()))?;
    let stores = MowerStores::restore(Arc::new(backend), &config)
        .context("restoring mower state")?;
    tracing::info!(
        name = %config.name,
        stuck = stores.stuck.get(),
        timestamps = ?stores.timestamps.all(),
        "restored mower state"
    );

    let app_state = AppState::new(config, stores);
    app_state.services.publish_restored();
    let (sources, changes) = app_state
        .registry
        .subscribe(app_state.config.watched_sources());
    tokio::spawn(run_evaluation_loop(app_state.clone(), sources, changes));

    let router = make_router_with_cors(app_state, &cli.cors_origin)?;
    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(
        "listening on http://localhost:{} (power: {}, switch: {})",
        cli.port,
        cli.power_source,
        cli.switch_source
    );
    axum::serve(listener, router).await.context("serving http")?;
    Ok(())
}
