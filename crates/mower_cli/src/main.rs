mod replay;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mower_core::{classify, is_charging, parse_power, power_band, MowerConfig, DEFAULT_MOWER_NAME};

use crate::replay::{load_steps, Replay};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "mower_cli", about = "Mower activity inference CLI")]
struct Cli {
    /// Overrides `RUST_LOG`.
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded plug readings and print every event as a JSON line.
    Replay {
        /// JSON array of `{at, power, switch}` steps.
        #[arg(long)]
        input: PathBuf,
        /// Restore from and persist to this state file instead of memory.
        #[arg(long)]
        state: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_MOWER_NAME)]
        name: String,
    },
    /// Classify a single power reading.
    Classify {
        /// Raw reading as the plug reports it.
        #[arg(long, allow_hyphen_values = true)]
        power: String,
        #[arg(long)]
        stuck: bool,
    },
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn replay(input: &std::path::Path, state: Option<&std::path::Path>, name: &str) -> Result<()> {
    let config = MowerConfig::new(
        name,
        &format!("sensor.{name}_power"),
        &format!("switch.{name}_plug"),
    )
    .context("invalid mower name")?;
    let steps = load_steps(input)?;
    let mut replay = Replay::new(config, state)?;

    let mut event_count = 0usize;
    for step in &steps {
        for envelope in replay.step(step) {
            println!(
                "{}",
                serde_json::to_string(&envelope).context("encoding event")?
            );
            event_count += 1;
        }
    }
    tracing::info!(steps = steps.len(), events = event_count, "replay finished");

    let summary = serde_json::json!({
        "status": replay.status(),
        "timestamps": replay.services().stores().timestamps.all(),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("encoding final status")?
    );
    Ok(())
}

fn classify_reading(raw: &str, stuck: bool) -> Result<()> {
    let (watts, parsed) = parse_power(raw);
    if !parsed {
        tracing::warn!(raw, watts, "unparseable power reading");
    }
    let report = serde_json::json!({
        "power_watts": watts,
        "power_band": power_band(watts),
        "activity": classify(watts, stuck),
        "charging": is_charging(watts),
        "stuck": stuck,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info".into()),
    };
    // stdout carries the JSON output.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());
    match cli.command {
        Commands::Replay { input, state, name } => replay(&input, state.as_deref(), &name)?,
        Commands::Classify { power, stuck } => classify_reading(&power, stuck)?,
    }
    Ok(())
}
