//! Roam Runtime
//!
//! Boots the game server core and drives it from a line console on stdin.

mod console;
mod synthetic;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use roam_assets::GameAssets;
use roam_core::SystemClock;
use roam_net::{CellCoverer, HttpTransport, PoiGateway, PoiTransport};
use roam_services::settings::ProviderSettings;
use roam_services::{open_store, GameService, Settings, WorldAssembler};
use std::path::PathBuf;
use std::sync::Arc;
use synthetic::SyntheticTransport;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "roam", version, about = "Location-based game server console")]
struct Args {
    /// Settings file (JSON). Falls back to $ROAM_SETTINGS, then defaults.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Directory for world and player documents; overrides the settings file.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Fixed seed for spawn and loot rolls.
    #[arg(long)]
    seed: Option<u64>,

    /// Generate points locally instead of calling the provider.
    #[arg(long)]
    offline: bool,

    /// Provider API key; overrides the settings file.
    #[arg(long, env = "ROAM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

fn transport(provider: &ProviderSettings) -> Result<Arc<dyn PoiTransport>> {
    if provider.offline {
        tracing::warn!("Offline mode, serving synthetic points");
        return Ok(Arc::new(SyntheticTransport::new(&provider.synthetic)));
    }
    if provider.http.api_key.is_none() {
        bail!("no provider API key; pass --api-key, set ROAM_API_KEY, or run with --offline");
    }
    tracing::info!(url = %provider.http.url, "Using points-of-interest provider");
    Ok(Arc::new(HttpTransport::new(&provider.http)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::info!("Roam v{}", roam_core::VERSION);

    let mut settings = Settings::load(args.settings.as_deref()).context("loading settings")?;
    if let Some(dir) = args.data_dir {
        settings.storage.data_dir = Some(dir);
    }
    if args.offline {
        settings.provider.offline = true;
    }
    if let Some(key) = args.api_key {
        settings.provider.http.api_key = Some(key);
    }

    let assets = GameAssets::load(&settings.assets).context("loading game assets")?;
    let store = open_store(&settings.storage).context("opening document store")?;
    let coverer = CellCoverer::new(settings.coverage).context("coverage settings")?;
    let gateway = PoiGateway::new(
        transport(&settings.provider)?,
        settings.provider.query.clone(),
    );
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let service = Arc::new(GameService::new(
        store,
        WorldAssembler::new(coverer, gateway),
        Arc::new(assets),
        settings.gameplay.clone(),
        Arc::new(SystemClock),
        rng,
    ));
    tracing::info!("Ready for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut running = JoinSet::new();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        let Some(command) = console::parse_command(line) else {
            tracing::warn!(line, "Unrecognized command");
            let reply = serde_json::json!({
                "status": "error",
                "error": "unrecognized command",
                "transient": false
            });
            println!("{reply}");
            continue;
        };
        let service = Arc::clone(&service);
        running.spawn_blocking(move || {
            let reply = console::execute(&service, &command);
            println!("{reply}");
        });
        // Reap finished commands so the set does not grow without bound.
        while let Some(done) = running.try_join_next() {
            report_panic(done);
        }
    }

    while let Some(done) = running.join_next().await {
        report_panic(done);
    }
    tracing::info!("Console closed");
    Ok(())
}

/// A panicking command loses its reply but must not take the console down.
fn report_panic(done: Result<(), tokio::task::JoinError>) {
    if let Err(err) = done {
        tracing::error!(error = %err, "Command task panicked");
        println!(
            "{}",
            serde_json::json!({ "status": "error", "error": "internal error", "transient": true })
        );
    }
}
