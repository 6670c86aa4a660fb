//! # Chain Snapshot
//!
//! Single-run entry point: fetches live market data (when reachable), blends it with the
//! reference snapshot and writes the front-end document.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin chain_snapshot
//! ```
//!
//! Configuration is read from `Config.toml` (override the path with `CHAIN_PULSE_CONFIG`).
//! Set `CHAIN_PULSE_SEED` to make the synthetic fields reproducible.

use anyhow::{Context, Result};
use chain_pulse::{pipeline, CoinGeckoMarkets, MarketDataSource, Settings};
use log::warn;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!(
        "[{}] 🕷️  Starting chain snapshot run",
        chrono::Local::now().format("%H:%M:%S")
    );

    let settings = Settings::new().context("Failed to load settings")?;
    let registry = settings.registry()?;
    let snapshot = settings.reference_snapshot(&registry)?;
    println!(
        "✅ Settings loaded ({} chains, {} snapshot entries)",
        registry.len(),
        snapshot.len()
    );

    let mut rng = match settings.run.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // A client that cannot be built is just another unavailable gateway.
    let source = match CoinGeckoMarkets::new(&settings.gateway) {
        Ok(source) => Some(source),
        Err(e) => {
            warn!("⚠️ {}", e);
            None
        }
    };

    let report = pipeline::run_once(
        &settings,
        &registry,
        &snapshot,
        source.as_ref().map(|s| s as &dyn MarketDataSource),
        &mut rng,
    )
    .await
    .context("Failed to write chain snapshot")?;

    println!(
        "✅ Snapshot written to {} ({} chains, {} live, gateway {})",
        report.output_path.display(),
        report.chains,
        report.live_chains,
        if report.gateway_live { "online" } else { "offline" }
    );

    Ok(())
}
