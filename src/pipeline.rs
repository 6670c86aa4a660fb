//! # Snapshot Pipeline
//!
//! One run: query the gateway once, resolve every chain, rank by TVL, write the
//! document.
//!
//! Gateway failure is absorbed here (the whole run switches to fallback values);
//! only a failure to write the output document is reported to the caller.

use crate::market_data::{MarketDataSource, MarketFeed};
use crate::ranking::rank_by_tvl;
use crate::registry::ChainRegistry;
use crate::resolver::{MetricResolver, ResolvedMetric};
use crate::settings::Settings;
use crate::snapshot::ReferenceSnapshot;
use crate::writer::{write_document, WriteError};
use log::{info, warn};
use rand::Rng;
use std::path::PathBuf;
use std::time::Instant;

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub chains: usize,
    /// Chains whose market values came from the live feed
    pub live_chains: usize,
    pub gateway_live: bool,
    pub output_path: PathBuf,
    pub metrics: Vec<ResolvedMetric>,
}

/// Queries `source` once for all non-manual chains. Never fails: errors and skipped
/// queries become `MarketFeed::Unavailable`.
pub async fn fetch_feed(
    settings: &Settings,
    registry: &ChainRegistry,
    source: Option<&dyn MarketDataSource>,
) -> MarketFeed {
    let source = match source {
        Some(s) if settings.gateway.enabled => s,
        _ => {
            info!("Live market data disabled, using reference snapshot");
            return MarketFeed::Unavailable;
        }
    };

    let ids = registry.live_query_ids();
    if ids.is_empty() {
        info!("All chains are manual, skipping {} query", source.name());
        return MarketFeed::Unavailable;
    }

    info!("Querying {} for {} chains...", source.name(), ids.len());
    let start = Instant::now();
    match source.fetch_markets(&ids).await {
        Ok(records) => {
            info!(
                "✅ {} responded in {:?} ({}/{} chains covered)",
                source.name(),
                start.elapsed(),
                ids.iter().filter(|id| records.contains_key(*id)).count(),
                ids.len()
            );
            MarketFeed::Live(records)
        }
        Err(e) => {
            warn!("⚠️ {} unavailable ({}), switching to fallback data", source.name(), e);
            MarketFeed::Unavailable
        }
    }
}

/// Resolves and ranks every registry chain against `feed`.
pub fn build_document<R: Rng + ?Sized>(
    settings: &Settings,
    registry: &ChainRegistry,
    snapshot: &ReferenceSnapshot,
    feed: &MarketFeed,
    rng: &mut R,
) -> Vec<ResolvedMetric> {
    let resolver = MetricResolver::new(snapshot, &settings.estimates);
    let mut metrics = resolver.resolve_all(registry, feed, rng);
    rank_by_tvl(&mut metrics);
    metrics
}

/// Runs the full pipeline once and writes the document to `settings.output`.
pub async fn run_once<R: Rng + ?Sized>(
    settings: &Settings,
    registry: &ChainRegistry,
    snapshot: &ReferenceSnapshot,
    source: Option<&dyn MarketDataSource>,
    rng: &mut R,
) -> Result<RunReport, WriteError> {
    let feed = fetch_feed(settings, registry, source).await;
    let live_chains = registry
        .chains()
        .iter()
        .filter(|c| !c.manual && feed.record(&c.id).is_some())
        .count();

    let metrics = build_document(settings, registry, snapshot, &feed, rng);

    let output_path = settings.output.path();
    write_document(&output_path, &metrics).await?;
    info!(
        "✅ Wrote {} chains to {:?} ({} live, {} fallback)",
        metrics.len(),
        output_path,
        live_chains,
        metrics.len() - live_chains
    );

    Ok(RunReport {
        chains: metrics.len(),
        live_chains,
        gateway_live: feed.is_live(),
        output_path,
        metrics,
    })
}
