//! # Metric Resolver
//!
//! Merges a chain's registry descriptor, reference snapshot and (optional) live market
//! record into one `ResolvedMetric`.
//!
//! ## Source selection
//!
//! | Field   | Live record present (gateway ok)          | Otherwise        |
//! |---------|-------------------------------------------|------------------|
//! | price   | `current_price` (absent → 0)              | snapshot price   |
//! | mcap    | `market_cap` (absent → 0)                 | snapshot mcap    |
//! | fdv     | `fully_diluted_valuation`, or `market_cap` when fdv is absent or 0 | snapshot fdv |
//! | change  | `price_change_percentage_24h` (absent → null) | 0            |
//! | tvl     | snapshot tvl                              | snapshot tvl     |
//!
//! A change of exactly 0 on a chain with a positive price is replaced by a small
//! synthetic move so the front-end never shows a frozen feed. A live record that
//! reports no change at all stays null. Transaction counts and
//! fees are synthetic estimates, drawn fresh every run.
//!
//! All randomness comes from the injected `Rng`, so a seeded generator makes the
//! output fully reproducible.
//!
//! Resolution of a single chain cannot fail: every numeric field has a default.

use crate::market_data::{LiveRecord, MarketFeed};
use crate::registry::{Category, ChainDescriptor, ChainRegistry};
use crate::settings::Estimates;
use crate::snapshot::{ReferenceSnapshot, SnapshotValues};
use rand::Rng;
use serde::Serialize;

/// Bound of the synthetic 24h change, in percent.
pub const SYNTHETIC_CHANGE_BOUND: f64 = 1.5;
/// Multiplicative jitter applied to the base transaction volume.
pub const TX_FACTOR_RANGE: (f64, f64) = (0.8, 1.2);
/// Average fee per transaction, in USD.
pub const FEE_PER_TX_RANGE: (f64, f64) = (0.002, 0.05);
/// Float ratio assumed for a chain with a governance token but no FDV ("new chain, low float").
pub const NEW_CHAIN_FLOAT_RATIO: f64 = 0.15;

/// One row of the output document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMetric {
    pub name: String,
    pub symbol: String,
    pub gas_symbol: String,
    pub gov_symbol: Option<String>,
    pub category: Category,
    pub is_testnet: bool,
    pub price: f64,
    /// 24h price change, percent. None when the live record carried no change
    pub change: Option<f64>,
    pub fdv: f64,
    pub mcap: f64,
    pub tvl: f64,
    /// Estimated daily transaction count
    pub tx: u64,
    /// Estimated daily fees, USD
    pub fees: f64,
    /// mcap / fdv
    pub float: f64,
}

pub struct MetricResolver<'a> {
    snapshot: &'a ReferenceSnapshot,
    estimates: &'a Estimates,
}

impl<'a> MetricResolver<'a> {
    pub fn new(snapshot: &'a ReferenceSnapshot, estimates: &'a Estimates) -> Self {
        Self { snapshot, estimates }
    }

    /// Resolves every registry chain, in registry order. Always yields exactly one
    /// metric per chain.
    pub fn resolve_all<R: Rng + ?Sized>(
        &self,
        registry: &ChainRegistry,
        feed: &MarketFeed,
        rng: &mut R,
    ) -> Vec<ResolvedMetric> {
        registry
            .chains()
            .iter()
            .map(|chain| self.resolve(chain, feed.record(&chain.id), rng))
            .collect()
    }

    /// Resolves one chain. `live` is the chain's record only when the gateway
    /// succeeded and covered this chain.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        chain: &ChainDescriptor,
        live: Option<&LiveRecord>,
        rng: &mut R,
    ) -> ResolvedMetric {
        // Manual chains never take live values, even if the provider returned one.
        let live = live.filter(|_| !chain.manual);
        let baseline = self.snapshot.get(&chain.id);

        let price = resolve_price(live, &baseline);
        let mcap = resolve_mcap(live, &baseline);
        let fdv = resolve_fdv(live, &baseline);
        let change = resolve_change(live, price, rng);
        let tx = estimate_tx(self.estimates.base_tx_for(&chain.id), rng);
        let fees = estimate_fees(tx, rng);
        let float = float_ratio(fdv, mcap, chain.gov_token.as_deref());

        ResolvedMetric {
            name: chain.name.clone(),
            symbol: chain.symbol.clone(),
            gas_symbol: chain.gas_token.clone(),
            gov_symbol: chain.gov_token.clone(),
            category: chain.category,
            is_testnet: chain.testnet,
            price,
            change,
            fdv,
            mcap,
            tvl: baseline.tvl,
            tx,
            fees,
            float,
        }
    }
}

pub fn resolve_price(live: Option<&LiveRecord>, baseline: &SnapshotValues) -> f64 {
    match live {
        Some(rec) => rec.current_price.unwrap_or(0.0),
        None => baseline.price,
    }
}

pub fn resolve_mcap(live: Option<&LiveRecord>, baseline: &SnapshotValues) -> f64 {
    match live {
        Some(rec) => rec.market_cap.unwrap_or(0.0),
        None => baseline.mcap,
    }
}

/// A live FDV of exactly 0 counts as missing and falls back to the live market cap.
pub fn resolve_fdv(live: Option<&LiveRecord>, baseline: &SnapshotValues) -> f64 {
    match live {
        Some(rec) => rec
            .fully_diluted_valuation
            .filter(|fdv| *fdv != 0.0)
            .or(rec.market_cap)
            .unwrap_or(0.0),
        None => baseline.fdv,
    }
}

/// Without a live record the change defaults to 0. Only an exact 0 (live or default)
/// on a priced chain is synthesized; an absent live change is kept absent.
pub fn resolve_change<R: Rng + ?Sized>(live: Option<&LiveRecord>, price: f64, rng: &mut R) -> Option<f64> {
    let change = match live {
        Some(rec) => rec.price_change_percentage_24h,
        None => Some(0.0),
    };
    match change {
        Some(c) if c == 0.0 && price > 0.0 => Some(round2(
            rng.gen_range(-SYNTHETIC_CHANGE_BOUND..=SYNTHETIC_CHANGE_BOUND),
        )),
        other => other,
    }
}

pub fn estimate_tx<R: Rng + ?Sized>(base_tx: u64, rng: &mut R) -> u64 {
    let factor = rng.gen_range(TX_FACTOR_RANGE.0..=TX_FACTOR_RANGE.1);
    (base_tx as f64 * factor) as u64
}

pub fn estimate_fees<R: Rng + ?Sized>(tx: u64, rng: &mut R) -> f64 {
    tx as f64 * rng.gen_range(FEE_PER_TX_RANGE.0..=FEE_PER_TX_RANGE.1)
}

/// Circulating-supply proxy. `mcap` comes from its own resolution rule, not from the
/// FDV fallback chain.
pub fn float_ratio(fdv: f64, mcap: f64, gov_token: Option<&str>) -> f64 {
    if fdv > 0.0 {
        mcap / fdv
    } else if gov_token.is_some() {
        NEW_CHAIN_FLOAT_RATIO
    } else {
        0.0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
