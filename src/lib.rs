//! # Chain Pulse
//!
//! Periodic market and activity snapshot for a fixed set of blockchain networks, written
//! as a single JSON document for a static front-end.
//!
//! ## Overview
//!
//! Each run resolves one record per tracked chain, using live market data where the
//! provider is reachable and a baked-in reference snapshot everywhere else. The output
//! is always complete, even when the network is down.
//!
//! ## Architecture
//!
//! ### Configuration Layer
//! The chain registry, reference snapshot, gateway and output settings are loaded from
//! `Config.toml`.
//!
//! ### Gateway Layer
//! One bounded query to the market-data provider per run. Failure switches the whole run
//! to fallback values.
//!
//! ### Resolution Layer
//! Per-chain source selection, derived metrics (float ratio) and synthetic activity
//! estimates, driven by an injected random source.
//!
//! ### Output Layer
//! Ranking by TVL and whole-document replacement of the output file.

// Configuration
/// Configuration management
pub mod settings;
/// Tracked chains and their flags
pub mod registry;
/// Baseline values used when live data is missing
pub mod snapshot;

// Gateway
/// Market data source trait and CoinGecko client
pub mod market_data;

// Resolution
/// Per-chain metric resolution
pub mod resolver;

// Output
/// TVL ranking
pub mod ranking;
/// JSON document sink
pub mod writer;
/// One end-to-end run
pub mod pipeline;

// Re-exports for convenience
pub use market_data::{CoinGeckoMarkets, MarketDataSource, MarketFeed};
pub use pipeline::{run_once, RunReport};
pub use resolver::{MetricResolver, ResolvedMetric};
pub use settings::Settings;
