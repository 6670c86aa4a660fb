//! # Market Data Gateway
//!
//! Live market records for the non-manual chains of the registry.
//!
//! The gateway makes exactly one attempt per run with a short timeout. Any failure
//! (transport error, timeout, non-success status, malformed payload) is reported as a
//! single `GatewayError` and the caller switches the whole run to fallback mode.
//! There is no retry at this layer.
//!
//! ## Sources
//!
//! - **CoinGecko** (`/coins/markets`): price, market cap, FDV and 24h change per coin id

use crate::settings::Gateway;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Live market values for one chain. Any field may be missing even when the
/// request as a whole succeeded (provider coverage gaps).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LiveRecord {
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub fully_diluted_valuation: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

/// Outcome of the gateway call for a whole run.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketFeed {
    /// Gateway succeeded; chains missing from the map were not covered by the provider
    Live(HashMap<String, LiveRecord>),
    /// Gateway failed or was skipped; every chain resolves from the snapshot
    Unavailable,
}

impl MarketFeed {
    /// The chain's live record, only if the gateway succeeded and covered the chain.
    pub fn record(&self, id: &str) -> Option<&LiveRecord> {
        match self {
            MarketFeed::Live(records) => records.get(id),
            MarketFeed::Unavailable => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, MarketFeed::Live(_))
    }

    /// Number of records received (0 when unavailable).
    pub fn coverage(&self) -> usize {
        match self {
            MarketFeed::Live(records) => records.len(),
            MarketFeed::Unavailable => 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Invalid gateway URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("Rate limited (429)")]
    RateLimited,
    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),
    #[error("JSON parse failed: {0}")]
    Decode(#[source] reqwest::Error),
}

/// A source of live market records keyed by chain id.
///
/// Implementations must bound their own wait time; the pipeline awaits the call once
/// and never retries.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Fetches market records for `ids` in a single query.
    async fn fetch_markets(&self, ids: &[String]) -> Result<HashMap<String, LiveRecord>, GatewayError>;
}

/// One element of the `/coins/markets` response array.
#[derive(Debug, Deserialize)]
struct CoinGeckoMarket {
    id: String,
    #[serde(flatten)]
    record: LiveRecord,
}

/// CoinGecko `/coins/markets` client.
pub struct CoinGeckoMarkets {
    client: reqwest::Client,
    base_url: String,
    vs_currency: String,
}

impl CoinGeckoMarkets {
    pub fn new(cfg: &Gateway) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(GatewayError::Client)?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            vs_currency: cfg.vs_currency.clone(),
        })
    }

    /// `{base_url}/coins/markets?vs_currency=..&ids=a,b,c`
    pub fn markets_url(&self, ids: &[String]) -> Result<Url, GatewayError> {
        let endpoint = format!("{}/coins/markets", self.base_url);
        let url = Url::parse_with_params(
            &endpoint,
            &[("vs_currency", self.vs_currency.as_str()), ("ids", ids.join(",").as_str())],
        )?;
        Ok(url)
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoMarkets {
    fn name(&self) -> &'static str {
        "CoinGecko"
    }

    async fn fetch_markets(&self, ids: &[String]) -> Result<HashMap<String, LiveRecord>, GatewayError> {
        let url = self.markets_url(ids)?;
        debug!("CoinGecko request: {}", url);

        let response = self.client.get(url).send().await.map_err(GatewayError::Request)?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(GatewayError::RateLimited);
            }
            return Err(GatewayError::Status(status));
        }

        let markets: Vec<CoinGeckoMarket> = response.json().await.map_err(GatewayError::Decode)?;

        Ok(markets.into_iter().map(|m| (m.id, m.record)).collect())
    }
}
