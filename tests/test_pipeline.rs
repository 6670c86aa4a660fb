//! Integration tests for the end-to-end snapshot run
//!
//! A stub market-data source stands in for CoinGecko; the document is written into a
//! temporary directory.

use async_trait::async_trait;
use chain_pulse::market_data::{GatewayError, LiveRecord, MarketDataSource};
use chain_pulse::pipeline::run_once;
use chain_pulse::registry::ChainRegistry;
use chain_pulse::settings::Settings;
use chain_pulse::snapshot::ReferenceSnapshot;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Mutex;

/// Records every query and answers with a fixed result.
struct StubSource {
    response: Option<HashMap<String, LiveRecord>>,
    queries: Mutex<Vec<Vec<String>>>,
}

impl StubSource {
    fn live(records: Vec<(&str, LiveRecord)>) -> Self {
        Self {
            response: Some(records.into_iter().map(|(id, r)| (id.to_string(), r)).collect()),
            queries: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            response: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    fn queries(&self) -> Vec<Vec<String>> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataSource for StubSource {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn fetch_markets(&self, ids: &[String]) -> Result<HashMap<String, LiveRecord>, GatewayError> {
        self.queries.lock().unwrap().push(ids.to_vec());
        self.response.clone().ok_or(GatewayError::RateLimited)
    }
}

struct Fixture {
    settings: Settings,
    registry: ChainRegistry,
    snapshot: ReferenceSnapshot,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = Settings::from_file("Config.toml").expect("shipped Config.toml should load");
    settings.output.dir = dir.path().join("public").to_string_lossy().into_owned();
    let registry = settings.registry().unwrap();
    let snapshot = settings.reference_snapshot(&registry).unwrap();
    Fixture {
        settings,
        registry,
        snapshot,
        _dir: dir,
    }
}

fn record(price: f64, mcap: f64, fdv: Option<f64>, change: Option<f64>) -> LiveRecord {
    LiveRecord {
        current_price: Some(price),
        market_cap: Some(mcap),
        fully_diluted_valuation: fdv,
        price_change_percentage_24h: change,
    }
}

fn read_document(f: &Fixture) -> Vec<serde_json::Value> {
    let raw = std::fs::read_to_string(f.settings.output.path()).unwrap();
    serde_json::from_str(&raw).unwrap()
}

fn by_name<'a>(doc: &'a [serde_json::Value], name: &str) -> &'a serde_json::Value {
    doc.iter().find(|m| m["name"] == name).unwrap()
}

#[tokio::test]
async fn test_gateway_failure_uses_snapshot_for_every_chain() {
    let f = fixture();
    let source = StubSource::failing();

    let report = run_once(
        &f.settings,
        &f.registry,
        &f.snapshot,
        Some(&source as &dyn MarketDataSource),
        &mut StdRng::seed_from_u64(1),
    )
    .await
    .unwrap();

    assert!(!report.gateway_live);
    assert_eq!(report.live_chains, 0);
    assert_eq!(report.chains, f.registry.len());

    let doc = read_document(&f);
    assert_eq!(doc.len(), f.registry.len());
    for chain in f.registry.chains() {
        let baseline = f.snapshot.get(&chain.id);
        let m = by_name(&doc, &chain.name);
        assert_eq!(m["price"].as_f64().unwrap(), baseline.price, "{}", chain.id);
        assert_eq!(m["fdv"].as_f64().unwrap(), baseline.fdv, "{}", chain.id);
        assert_eq!(m["mcap"].as_f64().unwrap(), baseline.mcap, "{}", chain.id);
        assert_eq!(m["tvl"].as_f64().unwrap(), baseline.tvl, "{}", chain.id);
    }
}

#[tokio::test]
async fn test_manual_chains_never_queried_nor_overridden() {
    let f = fixture();
    let source = StubSource::live(vec![
        ("ethereum", record(3700.0, 445e9, Some(445e9), Some(1.1))),
        // A provider answering for a manual chain must not leak into its record.
        ("monad", record(1.0, 1.0, Some(1.0), Some(9.9))),
    ]);

    let report = run_once(
        &f.settings,
        &f.registry,
        &f.snapshot,
        Some(&source as &dyn MarketDataSource),
        &mut StdRng::seed_from_u64(2),
    )
    .await
    .unwrap();

    let queries = source.queries();
    assert_eq!(queries.len(), 1, "gateway must be queried exactly once");
    let manual: Vec<&str> = f
        .registry
        .chains()
        .iter()
        .filter(|c| c.manual)
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(manual, vec!["monad", "berachain", "hyperliquid"]);
    for id in &manual {
        assert!(!queries[0].iter().any(|q| q == id), "{} should not be queried", id);
    }
    assert_eq!(queries[0].len(), f.registry.len() - manual.len());

    assert!(report.gateway_live);
    assert_eq!(report.live_chains, 1);

    let doc = read_document(&f);
    assert_eq!(doc.len(), f.registry.len());
    let monad = by_name(&doc, "Monad");
    assert_eq!(monad["price"].as_f64().unwrap(), 18.5);
    assert_eq!(monad["fdv"].as_f64().unwrap(), 18_500_000_000.0);
    assert_eq!(monad["mcap"].as_f64().unwrap(), 2_700_000_000.0);

    let eth = by_name(&doc, "Ethereum");
    assert_eq!(eth["price"].as_f64().unwrap(), 3700.0);
    assert_eq!(eth["change"].as_f64().unwrap(), 1.1);
}

#[tokio::test]
async fn test_partial_coverage_and_zero_fdv_fallback() {
    let f = fixture();
    let source = StubSource::live(vec![
        ("arbitrum", record(0.9, 5_000_000_000.0, Some(0.0), Some(0.0))),
        ("sui", record(3.0, 9_500_000_000.0, Some(34_000_000_000.0), None)),
    ]);

    run_once(
        &f.settings,
        &f.registry,
        &f.snapshot,
        Some(&source as &dyn MarketDataSource),
        &mut StdRng::seed_from_u64(3),
    )
    .await
    .unwrap();

    let doc = read_document(&f);
    let arb = by_name(&doc, "Arbitrum");
    assert_eq!(arb["fdv"].as_f64().unwrap(), 5_000_000_000.0);
    assert_eq!(arb["mcap"].as_f64().unwrap(), 5_000_000_000.0);
    assert_eq!(arb["float"].as_f64().unwrap(), 1.0);
    // TVL is never live
    assert_eq!(arb["tvl"].as_f64().unwrap(), 16_000_000_000.0);
    let change = arb["change"].as_f64().unwrap();
    assert!((-1.5..=1.5).contains(&change));

    // Covered without a reported change: stays null, no synthetic move
    let sui = by_name(&doc, "Sui");
    assert_eq!(sui["price"].as_f64().unwrap(), 3.0);
    assert!(sui["change"].is_null());

    // Aptos was queried but not covered: snapshot values
    let aptos = by_name(&doc, "Aptos");
    assert_eq!(aptos["price"].as_f64().unwrap(), 11.2);
    assert_eq!(aptos["fdv"].as_f64().unwrap(), 12_000_000_000.0);
    assert_eq!(doc.len(), f.registry.len());
}

#[tokio::test]
async fn test_unregistered_live_ids_never_reach_the_document() {
    let f = fixture();
    let source = StubSource::live(vec![
        ("ethereum", record(3700.0, 445e9, Some(445e9), Some(0.8))),
        ("polygon", record(0.5, 5e9, Some(5e9), Some(2.0))),
    ]);

    let report = run_once(
        &f.settings,
        &f.registry,
        &f.snapshot,
        Some(&source as &dyn MarketDataSource),
        &mut StdRng::seed_from_u64(6),
    )
    .await
    .unwrap();

    assert!(report.gateway_live);
    assert_eq!(report.chains, f.registry.len());
    assert_eq!(report.live_chains, 1);

    let doc = read_document(&f);
    assert_eq!(doc.len(), f.registry.len());
    for chain in f.registry.chains() {
        assert_eq!(
            doc.iter().filter(|m| m["name"] == chain.name.as_str()).count(),
            1,
            "{} should appear exactly once",
            chain.id
        );
    }
    assert!(!doc.iter().any(|m| m["price"].as_f64() == Some(0.5)));
}

#[tokio::test]
async fn test_document_sorted_by_tvl() {
    let f = fixture();

    run_once(
        &f.settings,
        &f.registry,
        &f.snapshot,
        None,
        &mut StdRng::seed_from_u64(4),
    )
    .await
    .unwrap();

    let doc = read_document(&f);
    assert!(doc
        .iter()
        .map(|m| m["tvl"].as_f64().unwrap())
        .tuple_windows()
        .all(|(a, b)| a >= b));
    assert_eq!(doc[0]["name"], "Ethereum");
    assert_eq!(doc[1]["name"], "Arbitrum");
    assert_eq!(doc.last().unwrap()["name"], "Sei");
}

#[tokio::test]
async fn test_shipped_chains_flags_and_estimates() {
    let f = fixture();

    for seed in 0..20 {
        let report = run_once(
            &f.settings,
            &f.registry,
            &f.snapshot,
            None,
            &mut StdRng::seed_from_u64(seed),
        )
        .await
        .unwrap();
        let get = |name: &str| report.metrics.iter().find(|m| m.name == name).unwrap();

        let monad = get("Monad");
        assert!((32_000_000..=48_000_000).contains(&monad.tx));
        let solana = get("Solana");
        assert!((24_000_000..=36_000_000).contains(&solana.tx));
        let aptos = get("Aptos");
        assert!((800_000..=1_200_000).contains(&aptos.tx));

        // Berachain: price 0 keeps change at 0; fdv > 0 with mcap 0 gives float 0
        let bera = get("Berachain");
        assert!(bera.is_testnet);
        assert_eq!(bera.change, Some(0.0));
        assert_eq!(bera.float, 0.0);
        assert_eq!(bera.gov_symbol.as_deref(), Some("BGT"));

        // Base: no price, no fdv, no governance token
        let base = get("Base");
        assert_eq!(base.change, Some(0.0));
        assert_eq!(base.float, 0.0);
        assert_eq!(base.gov_symbol, None);
        assert_eq!(base.gas_symbol, "ETH");
    }
}

#[tokio::test]
async fn test_consecutive_fallback_runs_differ_only_in_synthetic_fields() {
    let f = fixture();

    let first = run_once(
        &f.settings,
        &f.registry,
        &f.snapshot,
        None,
        &mut StdRng::seed_from_u64(100),
    )
    .await
    .unwrap();
    let second = run_once(
        &f.settings,
        &f.registry,
        &f.snapshot,
        None,
        &mut StdRng::seed_from_u64(200),
    )
    .await
    .unwrap();

    assert_eq!(first.metrics.len(), second.metrics.len());
    for (a, b) in first.metrics.iter().zip(second.metrics.iter()) {
        assert_eq!(a.name, b.name);
        assert_eq!((a.price, a.fdv, a.mcap, a.tvl), (b.price, b.fdv, b.mcap, b.tvl));
        assert_eq!(a.float, b.float);
    }
    assert!(first
        .metrics
        .iter()
        .zip(second.metrics.iter())
        .any(|(a, b)| a.tx != b.tx || a.fees != b.fees));

    // Second run replaced the first document.
    let doc = read_document(&f);
    assert_eq!(doc.len(), f.registry.len());
    assert_eq!(doc[0]["tx"].as_u64().unwrap(), second.metrics[0].tx);
}

#[tokio::test]
async fn test_disabled_gateway_skips_query() {
    let mut f = fixture();
    f.settings.gateway.enabled = false;
    let source = StubSource::live(vec![("ethereum", record(1.0, 1.0, None, None))]);

    let report = run_once(
        &f.settings,
        &f.registry,
        &f.snapshot,
        Some(&source as &dyn MarketDataSource),
        &mut StdRng::seed_from_u64(5),
    )
    .await
    .unwrap();

    assert!(source.queries().is_empty());
    assert!(!report.gateway_live);
    assert_eq!(by_name(&read_document(&f), "Ethereum")["price"].as_f64().unwrap(), 3650.0);
}
