//! # Chain Registry
//!
//! Static list of tracked chains and their identifying/display attributes.
//!
//! The registry is loaded from configuration (see `settings.rs`) so chains can be
//! added without a rebuild. Iteration order is the configuration order and is the
//! tie-break order used when ranking the output document.
//!
//! Two flags affect resolution:
//!
//! - `manual`: never query the live market-data source for this chain
//! - `testnet`: passed through to the output as `is_testnet`

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Chain category shown by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    L1,
    L2,
}

/// Identity and display attributes of one tracked chain.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChainDescriptor {
    /// Unique key, also the CoinGecko coin id (e.g. "sei-network")
    pub id: String,
    pub name: String,
    /// Display symbol
    pub symbol: String,
    /// Symbol of the token used to pay gas
    pub gas_token: String,
    /// Governance token symbol. None for chains without a native governance token (e.g. Base)
    #[serde(default)]
    pub gov_token: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub testnet: bool,
    /// Never query the live source for this chain, always use snapshot values
    #[serde(default)]
    pub manual: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Chain registry is empty")]
    Empty,
    #[error("Chain at position {0} has an empty id")]
    EmptyId(usize),
    #[error("Duplicate chain id: {0}")]
    DuplicateId(String),
}

/// Validated, ordered set of chains.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainDescriptor>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainDescriptor>) -> Result<Self, RegistryError> {
        if chains.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::with_capacity(chains.len());
        for (idx, chain) in chains.iter().enumerate() {
            if chain.id.trim().is_empty() {
                return Err(RegistryError::EmptyId(idx));
            }
            if !seen.insert(chain.id.as_str()) {
                return Err(RegistryError::DuplicateId(chain.id.clone()));
            }
        }

        Ok(Self { chains })
    }

    pub fn chains(&self) -> &[ChainDescriptor] {
        &self.chains
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.chains.iter().any(|c| c.id == id)
    }

    /// Ids sent to the market-data gateway: every chain not flagged `manual`, in registry order.
    pub fn live_query_ids(&self) -> Vec<String> {
        self.chains
            .iter()
            .filter(|c| !c.manual)
            .map(|c| c.id.clone())
            .collect()
    }
}

#[cfg(test)]
pub(crate) fn chain(id: &str, gov_token: Option<&str>, manual: bool) -> ChainDescriptor {
    ChainDescriptor {
        id: id.to_string(),
        name: id.to_uppercase(),
        symbol: id[..id.len().min(3)].to_uppercase(),
        gas_token: "ETH".to_string(),
        gov_token: gov_token.map(str::to_string),
        category: Category::L1,
        testnet: false,
        manual,
    }
}
