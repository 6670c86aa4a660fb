//! # Reference Snapshot
//!
//! Per-chain baseline values used whenever live data is missing or disabled for a
//! chain. TVL is always read from here since the market-data provider does not
//! supply it.

use crate::registry::ChainRegistry;
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;

/// Baseline market values for one chain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SnapshotValues {
    pub price: f64,
    pub fdv: f64,
    pub mcap: f64,
    pub tvl: f64,
}

/// One `[[snapshot]]` record as it appears in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotEntry {
    pub id: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub fdv: f64,
    #[serde(default)]
    pub mcap: f64,
    #[serde(default)]
    pub tvl: f64,
}

impl SnapshotEntry {
    pub fn values(&self) -> SnapshotValues {
        SnapshotValues {
            price: self.price,
            fdv: self.fdv,
            mcap: self.mcap,
            tvl: self.tvl,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Duplicate snapshot entry for chain: {0}")]
    DuplicateId(String),
    #[error("Invalid snapshot value {field}={value} for chain {id} (must be finite and >= 0)")]
    InvalidValue {
        id: String,
        field: &'static str,
        value: f64,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceSnapshot {
    entries: HashMap<String, SnapshotValues>,
}

impl ReferenceSnapshot {
    pub fn new(entries: Vec<SnapshotEntry>) -> Result<Self, SnapshotError> {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            let v = entry.values();
            for (field, value) in [("price", v.price), ("fdv", v.fdv), ("mcap", v.mcap), ("tvl", v.tvl)] {
                if !value.is_finite() || value < 0.0 {
                    return Err(SnapshotError::InvalidValue {
                        id: entry.id,
                        field,
                        value,
                    });
                }
            }
            if map.insert(entry.id.clone(), v).is_some() {
                return Err(SnapshotError::DuplicateId(entry.id));
            }
        }
        Ok(Self { entries: map })
    }

    /// Baseline for `id`, all zeros when the chain has no entry.
    pub fn get(&self, id: &str) -> SnapshotValues {
        self.entries.get(id).copied().unwrap_or_default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops entries for chains the registry does not track. Returns the dropped ids.
    pub fn retain_registered(&mut self, registry: &ChainRegistry) -> Vec<String> {
        let mut dropped: Vec<String> = self
            .entries
            .keys()
            .filter(|id| !registry.contains(id))
            .cloned()
            .collect();
        dropped.sort();
        for id in &dropped {
            warn!("⚠️ Snapshot entry for unknown chain '{}' ignored", id);
            self.entries.remove(id);
        }
        dropped
    }
}
