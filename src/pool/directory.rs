//! Known-pools directory
//!
//! Loads the `pools.json` format published with Blockchain.info's
//! known-pools list: two top-level dictionaries, `coinbase_tags` and
//! `payout_addresses`, each mapping a key to an object with at least a
//! `name` field. Extra fields such as `link` are ignored.
//!
//! The directory is loaded once and never mutated. Coinbase tags are
//! kept as an ordered list in file order (serde_json's `preserve_order`
//! feature), so the first-match policy of the tag scan is reproducible
//! across runs.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Fatal load error: the attribution run cannot produce meaningful
/// results without the directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read pool directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed pool directory: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct PoolEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DirectoryFile {
    coinbase_tags: serde_json::Map<String, serde_json::Value>,
    payout_addresses: serde_json::Map<String, serde_json::Value>,
}

/// Immutable two-tier lookup of known mining pools.
#[derive(Debug, Default)]
pub struct PoolDirectory {
    /// Exact payout address -> pool name.
    payout_addresses: HashMap<String, String>,
    /// (lowercased tag, pool name) in directory file order.
    coinbase_tags: Vec<(String, String)>,
}

impl PoolDirectory {
    /// Load the directory from a JSON file.
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load the directory from a reader.
    pub fn from_reader(reader: impl Read) -> Result<Self, DirectoryError> {
        let parsed: DirectoryFile = serde_json::from_reader(reader)?;
        Self::from_parsed(parsed)
    }

    /// Load the directory from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, DirectoryError> {
        let parsed: DirectoryFile = serde_json::from_str(json)?;
        Self::from_parsed(parsed)
    }

    fn from_parsed(file: DirectoryFile) -> Result<Self, DirectoryError> {
        let mut payout_addresses = HashMap::with_capacity(file.payout_addresses.len());
        for (address, entry) in file.payout_addresses {
            let entry: PoolEntry = serde_json::from_value(entry)?;
            payout_addresses.insert(address, entry.name);
        }

        let mut coinbase_tags = Vec::with_capacity(file.coinbase_tags.len());
        for (tag, entry) in file.coinbase_tags {
            let entry: PoolEntry = serde_json::from_value(entry)?;
            coinbase_tags.push((tag.to_lowercase(), entry.name));
        }

        Ok(Self {
            payout_addresses,
            coinbase_tags,
        })
    }

    /// Exact, case-sensitive payout-address lookup.
    pub fn by_payout_address(&self, address: &str) -> Option<&str> {
        self.payout_addresses.get(address).map(String::as_str)
    }

    /// First tag, in directory file order, that occurs as a
    /// case-insensitive substring of the coinbase script bytes.
    pub fn by_coinbase_tag(&self, script_bytes: &[u8]) -> Option<&str> {
        let message = String::from_utf8_lossy(script_bytes).to_lowercase();
        self.coinbase_tags
            .iter()
            .find(|(tag, _)| message.contains(tag.as_str()))
            .map(|(_, name)| name.as_str())
    }

    pub fn n_payout_addresses(&self) -> usize {
        self.payout_addresses.len()
    }

    pub fn n_coinbase_tags(&self) -> usize {
        self.coinbase_tags.len()
    }
}
