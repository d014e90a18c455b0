//! Structured dataset extraction from indexed Bitcoin data
//!
//! This library provides two batch extraction pipelines:
//! - Multisig dataset: one delimited row per multisignature output
//!   (bare or P2SH-wrapped), with the owning transaction's attributes,
//!   pulled from a label-indexed transaction graph.
//! - Pool attribution: one pool name per block, inferred from the
//!   coinbase transaction via a two-tier lookup (payout address first,
//!   coinbase tag second) against a known-pools directory.

pub mod block;
pub mod driver;
pub mod graph;
pub mod multisig;
pub mod pool;
pub mod sink;

pub use block::reader::BlockFileReader;
pub use graph::memory::MemoryGraph;
pub use graph::GraphStore;
pub use multisig::{MultisigOutputs, MultisigRow};
pub use pool::directory::PoolDirectory;
pub use pool::PoolAttributionEngine;
pub use sink::RowSink;

/// Magic bytes for Bitcoin mainnet
pub const MAINNET_MAGIC: u32 = 0xD9B4BEF9;
