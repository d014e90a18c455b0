//! In-memory graph store and snapshot loader
//!
//! `MemoryGraph` keeps one insertion-ordered index per label, so the
//! enumeration order of `nodes_with_label` is the order nodes were
//! added, and a fixed graph always enumerates identically.
//!
//! Snapshots are JSON exports of the indexed graph:
//!
//! ```json
//! {
//!   "transactions": [
//!     {"hash": "ab..", "height": 170, "inputs": 1, "outputs": 2}
//!   ],
//!   "outputs": [
//!     {"tx": 0, "index": 1, "value": 50000,
//!      "sig_required": 1, "sig_total": 2, "p2sh": false}
//!   ]
//! }
//! ```
//!
//! where `tx` indexes into the `transactions` array. Only multisig
//! outputs appear in a snapshot; every loaded output node carries the
//! `MultiSig` label.

use super::{props, GraphStore, Label, NodeId, Property};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, Default)]
struct Node {
    labels: Vec<Label>,
    props: HashMap<String, Property>,
    owner: Option<NodeId>,
}

/// In-memory [`GraphStore`] with insertion-ordered label indexes.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    nodes: Vec<Node>,
    label_index: HashMap<Label, Vec<NodeId>>,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    transactions: Vec<SnapshotTx>,
    outputs: Vec<SnapshotOutput>,
}

#[derive(Debug, Deserialize)]
struct SnapshotTx {
    hash: String,
    height: u64,
    inputs: u64,
    outputs: u64,
}

#[derive(Debug, Deserialize)]
struct SnapshotOutput {
    tx: usize,
    index: u64,
    value: u64,
    sig_required: u64,
    sig_total: u64,
    #[serde(default)]
    p2sh: bool,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a graph snapshot from a JSON file. A missing or malformed
    /// snapshot is fatal to the run that depends on it.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open graph snapshot {}", path.display()))?;
        Self::from_json_reader(BufReader::new(file))
    }

    /// Load a graph snapshot from a reader.
    pub fn from_json_reader(reader: impl Read) -> Result<Self> {
        let snapshot: Snapshot =
            serde_json::from_reader(reader).context("malformed graph snapshot")?;

        let mut graph = MemoryGraph::new();
        let mut tx_nodes = Vec::with_capacity(snapshot.transactions.len());
        for tx in &snapshot.transactions {
            tx_nodes.push(graph.add_transaction(&tx.hash, tx.height, tx.inputs, tx.outputs));
        }
        for output in &snapshot.outputs {
            let &tx_node = tx_nodes.get(output.tx).with_context(|| {
                format!("output references unknown transaction #{}", output.tx)
            })?;
            graph.add_multisig_output(
                tx_node,
                output.index,
                output.value,
                output.sig_required,
                output.sig_total,
                output.p2sh,
            );
        }
        Ok(graph)
    }

    /// Add a bare node carrying the given labels and properties.
    pub fn add_node(&mut self, labels: &[Label], props: Vec<(&str, Property)>) -> NodeId {
        let id = self.nodes.len() as NodeId;
        for &label in labels {
            self.label_index.entry(label).or_default().push(id);
        }
        self.nodes.push(Node {
            labels: labels.to_vec(),
            props: props
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value))
                .collect(),
            owner: None,
        });
        id
    }

    /// Add a transaction node.
    pub fn add_transaction(
        &mut self,
        hash: &str,
        height: u64,
        n_inputs: u64,
        n_outputs: u64,
    ) -> NodeId {
        self.add_node(
            &[],
            vec![
                (props::HASH, Property::Text(hash.to_owned())),
                (props::HEIGHT, Property::Int(height)),
                (props::N_INPUTS, Property::Int(n_inputs)),
                (props::N_OUTPUTS, Property::Int(n_outputs)),
            ],
        )
    }

    /// Add a multisig output node owned by the transaction node `tx`.
    pub fn add_multisig_output(
        &mut self,
        tx: NodeId,
        index: u64,
        value: u64,
        sig_required: u64,
        sig_total: u64,
        p2sh: bool,
    ) -> NodeId {
        let labels: &[Label] = if p2sh {
            &[Label::MultiSig, Label::PayToScriptHash]
        } else {
            &[Label::MultiSig]
        };
        let id = self.add_node(
            labels,
            vec![
                (props::INDEX, Property::Int(index)),
                (props::VALUE, Property::Int(value)),
                (props::SIG_REQUIRED, Property::Int(sig_required)),
                (props::SIG_TOTAL, Property::Int(sig_total)),
            ],
        );
        self.set_owner(id, tx);
        id
    }

    /// Record that `output` is owned by the transaction node `tx`.
    pub fn set_owner(&mut self, output: NodeId, tx: NodeId) {
        if let Some(node) = self.nodes.get_mut(output as usize) {
            node.owner = Some(tx);
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl GraphStore for MemoryGraph {
    fn nodes_with_label(&self, label: Label) -> Box<dyn Iterator<Item = NodeId> + '_> {
        match self.label_index.get(&label) {
            Some(ids) => Box::new(ids.iter().copied()),
            None => Box::new(std::iter::empty()),
        }
    }

    fn property(&self, node: NodeId, name: &str) -> Option<&Property> {
        self.nodes.get(node as usize)?.props.get(name)
    }

    fn has_label(&self, node: NodeId, label: Label) -> bool {
        self.nodes
            .get(node as usize)
            .map_or(false, |n| n.labels.contains(&label))
    }

    fn owning_transaction(&self, output: NodeId) -> Option<NodeId> {
        self.nodes.get(output as usize)?.owner
    }
}
