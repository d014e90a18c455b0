//! Read-only capability interface over the indexed transaction graph
//!
//! The extraction pipelines only need label-indexed node enumeration
//! and named-property access, so the graph is abstracted behind
//! [`GraphStore`] and any storage engine able to provide those can back
//! it. [`memory::MemoryGraph`] is the bundled implementation.

pub mod memory;

use thiserror::Error;

/// Identifier of a node within a graph store.
pub type NodeId = u64;

/// Node labels used by the extraction pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// Output whose spending condition is an M-of-N multisig script,
    /// bare or wrapped in P2SH.
    MultiSig,
    /// Output locked to a script hash.
    PayToScriptHash,
}

/// Scalar property stored on a graph node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Int(u64),
    Text(String),
}

impl Property {
    pub fn as_int(&self) -> Option<u64> {
        match self {
            Property::Int(value) => Some(*value),
            Property::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Property::Text(value) => Some(value),
            Property::Int(_) => None,
        }
    }
}

/// Property names used by the extraction pipelines.
pub mod props {
    pub const HASH: &str = "hash";
    pub const HEIGHT: &str = "height";
    pub const N_INPUTS: &str = "n_inputs";
    pub const N_OUTPUTS: &str = "n_outputs";
    pub const INDEX: &str = "index";
    pub const VALUE: &str = "value";
    pub const SIG_REQUIRED: &str = "sig_required";
    pub const SIG_TOTAL: &str = "sig_total";
}

/// Per-node data-integrity fault raised while resolving a record.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {node} is missing property `{property}`")]
    MissingProperty { node: NodeId, property: &'static str },
    #[error("node {node} property `{property}` has an unexpected type")]
    WrongType { node: NodeId, property: &'static str },
    #[error("output node {node} has no owning transaction")]
    OrphanOutput { node: NodeId },
}

/// Read-only, label-indexed access to the transaction graph.
pub trait GraphStore {
    /// All nodes carrying `label`, lazily, in a stable enumeration
    /// order for a fixed graph.
    fn nodes_with_label(&self, label: Label) -> Box<dyn Iterator<Item = NodeId> + '_>;

    /// Named property of a node, if present.
    fn property(&self, node: NodeId, name: &str) -> Option<&Property>;

    fn has_label(&self, node: NodeId, label: Label) -> bool;

    /// Transaction node that owns an output node. A weak reference:
    /// lookup only, no ownership.
    fn owning_transaction(&self, output: NodeId) -> Option<NodeId>;

    /// Integer property of a node, or a typed fault naming the gap.
    fn int_prop(&self, node: NodeId, name: &'static str) -> Result<u64, GraphError> {
        match self.property(node, name) {
            Some(property) => property
                .as_int()
                .ok_or(GraphError::WrongType { node, property: name }),
            None => Err(GraphError::MissingProperty { node, property: name }),
        }
    }

    /// Text property of a node, or a typed fault naming the gap.
    fn text_prop(&self, node: NodeId, name: &'static str) -> Result<String, GraphError> {
        match self.property(node, name) {
            Some(property) => property
                .as_text()
                .map(str::to_owned)
                .ok_or(GraphError::WrongType { node, property: name }),
            None => Err(GraphError::MissingProperty { node, property: name }),
        }
    }
}
