//! Multisignature output extraction
//!
//! Walks every output labeled as multisig in the transaction graph and
//! resolves its attributes together with those of the owning
//! transaction. The label covers both bare multisig and P2SH-wrapped
//! multisig; the P2SH flag is computed per output afterwards from the
//! `PayToScriptHash` label.

use crate::graph::{props, GraphError, GraphStore, Label, NodeId};
use log::warn;

/// One row of the multisig dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigRow {
    pub tx_hash: String,
    pub height: u64,
    pub n_inputs: u64,
    pub n_outputs: u64,
    pub output_index: u64,
    pub value: u64,
    pub sig_required: u64,
    pub sig_total: u64,
    pub p2sh: bool,
}

impl MultisigRow {
    /// Fields in dataset column order.
    pub fn fields(&self) -> [String; 9] {
        [
            self.tx_hash.clone(),
            self.height.to_string(),
            self.n_inputs.to_string(),
            self.n_outputs.to_string(),
            self.output_index.to_string(),
            self.value.to_string(),
            self.sig_required.to_string(),
            self.sig_total.to_string(),
            u8::from(self.p2sh).to_string(),
        ]
    }
}

/// Lazy, one-shot pass over every multisig output in the graph.
///
/// Malformed nodes (missing owner, missing or mistyped property) are
/// logged and skipped; a per-record fault never aborts the pass.
/// Enumeration follows the store's stable label order, so repeated
/// runs over a fixed graph produce identical output.
pub struct MultisigOutputs<'g> {
    graph: &'g dyn GraphStore,
    nodes: Box<dyn Iterator<Item = NodeId> + 'g>,
}

impl<'g> MultisigOutputs<'g> {
    pub fn new(graph: &'g dyn GraphStore) -> Self {
        Self {
            graph,
            nodes: graph.nodes_with_label(Label::MultiSig),
        }
    }

    fn resolve(&self, node: NodeId) -> Result<MultisigRow, GraphError> {
        let graph = self.graph;
        let tx = graph
            .owning_transaction(node)
            .ok_or(GraphError::OrphanOutput { node })?;

        Ok(MultisigRow {
            tx_hash: graph.text_prop(tx, props::HASH)?,
            height: graph.int_prop(tx, props::HEIGHT)?,
            n_inputs: graph.int_prop(tx, props::N_INPUTS)?,
            n_outputs: graph.int_prop(tx, props::N_OUTPUTS)?,
            output_index: graph.int_prop(node, props::INDEX)?,
            value: graph.int_prop(node, props::VALUE)?,
            sig_required: graph.int_prop(node, props::SIG_REQUIRED)?,
            sig_total: graph.int_prop(node, props::SIG_TOTAL)?,
            p2sh: graph.has_label(node, Label::PayToScriptHash),
        })
    }
}

impl Iterator for MultisigOutputs<'_> {
    type Item = MultisigRow;

    fn next(&mut self) -> Option<MultisigRow> {
        loop {
            let node = self.nodes.next()?;
            match self.resolve(node) {
                Ok(row) => return Some(row),
                Err(fault) => warn!("skipping multisig output node {node}: {fault}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::memory::MemoryGraph;
    use crate::graph::Property;

    fn fixture() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        let tx1 = graph.add_transaction("aa11", 100, 2, 3);
        let tx2 = graph.add_transaction("bb22", 205, 1, 1);
        graph.add_multisig_output(tx1, 0, 50_000, 1, 2, false);
        graph.add_multisig_output(tx1, 2, 75_000, 2, 3, true);
        graph.add_multisig_output(tx2, 0, 1_000, 2, 2, false);
        graph
    }

    #[test]
    fn test_emits_one_row_per_multisig_output() {
        let graph = fixture();
        let rows: Vec<_> = MultisigOutputs::new(&graph).collect();
        assert_eq!(rows.len(), 3);

        assert_eq!(
            rows[0],
            MultisigRow {
                tx_hash: "aa11".into(),
                height: 100,
                n_inputs: 2,
                n_outputs: 3,
                output_index: 0,
                value: 50_000,
                sig_required: 1,
                sig_total: 2,
                p2sh: false,
            }
        );
        assert_eq!(rows[1].output_index, 2);
        assert!(rows[1].p2sh);
        assert_eq!(rows[2].tx_hash, "bb22");
    }

    #[test]
    fn test_required_never_exceeds_total() {
        let graph = fixture();
        for row in MultisigOutputs::new(&graph) {
            assert!(row.sig_required <= row.sig_total);
        }
    }

    #[test]
    fn test_p2sh_flag_in_fields() {
        let graph = fixture();
        let rows: Vec<_> = MultisigOutputs::new(&graph).collect();
        assert_eq!(rows[0].fields()[8], "0");
        assert_eq!(rows[1].fields()[8], "1");
    }

    #[test]
    fn test_field_order() {
        let row = MultisigRow {
            tx_hash: "aa11".into(),
            height: 100,
            n_inputs: 2,
            n_outputs: 3,
            output_index: 1,
            value: 50_000,
            sig_required: 1,
            sig_total: 2,
            p2sh: true,
        };
        assert_eq!(
            row.fields(),
            ["aa11", "100", "2", "3", "1", "50000", "1", "2", "1"].map(String::from)
        );
    }

    #[test]
    fn test_malformed_nodes_are_skipped() {
        let mut graph = fixture();

        // Multisig output with no owning transaction.
        graph.add_node(&[Label::MultiSig], vec![]);

        // Owned output missing its signature counts.
        let tx = graph.add_transaction("cc33", 300, 1, 1);
        let incomplete = graph.add_node(
            &[Label::MultiSig],
            vec![
                (props::INDEX, Property::Int(0)),
                (props::VALUE, Property::Int(10)),
            ],
        );
        graph.set_owner(incomplete, tx);

        let rows: Vec<_> = MultisigOutputs::new(&graph).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.tx_hash != "cc33"));
    }

    #[test]
    fn test_traversal_is_idempotent() {
        let graph = fixture();
        let first: Vec<_> = MultisigOutputs::new(&graph).collect();
        let second: Vec<_> = MultisigOutputs::new(&graph).collect();
        assert_eq!(first, second);
    }
}
