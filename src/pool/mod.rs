//! Mining pool attribution
//!
//! Maps each block to the pool that produced it by examining the
//! coinbase transaction. Attribution is two-tiered: the payout address
//! of the coinbase's first output is checked first, and only on a miss
//! is the coinbase message scanned for known tags. The address tier is
//! preferred because a block producer can trivially fake another
//! pool's tag in the coinbase message, but not its payout address.

pub mod directory;

use bitcoin::{Address, Block, Network, Transaction};
use directory::PoolDirectory;

/// Sentinel returned when neither tier identifies the pool.
pub const UNKNOWN_POOL: &str = "NA";

/// Resolves pool names for blocks against a loaded [`PoolDirectory`].
///
/// Every lookup is in-memory; `attribute` never performs I/O.
pub struct PoolAttributionEngine<'d> {
    directory: &'d PoolDirectory,
}

impl<'d> PoolAttributionEngine<'d> {
    pub fn new(directory: &'d PoolDirectory) -> Self {
        Self { directory }
    }

    /// Pool name for `block`, or [`UNKNOWN_POOL`].
    ///
    /// A malformed coinbase (no transactions, no inputs or outputs)
    /// yields [`UNKNOWN_POOL`] rather than an error: downstream
    /// consumers align results positionally with the block sequence,
    /// so every input block must produce exactly one name.
    pub fn attribute(&self, block: &Block) -> &'d str {
        let Some(coinbase) = block.txdata.first() else {
            return UNKNOWN_POOL;
        };

        if let Some(name) = self.by_payout_address(coinbase) {
            return name;
        }
        if let Some(name) = self.by_coinbase_tag(coinbase) {
            return name;
        }
        UNKNOWN_POOL
    }

    /// Tier 1: exact match on the destination address of the
    /// coinbase's first output, for standard P2PKH/P2SH scripts.
    fn by_payout_address(&self, coinbase: &Transaction) -> Option<&'d str> {
        let script = &coinbase.output.first()?.script_pubkey;
        if !script.is_p2pkh() && !script.is_p2sh() {
            return None;
        }
        let address = Address::from_script(script, Network::Bitcoin).ok()?;
        self.directory.by_payout_address(&address.to_string())
    }

    /// Tier 2: case-insensitive tag scan over the raw bytes of the
    /// coinbase input's script.
    fn by_coinbase_tag(&self, coinbase: &Transaction) -> Option<&'d str> {
        let input = coinbase.input.first()?;
        self.directory.by_coinbase_tag(input.script_sig.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::absolute::LockTime;
    use bitcoin::block::{Header, Version};
    use bitcoin::hashes::Hash;
    use bitcoin::transaction;
    use bitcoin::{
        Amount, BlockHash, CompactTarget, OutPoint, PubkeyHash, ScriptBuf, Sequence,
        TxIn, TxMerkleNode, TxOut, Witness,
    };

    fn header() -> Header {
        Header {
            version: Version::ONE,
            prev_blockhash: BlockHash::all_zeros(),
            merkle_root: TxMerkleNode::all_zeros(),
            time: 1_231_006_505,
            bits: CompactTarget::from_consensus(0x1d00ffff),
            nonce: 0,
        }
    }

    fn coinbase(script_sig: &[u8], outputs: Vec<TxOut>) -> Transaction {
        Transaction {
            version: transaction::Version::ONE,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::from_bytes(script_sig.to_vec()),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: outputs,
        }
    }

    fn block_with(txdata: Vec<Transaction>) -> Block {
        Block {
            header: header(),
            txdata,
        }
    }

    fn p2pkh_payout() -> (ScriptBuf, String) {
        let pubkey_hash = PubkeyHash::from_byte_array([0x11; 20]);
        let script = ScriptBuf::new_p2pkh(&pubkey_hash);
        let address = Address::p2pkh(pubkey_hash, Network::Bitcoin).to_string();
        (script, address)
    }

    fn directory_with(address: &str) -> PoolDirectory {
        PoolDirectory::from_json_str(&format!(
            r#"{{"coinbase_tags":{{"/PoolY/":{{"name":"PoolY"}}}},
                "payout_addresses":{{"{address}":{{"name":"PoolX"}}}}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_payout_address_match_short_circuits_tag_scan() {
        let (script, address) = p2pkh_payout();
        let directory = directory_with(&address);
        let engine = PoolAttributionEngine::new(&directory);

        // The coinbase message names PoolY, but the payout address wins.
        let block = block_with(vec![coinbase(
            b"/PoolY/",
            vec![TxOut {
                value: Amount::from_sat(50_0000_0000),
                script_pubkey: script,
            }],
        )]);
        assert_eq!(engine.attribute(&block), "PoolX");
    }

    #[test]
    fn test_tag_match_when_address_unknown() {
        let directory = directory_with("1UnrelatedAddress");
        let engine = PoolAttributionEngine::new(&directory);

        let (script, _) = p2pkh_payout();
        let block = block_with(vec![coinbase(
            b"mined by /pooly/ today",
            vec![TxOut {
                value: Amount::from_sat(1),
                script_pubkey: script,
            }],
        )]);
        assert_eq!(engine.attribute(&block), "PoolY");
    }

    #[test]
    fn test_non_standard_first_output_falls_through_to_tags() {
        let directory = directory_with("1UnrelatedAddress");
        let engine = PoolAttributionEngine::new(&directory);

        let block = block_with(vec![coinbase(
            b"/PoolY/",
            vec![TxOut {
                value: Amount::from_sat(1),
                // Bare OP_RETURN: neither P2PKH nor P2SH.
                script_pubkey: ScriptBuf::from_bytes(vec![0x6a]),
            }],
        )]);
        assert_eq!(engine.attribute(&block), "PoolY");
    }

    #[test]
    fn test_no_match_in_either_tier_yields_na() {
        let directory = directory_with("1UnrelatedAddress");
        let engine = PoolAttributionEngine::new(&directory);

        let (script, _) = p2pkh_payout();
        let block = block_with(vec![coinbase(
            b"anonymous miner",
            vec![TxOut {
                value: Amount::from_sat(1),
                script_pubkey: script,
            }],
        )]);
        assert_eq!(engine.attribute(&block), UNKNOWN_POOL);
    }

    #[test]
    fn test_malformed_coinbase_yields_na() {
        let directory = directory_with("1UnrelatedAddress");
        let engine = PoolAttributionEngine::new(&directory);

        // Block with no transactions at all.
        assert_eq!(engine.attribute(&block_with(vec![])), UNKNOWN_POOL);

        // Coinbase with neither outputs nor a matching message.
        let block = block_with(vec![coinbase(b"", vec![])]);
        assert_eq!(engine.attribute(&block), UNKNOWN_POOL);
    }

    #[test]
    fn test_coinbase_without_outputs_still_matches_tags() {
        let directory = directory_with("1UnrelatedAddress");
        let engine = PoolAttributionEngine::new(&directory);

        let block = block_with(vec![coinbase(b"/PoolY/", vec![])]);
        assert_eq!(engine.attribute(&block), "PoolY");
    }
}
