use secp256k1::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};

use crate::encoding::hash_canonical;
use crate::transaction::Tx;
use crate::wallet::{sign_hash, verify_hash};

/// `previous_hash` of the first ledger block: the canonical hash of `-1`.
pub fn genesis_previous_hash() -> String {
    hash_canonical(&-1)
}

/// A ledger block, sealed by the authority's signature over `hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBlock {
    pub previous_hash: String,
    pub index: u64,
    pub transactions: Vec<Tx>,
    pub hash: String,
    pub signature: String,
}

#[derive(Serialize)]
struct BlockPreimage<'a> {
    previous_hash: &'a str,
    index: u64,
    transactions: &'a [Tx],
}

impl LedgerBlock {
    /// Hash `transactions` into a block at `index` and sign it.
    pub fn seal(
        previous_hash: String,
        index: u64,
        transactions: Vec<Tx>,
        authority: &SecretKey,
    ) -> Self {
        let mut block = Self {
            previous_hash,
            index,
            transactions,
            hash: String::new(),
            signature: String::new(),
        };
        block.hash = block.compute_hash();
        block.signature = sign_hash(authority, &block.hash);
        block
    }

    pub fn compute_hash(&self) -> String {
        hash_canonical(&BlockPreimage {
            previous_hash: &self.previous_hash,
            index: self.index,
            transactions: &self.transactions,
        })
    }

    /// Stored hash matches the content and carries the authority's signature.
    pub fn is_valid(&self, authority: &PublicKey) -> bool {
        self.hash == self.compute_hash() && verify_hash(authority, &self.signature, &self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::KeyPair;

    #[test]
    fn sealed_block_verifies_under_the_authority() {
        let authority = KeyPair::generate();
        let block = LedgerBlock::seal(genesis_previous_hash(), 0, vec![], &authority.secret_key);
        assert!(block.is_valid(&authority.public_key));
        assert!(!block.is_valid(&KeyPair::generate().public_key));
    }

    #[test]
    fn content_change_breaks_the_seal() {
        let authority = KeyPair::generate();
        let mut block = LedgerBlock::seal(genesis_previous_hash(), 0, vec![], &authority.secret_key);
        block.index = 1;
        assert!(!block.is_valid(&authority.public_key));
    }

    #[test]
    fn genesis_sentinel_is_hash_of_minus_one() {
        assert_eq!(genesis_previous_hash(), crate::encoding::sha256_hex(b"-1"));
    }
}
