//! Single-authority coin ledger.
//!
//! The authority mints coins, validates transfers and seals the pending set
//! into signed blocks. All queries are linear scans over the sealed chain.

pub mod block;
pub mod validator;

use std::collections::BTreeMap;

use log::{debug, info, warn};
use secp256k1::PublicKey;

pub use block::{LedgerBlock, genesis_previous_hash};
pub use validator::{CheckReport, Rejection, Validator, receiving_events};

use crate::transaction::{CoinRef, Location, Tx};
use crate::wallet::KeyPair;

/// The authority's keys, its sealed chain and the pending transactions.
#[derive(Debug)]
pub struct Ledger {
    authority: KeyPair,
    chain: Vec<LedgerBlock>,
    pending: Vec<Tx>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::with_authority(KeyPair::generate())
    }
}

impl Ledger {
    pub fn with_authority(authority: KeyPair) -> Self {
        Self {
            authority,
            chain: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn authority_address(&self) -> &str {
        &self.authority.address
    }

    pub fn authority_public_key(&self) -> &PublicKey {
        &self.authority.public_key
    }

    pub fn chain(&self) -> &[LedgerBlock] {
        &self.chain
    }

    pub fn pending(&self) -> &[Tx] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    fn validator(&self) -> Validator<'_> {
        Validator::new(&self.chain, &self.pending)
    }

    /// Authority mint: a signed transaction creating `receivers` out of
    /// nothing, queued for the next block.
    pub fn create_coins(&mut self, receivers: BTreeMap<String, u64>) -> &Tx {
        let tx = self.authority.send_tx(receivers, Location::Minted);
        debug!(
            "LEDGER - minted {} coins in tx {}",
            tx.total_output_amount(),
            tx.hash
        );
        self.pending.push(tx);
        &self.pending[self.pending.len() - 1]
    }

    /// Run every validation check without touching the pending set.
    pub fn check(&self, tx: &Tx, signer: &PublicKey) -> CheckReport {
        self.validator().check(tx, signer)
    }

    pub fn validate(&self, tx: Tx, signer: &PublicKey) -> Result<Tx, Rejection> {
        self.validator().validate(tx, signer)
    }

    /// Queue a valid transaction; a rejected one is discarded and its reason
    /// returned. Ledger state only changes on acceptance.
    pub fn add_tx(&mut self, tx: Tx, signer: &PublicKey) -> Result<(), Rejection> {
        let hash = tx.hash.clone();
        match self.validate(tx, signer) {
            Ok(tx) => {
                self.pending.push(tx);
                info!(
                    "LEDGER - tx {} accepted (pending: {})",
                    hash,
                    self.pending.len()
                );
                Ok(())
            }
            Err(reason) => {
                warn!("LEDGER - tx {} discarded: {}", hash, reason);
                Err(reason)
            }
        }
    }

    /// Seal the pending set (possibly empty) into a signed block and clear it.
    pub fn mine(&mut self) -> &LedgerBlock {
        let previous_hash = self
            .chain
            .last()
            .map(|b| b.hash.clone())
            .unwrap_or_else(genesis_previous_hash);
        let index = self.chain.len() as u64;
        let transactions = std::mem::take(&mut self.pending);

        let block = LedgerBlock::seal(previous_hash, index, transactions, &self.authority.secret_key);
        info!(
            "LEDGER - sealed block #{} ({} txs, hash={})",
            block.index,
            block.transactions.len(),
            block.hash
        );
        self.chain.push(block);
        &self.chain[self.chain.len() - 1]
    }

    pub fn receiving_events(&self, address: &str) -> Vec<CoinRef> {
        receiving_events(&self.chain, address)
    }

    /// Received minus claimed on the sealed chain.
    pub fn balance(&self, address: &str) -> i128 {
        let received: i128 = self
            .receiving_events(address)
            .iter()
            .map(|coin| coin.amount as i128)
            .sum();
        let spent: i128 = self
            .chain
            .iter()
            .flat_map(|block| block.transactions.iter())
            .filter(|tx| tx.sender == address && !tx.is_minted())
            .filter_map(|tx| tx.locations.amount())
            .map(|amount| amount as i128)
            .sum();
        received - spent
    }

    /// Validate the entire chain: indices, linkage, hashes and the
    /// authority's signatures.
    pub fn verify_chain(&self) -> bool {
        let mut previous_hash = genesis_previous_hash();
        for (i, block) in self.chain.iter().enumerate() {
            if block.index != i as u64
                || block.previous_hash != previous_hash
                || !block.is_valid(&self.authority.public_key)
                || block.transactions.iter().any(|tx| tx.hash != tx.compute_hash())
            {
                return false;
            }
            previous_hash = block.hash.clone();
        }
        true
    }
}
