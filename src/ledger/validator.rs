use secp256k1::PublicKey;
use serde::Serialize;
use thiserror::Error;

use super::LedgerBlock;
use crate::transaction::{CoinRef, Location, Tx};
use crate::wallet::{address_of, verify_hash};

/// Why a transaction was discarded. Reported, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("hash is invalid")]
    HashMismatch,

    #[error("signature is invalid")]
    BadSignature,

    #[error("the coins were not created before")]
    NotFunded,

    #[error("the amounts of input and output coins do not match")]
    AmountMismatch,

    #[error("double spending")]
    DoubleSpend,
}

/// Outcome of every check; none of them short-circuits another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub hash_integrity: bool,
    pub signature_valid: bool,
    pub provenance: bool,
    pub conservation: bool,
    pub no_double_spend: bool,
}

impl CheckReport {
    /// All failed checks, most severe first: integrity and authorship, then
    /// overspending a held coin, then the shape of the claim.
    pub fn failures(&self) -> Vec<Rejection> {
        [
            (self.hash_integrity, Rejection::HashMismatch),
            (self.signature_valid, Rejection::BadSignature),
            (self.no_double_spend, Rejection::DoubleSpend),
            (self.provenance, Rejection::NotFunded),
            (self.conservation, Rejection::AmountMismatch),
        ]
        .into_iter()
        .filter_map(|(ok, reason)| (!ok).then_some(reason))
        .collect()
    }

    /// The reported reason: the first failed check.
    pub fn rejection(&self) -> Option<Rejection> {
        self.failures().into_iter().next()
    }
}

/// Every coin `address` has received on the sealed chain, in chain order.
pub fn receiving_events(chain: &[LedgerBlock], address: &str) -> Vec<CoinRef> {
    chain
        .iter()
        .flat_map(|block| {
            block
                .transactions
                .iter()
                .enumerate()
                .filter_map(move |(tx_index, tx)| {
                    tx.received_by(address).map(|amount| CoinRef {
                        block: block.index,
                        tx: tx_index as u64,
                        amount,
                    })
                })
        })
        .collect()
}

/// Read-only view the checks run against: the sealed chain plus the
/// transactions already accepted into the pending set.
pub struct Validator<'a> {
    chain: &'a [LedgerBlock],
    pending: &'a [Tx],
}

impl<'a> Validator<'a> {
    pub fn new(chain: &'a [LedgerBlock], pending: &'a [Tx]) -> Self {
        Self { chain, pending }
    }

    pub fn check(&self, tx: &Tx, signer: &PublicKey) -> CheckReport {
        CheckReport {
            hash_integrity: tx.hash == tx.compute_hash(),
            signature_valid: address_of(signer) == tx.sender
                && verify_hash(signer, &tx.signature, &tx.hash),
            provenance: self.is_funded(tx),
            conservation: tx
                .locations
                .amount()
                .is_some_and(|amount| tx.total_output_amount() == amount as u128),
            no_double_spend: self.is_unspent(tx),
        }
    }

    /// Hand the transaction back when every check passes.
    pub fn validate(&self, tx: Tx, signer: &PublicKey) -> Result<Tx, Rejection> {
        match self.check(&tx, signer).rejection() {
            None => Ok(tx),
            Some(reason) => Err(reason),
        }
    }

    /// `locations` must match one receiving event of the sender exactly.
    fn is_funded(&self, tx: &Tx) -> bool {
        let Location::Coin(coin) = tx.locations else {
            return false;
        };
        receiving_events(self.chain, &tx.sender).contains(&coin)
    }

    /// Amount originally paid to the sender at the coin's position.
    fn received_at(&self, sender: &str, coin: &CoinRef) -> Option<u64> {
        self.chain
            .get(coin.block as usize)
            .and_then(|block| block.transactions.get(coin.tx as usize))
            .and_then(|tx| tx.received_by(sender))
    }

    /// Sum claimed against `coin` by other transactions of the sender.
    ///
    /// Only blocks after the coin's defining block are scanned, then the
    /// pending set.
    fn claimed_from(&self, sender: &str, coin: &CoinRef) -> u128 {
        let sealed = self
            .chain
            .iter()
            .skip(coin.block as usize + 1)
            .flat_map(|block| block.transactions.iter());

        sealed
            .chain(self.pending.iter())
            .filter(|other| other.sender == sender)
            .filter_map(|other| other.locations.coin())
            .filter(|claimed| claimed.position() == coin.position())
            .map(|claimed| claimed.amount as u128)
            .sum()
    }

    /// The claim must fit in what is left of the coin. Minted value and
    /// positions where the sender never received anything consume no coin;
    /// provenance rejects those.
    fn is_unspent(&self, tx: &Tx) -> bool {
        let Location::Coin(coin) = tx.locations else {
            return true;
        };
        let Some(received) = self.received_at(&tx.sender, &coin) else {
            return true;
        };
        let claimed = self.claimed_from(&tx.sender, &coin) as i128;
        coin.amount as i128 <= received as i128 - claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::block::genesis_previous_hash;
    use crate::wallet::KeyPair;
    use std::collections::BTreeMap;

    /// Chain with one block minting 10 to `owner`.
    fn funded(owner: &KeyPair) -> (KeyPair, Vec<LedgerBlock>) {
        let authority = KeyPair::generate();
        let mint = authority.send_tx(BTreeMap::from([(owner.address.clone(), 10)]), Location::Minted);
        let block = LedgerBlock::seal(genesis_previous_hash(), 0, vec![mint], &authority.secret_key);
        (authority, vec![block])
    }

    #[test]
    fn report_lists_failures_by_severity() {
        let report = CheckReport {
            hash_integrity: true,
            signature_valid: false,
            provenance: true,
            conservation: false,
            no_double_spend: false,
        };
        assert_eq!(
            report.failures(),
            vec![Rejection::BadSignature, Rejection::DoubleSpend, Rejection::AmountMismatch]
        );
        assert_eq!(report.rejection(), Some(Rejection::BadSignature));
    }

    #[test]
    fn every_check_is_evaluated() {
        let alice = KeyPair::generate();
        let mallory = KeyPair::generate();
        let (_, chain) = funded(&alice);

        // Unknown coin, wrong total, signed by someone else, then tampered.
        let mut tx = alice.send_tx(
            BTreeMap::from([(mallory.address.clone(), 3)]),
            CoinRef { block: 0, tx: 0, amount: 7 }.into(),
        );
        tx.receivers.insert(mallory.address.clone(), 4);

        let report = Validator::new(&chain, &[]).check(&tx, &mallory.public_key);
        assert_eq!(
            report.failures(),
            vec![
                Rejection::HashMismatch,
                Rejection::BadSignature,
                Rejection::NotFunded,
                Rejection::AmountMismatch,
            ]
        );
    }

    #[test]
    fn receiving_events_follow_chain_order() {
        let alice = KeyPair::generate();
        let (_, chain) = funded(&alice);
        assert_eq!(
            receiving_events(&chain, &alice.address),
            vec![CoinRef { block: 0, tx: 0, amount: 10 }]
        );
        assert!(receiving_events(&chain, "nobody").is_empty());
    }

    #[test]
    fn pending_claims_count_against_the_coin() {
        let alice = KeyPair::generate();
        let (_, chain) = funded(&alice);
        let coin = CoinRef { block: 0, tx: 0, amount: 10 };
        let first = alice.send_tx(BTreeMap::from([(alice.address.clone(), 10)]), coin.into());
        let second = alice.send_tx(BTreeMap::from([("bob".to_string(), 10)]), coin.into());

        let validator = Validator::new(&chain, std::slice::from_ref(&first));
        assert_eq!(
            validator.validate(second, &alice.public_key),
            Err(Rejection::DoubleSpend)
        );
    }
}
