use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::coin::Location;
use crate::encoding::hash_canonical;

/// A transfer from `sender` consuming one coin (or minted by the authority).
///
/// `receivers` is a BTreeMap so iteration and encoding order are fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub sender: String,
    pub locations: Location,
    pub receivers: BTreeMap<String, u64>,
    /// Canonical hash of `sender`, `locations` and `receivers`.
    pub hash: String,
    /// Hex-encoded DER ECDSA signature over `hash`
    pub signature: String,
}

#[derive(Serialize)]
struct TxPreimage<'a> {
    sender: &'a str,
    locations: &'a Location,
    receivers: &'a BTreeMap<String, u64>,
}

impl Tx {
    /// Build an unsigned transaction with its hash computed.
    pub fn new(sender: String, locations: Location, receivers: BTreeMap<String, u64>) -> Self {
        let hash = Self::hash_of(&sender, &locations, &receivers);
        Self {
            sender,
            locations,
            receivers,
            hash,
            signature: String::new(),
        }
    }

    fn hash_of(sender: &str, locations: &Location, receivers: &BTreeMap<String, u64>) -> String {
        hash_canonical(&TxPreimage {
            sender,
            locations,
            receivers,
        })
    }

    /// Recompute the hash from the current content.
    pub fn compute_hash(&self) -> String {
        Self::hash_of(&self.sender, &self.locations, &self.receivers)
    }

    pub fn is_minted(&self) -> bool {
        self.locations == Location::Minted
    }

    pub fn total_output_amount(&self) -> u128 {
        self.receivers.values().map(|&a| a as u128).sum()
    }

    /// Amount paid to `address`, if it is a receiver.
    pub fn received_by(&self, address: &str) -> Option<u64> {
        self.receivers.get(address).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::CoinRef;

    fn sample() -> Tx {
        let receivers = BTreeMap::from([("bob".to_string(), 3), ("alice".to_string(), 7)]);
        Tx::new(
            "alice".into(),
            CoinRef { block: 0, tx: 0, amount: 10 }.into(),
            receivers,
        )
    }

    #[test]
    fn hash_is_stable_and_content_bound() {
        let tx = sample();
        assert_eq!(tx.hash, tx.compute_hash());

        let mut tampered = tx.clone();
        tampered.receivers.insert("bob".into(), 4);
        assert_ne!(tampered.compute_hash(), tx.hash);

        let mut tampered = tx.clone();
        tampered.sender = "mallory".into();
        assert_ne!(tampered.compute_hash(), tx.hash);
    }

    #[test]
    fn signature_is_not_part_of_the_hash() {
        let mut tx = sample();
        tx.signature = "3006020101020101".into();
        assert_eq!(tx.hash, tx.compute_hash());
    }

    #[test]
    fn totals_and_lookups() {
        let tx = sample();
        assert_eq!(tx.total_output_amount(), 10);
        assert_eq!(tx.received_by("bob"), Some(3));
        assert_eq!(tx.received_by("carol"), None);
        assert!(!tx.is_minted());
    }

    #[test]
    fn serialized_record_keeps_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        for key in ["sender", "locations", "receivers", "hash", "signature"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["locations"]["amount"], 10);
    }
}
